use std::{
    fs, io,
    path::PathBuf,
};

use super::KeyValue;

/// One file per key inside a state directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Result<Self, io::Error> {
        fs::create_dir_all(&root)?;

        Ok(Self { root })
    }
}

impl KeyValue for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, io::Error> {
        match fs::read(self.root.join(key)) {
            Ok(content) => Ok(Some(content)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), io::Error> {
        fs::write(self.root.join(key), value)
    }
}
