use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex},
};

use super::KeyValue;

/// Ephemeral shared store. Clones see the same entries, which makes it a
/// drop-in double for restart scenarios in tests and dry runs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl KeyValue for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, io::Error> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| io::Error::other("memory store lock poisoned"))?;

        Ok(entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), io::Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| io::Error::other("memory store lock poisoned"))?;

        entries.insert(key.to_owned(), value.to_vec());

        Ok(())
    }
}
