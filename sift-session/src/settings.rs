use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct Settings {
    pub library_path: Option<PathBuf>,
    pub state_path: Option<PathBuf>,
    pub reset: bool,
}
