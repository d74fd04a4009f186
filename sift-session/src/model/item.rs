use chrono::{DateTime, Datelike, Duration, Local};

/// One media asset tracked by id. Immutable once loaded; the engine and
/// cache refer to items by id only.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Item {
    pub id: String,
    pub kind: ItemKind,
    pub created_at: Option<DateTime<Local>>,
    pub is_screenshot: bool,
    /// Best effort, 0 when unknown.
    pub byte_size: u64,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ItemKind {
    Photo,
    Video,
    LivePhoto,
}

impl Item {
    pub fn year(&self) -> Option<i32> {
        self.created_at.map(|created| created.year())
    }

    pub fn is_from_last_30_days(&self) -> bool {
        match self.created_at {
            Some(created) => created >= Local::now() - Duration::days(30),
            None => false,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self.kind, ItemKind::Video)
    }
}
