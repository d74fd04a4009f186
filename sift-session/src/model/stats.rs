use chrono::Local;

/// Running totals for the current triage session. Mutated incrementally on
/// decide and undo, finalized when a deletion batch commits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionStats {
    pub items_reviewed: u32,
    pub items_deleted: u32,
    pub bytes_freed: u64,
    pub started_at: i64,
    pub ended_at: Option<i64>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            items_reviewed: 0,
            items_deleted: 0,
            bytes_freed: 0,
            started_at: Local::now().timestamp(),
            ended_at: None,
        }
    }
}

impl SessionStats {
    pub fn record_deletion(&mut self, items: u32, bytes: u64) {
        self.items_deleted += items;
        self.bytes_freed += bytes;
    }

    pub fn end_session(&mut self) {
        self.ended_at = Some(Local::now().timestamp());
    }
}

/// Formats a byte count with the most fitting unit.
pub fn format_bytes(bytes: u64) -> String {
    let kilo = bytes as f64 / 1_000.0;
    let mega = kilo / 1_000.0;
    let giga = mega / 1_000.0;

    if giga >= 1.0 {
        format!("{:.2} GB", giga)
    } else if mega >= 1.0 {
        format!("{:.1} MB", mega)
    } else if kilo >= 1.0 {
        format!("{:.0} KB", kilo)
    } else {
        format!("{} bytes", bytes)
    }
}
