use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Local;

/// Triage outcome for a single item. `Undecided` is the neutral gesture
/// state and is never persisted as a terminal decision.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Keep,
    Delete,
    Maybe,
    Undecided,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Keep => "keep",
            Decision::Delete => "delete",
            Decision::Maybe => "maybe",
            Decision::Undecided => "undecided",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "keep" => Some(Decision::Keep),
            "delete" => Some(Decision::Delete),
            "maybe" => Some(Decision::Maybe),
            "undecided" => Some(Decision::Undecided),
            _ => None,
        }
    }
}

/// One entry of the undo log, appended on every terminal decision.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SwipeAction {
    pub id: u64,
    pub item_id: String,
    pub decision: Decision,
    pub recorded_at: i64,
}

impl SwipeAction {
    pub fn record(item_id: &str, decision: Decision) -> Self {
        Self {
            id: next_action_id(),
            item_id: item_id.to_owned(),
            decision,
            recorded_at: Local::now().timestamp(),
        }
    }
}

// Wall clock nanos are unique enough for a 50 entry log.
fn next_action_id() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0)
}
