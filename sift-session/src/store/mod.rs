use std::collections::HashSet;
use std::io;

use crate::{
    catalog::Filter,
    error::AppError,
    model::{decision::SwipeAction, stats::SessionStats},
};

pub mod codec;
mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Maximum number of swipe actions kept for undo. Oldest entries are
/// dropped first once the cap is reached.
pub const UNDO_CAP: usize = 50;

mod keys {
    pub const CURSOR: &str = "cursor";
    pub const FILTER: &str = "filter";
    pub const MARKED_FOR_DELETION: &str = "marked_for_deletion";
    pub const MAYBE_PILE: &str = "maybe_pile";
    pub const REVIEWED: &str = "reviewed";
    pub const SESSION_STATS: &str = "session_stats";
    pub const UNDO_STACK: &str = "undo_stack";
}

/// Durable key value surface the session state survives restarts on.
pub trait KeyValue: Send {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, io::Error>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), io::Error>;
}

/// The three persisted decision sets. An id in `marked_for_deletion` or
/// `maybe_pile` is always also in `reviewed`; the first two never overlap.
/// Both invariants are maintained by the session's decide and undo logic.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DecisionSets {
    pub marked_for_deletion: HashSet<String>,
    pub maybe_pile: HashSet<String>,
    pub reviewed: HashSet<String>,
}

/// Typed accessors over the durable key value store. Every helper is one
/// read-modify-write of a single backing key. Corrupt payloads fall back
/// to the type's default instead of failing the session.
pub struct StateStore {
    backend: Box<dyn KeyValue>,
}

impl StateStore {
    pub fn new(backend: impl KeyValue + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn marked_for_deletion(&self) -> HashSet<String> {
        self.id_set(keys::MARKED_FOR_DELETION)
    }

    pub fn maybe_pile(&self) -> HashSet<String> {
        self.id_set(keys::MAYBE_PILE)
    }

    pub fn reviewed(&self) -> HashSet<String> {
        self.id_set(keys::REVIEWED)
    }

    pub fn decision_sets(&self) -> DecisionSets {
        DecisionSets {
            marked_for_deletion: self.marked_for_deletion(),
            maybe_pile: self.maybe_pile(),
            reviewed: self.reviewed(),
        }
    }

    pub fn mark_for_deletion(&mut self, id: &str) -> Result<(), AppError> {
        self.insert_into(keys::MARKED_FOR_DELETION, id)
    }

    pub fn unmark(&mut self, id: &str) -> Result<(), AppError> {
        self.remove_from(keys::MARKED_FOR_DELETION, id)
    }

    pub fn add_to_maybe(&mut self, id: &str) -> Result<(), AppError> {
        self.insert_into(keys::MAYBE_PILE, id)
    }

    pub fn remove_from_maybe(&mut self, id: &str) -> Result<(), AppError> {
        self.remove_from(keys::MAYBE_PILE, id)
    }

    pub fn mark_reviewed(&mut self, id: &str) -> Result<(), AppError> {
        self.insert_into(keys::REVIEWED, id)
    }

    pub fn unmark_reviewed(&mut self, id: &str) -> Result<(), AppError> {
        self.remove_from(keys::REVIEWED, id)
    }

    pub fn undo_stack(&self) -> Vec<SwipeAction> {
        let Some(content) = self.read(keys::UNDO_STACK) else {
            return Vec::new();
        };

        match codec::decode_actions(&content) {
            Ok(actions) => actions,
            Err(error) => {
                tracing::warn!("discarding corrupt undo stack: {:?}", error);
                Vec::new()
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack().is_empty()
    }

    pub fn push_undo(&mut self, action: SwipeAction) -> Result<(), AppError> {
        let mut stack = self.undo_stack();
        stack.push(action);

        while stack.len() > UNDO_CAP {
            stack.remove(0);
        }

        self.write(keys::UNDO_STACK, codec::encode_actions(&stack)?)
    }

    pub fn pop_undo(&mut self) -> Result<Option<SwipeAction>, AppError> {
        let mut stack = self.undo_stack();
        let action = stack.pop();

        if action.is_some() {
            self.write(keys::UNDO_STACK, codec::encode_actions(&stack)?)?;
        }

        Ok(action)
    }

    pub fn stats(&self) -> SessionStats {
        let Some(content) = self.read(keys::SESSION_STATS) else {
            return SessionStats::default();
        };

        match codec::decode_stats(&content) {
            Ok(stats) => stats,
            Err(error) => {
                tracing::warn!("discarding corrupt session stats: {:?}", error);
                SessionStats::default()
            }
        }
    }

    pub fn set_stats(&mut self, stats: &SessionStats) -> Result<(), AppError> {
        self.write(keys::SESSION_STATS, codec::encode_stats(stats)?)
    }

    pub fn cursor(&self) -> usize {
        let Some(content) = self.read(keys::CURSOR) else {
            return 0;
        };

        String::from_utf8(content)
            .ok()
            .and_then(|cursor| cursor.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn set_cursor(&mut self, cursor: usize) -> Result<(), AppError> {
        self.write(keys::CURSOR, cursor.to_string().into_bytes())
    }

    pub fn filter(&self) -> (Filter, Option<i32>) {
        let Some(content) = self.read(keys::FILTER) else {
            return (Filter::default(), None);
        };

        match codec::decode_filter(&content) {
            Ok(filter) => filter,
            Err(error) => {
                tracing::warn!("discarding corrupt filter state: {:?}", error);
                (Filter::default(), None)
            }
        }
    }

    pub fn set_filter(&mut self, filter: Filter, year: Option<i32>) -> Result<(), AppError> {
        self.write(keys::FILTER, codec::encode_filter(filter, year)?)
    }

    /// Clears all persisted categories. Only driven by an explicit user
    /// reset, never part of the normal flow.
    pub fn reset_all(&mut self) -> Result<(), AppError> {
        self.set_cursor(0)?;
        self.set_filter(Filter::default(), None)?;
        self.write(keys::MARKED_FOR_DELETION, codec::encode_id_set(&HashSet::new())?)?;
        self.write(keys::MAYBE_PILE, codec::encode_id_set(&HashSet::new())?)?;
        self.write(keys::REVIEWED, codec::encode_id_set(&HashSet::new())?)?;
        self.set_stats(&SessionStats::default())?;
        self.write(keys::UNDO_STACK, codec::encode_actions(&[])?)?;

        Ok(())
    }

    fn id_set(&self, key: &str) -> HashSet<String> {
        let Some(content) = self.read(key) else {
            return HashSet::new();
        };

        match codec::decode_id_set(&content) {
            Ok(ids) => ids,
            Err(error) => {
                tracing::warn!("discarding corrupt id set for {}: {:?}", key, error);
                HashSet::new()
            }
        }
    }

    fn insert_into(&mut self, key: &str, id: &str) -> Result<(), AppError> {
        let mut ids = self.id_set(key);
        ids.insert(id.to_owned());
        self.write(key, codec::encode_id_set(&ids)?)
    }

    fn remove_from(&mut self, key: &str, id: &str) -> Result<(), AppError> {
        let mut ids = self.id_set(key);
        ids.remove(id);
        self.write(key, codec::encode_id_set(&ids)?)
    }

    fn read(&self, key: &str) -> Option<Vec<u8>> {
        match self.backend.get(key) {
            Ok(content) => content,
            Err(error) => {
                tracing::warn!("reading state for {} failed: {:?}", key, error);
                None
            }
        }
    }

    fn write(&mut self, key: &str, content: Vec<u8>) -> Result<(), AppError> {
        self.backend.set(key, &content)?;

        Ok(())
    }
}
