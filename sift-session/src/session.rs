use sift_media::MediaCache;

use crate::{
    catalog::{AssetSource, Catalog, Filter},
    error::AppError,
    model::{
        decision::{Decision, SwipeAction},
        group::{group_by_time, ItemGroup, DEFAULT_GROUP_THRESHOLD_SECONDS},
        item::Item,
        stats::SessionStats,
    },
    store::{DecisionSets, StateStore},
};

/// How many upcoming items are kept warm in the card tier.
const PREFETCH_WINDOW: usize = 5;

/// Where the review currently stands for the active filter. Exhausted is
/// terminal until the filter changes, a deletion batch commits or an undo
/// reintroduces an item.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Position {
    Browsing(usize),
    Exhausted,
}

impl Position {
    /// Clamps a desired index into the working set bounds. An empty set is
    /// exhausted by definition, anything else browses a valid index.
    fn clamped(index: usize, len: usize) -> Self {
        if len == 0 {
            Position::Exhausted
        } else {
            Position::Browsing(index.min(len - 1))
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            Position::Browsing(index) => Some(*index),
            Position::Exhausted => None,
        }
    }
}

/// The review session engine. Owns the injected catalog, state store and
/// media cache; every operation is serialized through `&mut self`.
pub struct Session<S> {
    catalog: Catalog<S>,
    store: StateStore,
    cache: MediaCache,
    working_set: Vec<Item>,
    position: Position,
    filter: Filter,
    year: Option<i32>,
    animating: bool,
    prefetched: Vec<String>,
}

impl<S: AssetSource> Session<S> {
    pub fn new(catalog: Catalog<S>, store: StateStore, cache: MediaCache) -> Self {
        Self {
            catalog,
            store,
            cache,
            working_set: Vec::new(),
            position: Position::Exhausted,
            filter: Filter::default(),
            year: None,
            animating: false,
            prefetched: Vec::new(),
        }
    }

    /// Restores filter and cursor, loads the catalog when necessary and
    /// warms the upcoming window.
    pub async fn load(&mut self) -> Result<(), AppError> {
        let (filter, year) = self.store.filter();
        self.filter = filter;
        self.year = year;

        if !self.catalog.is_loaded() {
            self.catalog.load().await?;
        }

        let sets = self.store.decision_sets();
        self.working_set = self.catalog.filtered(self.filter, self.year, &sets);
        self.position = Position::clamped(self.store.cursor(), self.working_set.len());
        self.refresh_prefetch();

        Ok(())
    }

    /// Switches the working set. The cursor of the previous filter is
    /// discarded, not restorable via undo.
    pub fn apply_filter(&mut self, filter: Filter, year: Option<i32>) -> Result<(), AppError> {
        self.filter = filter;
        self.year = year;
        self.store.set_filter(filter, year)?;

        let sets = self.store.decision_sets();
        self.working_set = self.catalog.filtered(filter, year, &sets);
        self.position = Position::clamped(0, self.working_set.len());
        self.store.set_cursor(0)?;
        self.refresh_prefetch();

        Ok(())
    }

    /// Applies a terminal decision to the current item. A no-op without a
    /// current item, while a previous decision is still animating, or for
    /// `Undecided`. Returns whether the decision was applied.
    pub fn decide(&mut self, decision: Decision) -> Result<bool, AppError> {
        if self.animating || decision == Decision::Undecided {
            return Ok(false);
        }

        let Some(index) = self.position.index() else {
            return Ok(false);
        };

        let item_id = self.working_set[index].id.clone();
        self.store.push_undo(SwipeAction::record(&item_id, decision))?;

        match decision {
            Decision::Keep => self.store.mark_reviewed(&item_id)?,
            Decision::Delete => {
                self.store.mark_reviewed(&item_id)?;
                self.store.mark_for_deletion(&item_id)?;
            }
            Decision::Maybe => {
                self.store.mark_reviewed(&item_id)?;
                self.store.add_to_maybe(&item_id)?;
            }
            Decision::Undecided => {}
        }

        let mut stats = self.store.stats();
        stats.items_reviewed += 1;
        self.store.set_stats(&stats)?;

        self.working_set.remove(index);
        self.position = Position::clamped(index, self.working_set.len());
        self.store.set_cursor(self.position.index().unwrap_or(0))?;
        self.refresh_prefetch();

        Ok(true)
    }

    /// Reverses the most recent decision. Repeated calls replay history in
    /// strict reverse order; entries beyond the undo cap are gone for good.
    pub fn undo(&mut self) -> Result<bool, AppError> {
        let Some(action) = self.store.pop_undo()? else {
            return Ok(false);
        };

        match action.decision {
            Decision::Keep => self.store.unmark_reviewed(&action.item_id)?,
            Decision::Delete => {
                self.store.unmark(&action.item_id)?;
                self.store.unmark_reviewed(&action.item_id)?;
            }
            Decision::Maybe => {
                self.store.remove_from_maybe(&action.item_id)?;
                self.store.unmark_reviewed(&action.item_id)?;
            }
            Decision::Undecided => {}
        }

        let mut stats = self.store.stats();
        stats.items_reviewed = stats.items_reviewed.saturating_sub(1);
        self.store.set_stats(&stats)?;

        let prior = self.position.index().unwrap_or(0);
        let sets = self.store.decision_sets();
        self.working_set = self.catalog.filtered(self.filter, self.year, &sets);

        self.position = match self
            .working_set
            .iter()
            .position(|item| item.id == action.item_id)
        {
            Some(index) => Position::Browsing(index),
            None => Position::clamped(prior.saturating_sub(1), self.working_set.len()),
        };

        self.store.set_cursor(self.position.index().unwrap_or(0))?;
        self.refresh_prefetch();

        Ok(true)
    }

    /// Deletes the given items at the asset source and settles all related
    /// state. All or nothing: a rejected batch leaves decision sets, stats
    /// and the snapshot untouched. Returns the bytes freed.
    pub async fn commit_deletion_batch(&mut self, ids: &[String]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let bytes = self.catalog.estimate_bytes(ids).await;
        self.catalog.delete(ids).await?;

        for id in ids {
            self.store.unmark(id)?;
            self.store.remove_from_maybe(id)?;
            self.store.unmark_reviewed(id)?;
        }

        let mut stats = self.store.stats();
        stats.record_deletion(ids.len() as u32, bytes);
        stats.end_session();
        self.store.set_stats(&stats)?;

        self.catalog.prune(ids);
        self.rebuild_working_set()?;

        Ok(bytes)
    }

    /// Takes items out of the deletion pile without deleting anything.
    /// They become reviewable again.
    pub fn restore(&mut self, ids: &[String]) -> Result<(), AppError> {
        for id in ids {
            self.store.unmark(id)?;
            self.store.unmark_reviewed(id)?;
        }

        self.rebuild_working_set()
    }

    /// Reloads the catalog from the asset source. The cache is emptied
    /// first so stale renditions never survive a reload.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        self.cache.clear().await;
        self.prefetched.clear();
        self.catalog.load().await?;
        self.rebuild_working_set()
    }

    /// Explicit user reset of everything persisted.
    pub fn reset(&mut self) -> Result<(), AppError> {
        self.store.reset_all()?;
        self.filter = Filter::default();
        self.year = None;
        self.rebuild_working_set()
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.working_set.get(self.position.index()?)
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.position == Position::Exhausted
    }

    pub fn remaining(&self) -> usize {
        self.working_set.len()
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    pub fn stats(&self) -> SessionStats {
        self.store.stats()
    }

    pub fn decision_sets(&self) -> DecisionSets {
        self.store.decision_sets()
    }

    pub fn marked_count(&self) -> usize {
        self.store.marked_for_deletion().len()
    }

    pub fn maybe_count(&self) -> usize {
        self.store.maybe_pile().len()
    }

    pub fn marked_ids(&self) -> Vec<String> {
        self.trash_items().into_iter().map(|item| item.id).collect()
    }

    /// Items awaiting deletion, for the trash review surface.
    pub fn trash_items(&self) -> Vec<Item> {
        self.catalog.marked_items(&self.store.decision_sets())
    }

    pub fn maybe_pile_items(&self) -> Vec<Item> {
        self.catalog.maybe_items(&self.store.decision_sets())
    }

    /// Burst groups over the current working set.
    pub fn grouped(&self) -> Vec<ItemGroup> {
        group_by_time(&self.working_set, DEFAULT_GROUP_THRESHOLD_SECONDS)
    }

    pub fn available_years(&self) -> &[i32] {
        self.catalog.available_years()
    }

    pub fn total(&self) -> usize {
        self.catalog.total()
    }

    pub fn progress(&self) -> f64 {
        let reviewed = self.store.reviewed().len();
        let total = self.working_set.len() + reviewed;

        if total == 0 {
            0.0
        } else {
            reviewed as f64 / total as f64
        }
    }

    pub fn progress_text(&self) -> String {
        let reviewed = self.store.reviewed().len();

        format!("{} of {}", reviewed, self.working_set.len() + reviewed)
    }

    /// Brackets the swipe animation window. Decisions arriving in between
    /// are dropped, at most one decide is in flight at a time.
    pub fn animation_started(&mut self) {
        self.animating = true;
    }

    pub fn animation_finished(&mut self) {
        self.animating = false;
    }

    fn rebuild_working_set(&mut self) -> Result<(), AppError> {
        let prior = self.position.index().unwrap_or(0);
        let sets = self.store.decision_sets();
        self.working_set = self.catalog.filtered(self.filter, self.year, &sets);
        self.position = Position::clamped(prior, self.working_set.len());
        self.store.set_cursor(self.position.index().unwrap_or(0))?;
        self.refresh_prefetch();

        Ok(())
    }

    // Warms the next few items and withdraws intent for everything that
    // left the window.
    fn refresh_prefetch(&mut self) {
        let upcoming: Vec<String> = match self.position.index() {
            Some(index) => self
                .working_set
                .iter()
                .skip(index)
                .take(PREFETCH_WINDOW)
                .map(|item| item.id.clone())
                .collect(),
            None => Vec::new(),
        };

        let stale: Vec<String> = self
            .prefetched
            .iter()
            .filter(|id| !upcoming.contains(id))
            .cloned()
            .collect();

        self.cache.stop_prefetch(&stale);
        self.cache.start_prefetch(&upcoming);
        self.prefetched = upcoming;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clamped_position_makes_invalid_indices_unrepresentable() {
        assert_eq!(Position::Exhausted, Position::clamped(0, 0));
        assert_eq!(Position::Exhausted, Position::clamped(7, 0));
        assert_eq!(Position::Browsing(0), Position::clamped(0, 3));
        assert_eq!(Position::Browsing(2), Position::clamped(7, 3));
    }
}
