use crate::{
    error::AppError,
    model::item::Item,
    store::DecisionSets,
};

/// Selector for the working set. `LargestFirst` re-sorts by size, every
/// other selector keeps the source order (most recent first).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Filter {
    #[default]
    All,
    Screenshots,
    Last30Days,
    LargestFirst,
    MaybePile,
}

impl Filter {
    pub fn all() -> [Filter; 5] {
        [
            Filter::All,
            Filter::Screenshots,
            Filter::Last30Days,
            Filter::LargestFirst,
            Filter::MaybePile,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Screenshots => "screenshots",
            Filter::Last30Days => "last30days",
            Filter::LargestFirst => "largest",
            Filter::MaybePile => "maybe",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Filter::All),
            "screenshots" => Some(Filter::Screenshots),
            "last30days" => Some(Filter::Last30Days),
            "largest" => Some(Filter::LargestFirst),
            "maybe" => Some(Filter::MaybePile),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Filter::All => "All Items",
            Filter::Screenshots => "Screenshots",
            Filter::Last30Days => "Last 30 Days",
            Filter::LargestFirst => "Largest First",
            Filter::MaybePile => "Maybe Pile",
        }
    }
}

/// External store of immutable media items. Queried once per catalog load
/// and never mutated by the session core, deletion batches excepted.
#[allow(async_fn_in_trait)]
pub trait AssetSource: Send + Sync {
    /// Most recent first; fails with `SourceUnavailable` when the backing
    /// library cannot be queried.
    async fn list_all(&self) -> Result<Vec<Item>, AppError>;

    async fn delete(&self, ids: &[String]) -> Result<(), AppError>;

    /// Best effort, 0 when unknown.
    async fn estimate_byte_size(&self, id: &str) -> u64;
}

/// Owns the item snapshot and answers filter, group and count queries over
/// it. Filtering is pure over the snapshot and the given decision sets.
pub struct Catalog<S> {
    source: S,
    items: Vec<Item>,
    years: Vec<i32>,
    loaded: bool,
}

impl<S: AssetSource> Catalog<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            items: Vec::new(),
            years: Vec::new(),
            loaded: false,
        }
    }

    pub async fn load(&mut self) -> Result<(), AppError> {
        let items = self.source.list_all().await?;

        let mut years: Vec<i32> = items.iter().filter_map(Item::year).collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();

        tracing::debug!("catalog loaded with {} items", items.len());

        self.items = items;
        self.years = years;
        self.loaded = true;

        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Distinct capture years, newest first.
    pub fn available_years(&self) -> &[i32] {
        &self.years
    }

    /// Working selectors exclude everything already reviewed or awaiting
    /// deletion. The maybe pile ignores reviewed but still excludes
    /// deletion candidates.
    pub fn filtered(&self, filter: Filter, year: Option<i32>, sets: &DecisionSets) -> Vec<Item> {
        let mut result: Vec<Item> = match filter {
            Filter::All => self
                .items
                .iter()
                .filter(|item| is_undecided(item, sets))
                .cloned()
                .collect(),
            Filter::Screenshots => self
                .items
                .iter()
                .filter(|item| item.is_screenshot && is_undecided(item, sets))
                .cloned()
                .collect(),
            Filter::Last30Days => self
                .items
                .iter()
                .filter(|item| item.is_from_last_30_days() && is_undecided(item, sets))
                .cloned()
                .collect(),
            Filter::LargestFirst => {
                let mut largest: Vec<Item> = self
                    .items
                    .iter()
                    .filter(|item| is_undecided(item, sets))
                    .cloned()
                    .collect();

                // Stable, ties keep their source order.
                largest.sort_by(|a, b| b.byte_size.cmp(&a.byte_size));
                largest
            }
            Filter::MaybePile => self
                .items
                .iter()
                .filter(|item| {
                    sets.maybe_pile.contains(&item.id)
                        && !sets.marked_for_deletion.contains(&item.id)
                })
                .cloned()
                .collect(),
        };

        if let Some(year) = year {
            result.retain(|item| item.year() == Some(year));
        }

        result
    }

    pub fn unreviewed_count(&self, filter: Filter, year: Option<i32>, sets: &DecisionSets) -> usize {
        self.filtered(filter, year, sets).len()
    }

    /// Items awaiting deletion, in snapshot order.
    pub fn marked_items(&self, sets: &DecisionSets) -> Vec<Item> {
        self.items
            .iter()
            .filter(|item| sets.marked_for_deletion.contains(&item.id))
            .cloned()
            .collect()
    }

    pub fn maybe_items(&self, sets: &DecisionSets) -> Vec<Item> {
        self.items
            .iter()
            .filter(|item| sets.maybe_pile.contains(&item.id))
            .cloned()
            .collect()
    }

    /// Drops committed deletions from the in-memory snapshot.
    pub fn prune(&mut self, ids: &[String]) {
        self.items.retain(|item| !ids.contains(&item.id));
    }

    pub async fn estimate_bytes(&self, ids: &[String]) -> u64 {
        let mut total = 0;
        for id in ids {
            total += self.source.estimate_byte_size(id).await;
        }

        total
    }

    pub async fn delete(&self, ids: &[String]) -> Result<(), AppError> {
        self.source.delete(ids).await
    }
}

fn is_undecided(item: &Item, sets: &DecisionSets) -> bool {
    !sets.reviewed.contains(&item.id) && !sets.marked_for_deletion.contains(&item.id)
}

#[cfg(test)]
mod test {
    use chrono::{Datelike, Duration, Local};

    use crate::model::item::ItemKind;

    use super::*;

    struct StubSource {
        items: Vec<Item>,
    }

    impl AssetSource for StubSource {
        async fn list_all(&self) -> Result<Vec<Item>, AppError> {
            Ok(self.items.clone())
        }

        async fn delete(&self, _ids: &[String]) -> Result<(), AppError> {
            Ok(())
        }

        async fn estimate_byte_size(&self, _id: &str) -> u64 {
            0
        }
    }

    fn item(id: &str, days_old: i64, is_screenshot: bool, byte_size: u64) -> Item {
        Item {
            id: id.to_owned(),
            kind: ItemKind::Photo,
            created_at: Some(Local::now() - Duration::days(days_old)),
            is_screenshot,
            byte_size,
            pixel_width: 0,
            pixel_height: 0,
        }
    }

    async fn catalog_with(items: Vec<Item>) -> Catalog<StubSource> {
        let mut catalog = Catalog::new(StubSource { items });
        catalog.load().await.expect("catalog load");
        catalog
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[tokio::test]
    async fn filters_keep_source_order_and_respect_facts() {
        let catalog = catalog_with(vec![
            item("a", 10, true, 2_000_000),
            item("b", 40, false, 9_000_000),
            item("c", 2, true, 1_000_000),
        ])
        .await;
        let sets = DecisionSets::default();

        assert_eq!(
            vec!["a", "c"],
            ids(&catalog.filtered(Filter::Screenshots, None, &sets))
        );
        assert_eq!(
            vec!["a", "c"],
            ids(&catalog.filtered(Filter::Last30Days, None, &sets))
        );
        assert_eq!(
            vec!["b", "a", "c"],
            ids(&catalog.filtered(Filter::LargestFirst, None, &sets))
        );
    }

    #[tokio::test]
    async fn working_selectors_exclude_reviewed_and_marked() {
        let catalog = catalog_with(vec![
            item("a", 1, false, 10),
            item("b", 2, false, 20),
            item("c", 3, false, 30),
        ])
        .await;

        let mut sets = DecisionSets::default();
        sets.reviewed.insert("a".to_owned());
        sets.reviewed.insert("b".to_owned());
        sets.marked_for_deletion.insert("b".to_owned());

        assert_eq!(vec!["c"], ids(&catalog.filtered(Filter::All, None, &sets)));
    }

    #[tokio::test]
    async fn maybe_pile_ignores_reviewed_but_excludes_marked() {
        let catalog = catalog_with(vec![item("a", 1, false, 10), item("b", 2, false, 20)]).await;

        let mut sets = DecisionSets::default();
        sets.reviewed.insert("a".to_owned());
        sets.reviewed.insert("b".to_owned());
        sets.maybe_pile.insert("a".to_owned());
        sets.maybe_pile.insert("b".to_owned());
        sets.marked_for_deletion.insert("b".to_owned());

        assert_eq!(
            vec!["a"],
            ids(&catalog.filtered(Filter::MaybePile, None, &sets))
        );
    }

    #[tokio::test]
    async fn year_sub_filter_applies_on_top() {
        let this_year = (Local::now() - Duration::days(1)).year();

        let catalog = catalog_with(vec![
            item("a", 1, false, 10),
            item("old", 4_000, false, 20),
        ])
        .await;
        let sets = DecisionSets::default();

        assert_eq!(
            vec!["a"],
            ids(&catalog.filtered(Filter::All, Some(this_year), &sets))
        );
        assert_eq!(2, catalog.available_years().len());
    }

    #[tokio::test]
    async fn ties_on_size_keep_source_order() {
        let catalog = catalog_with(vec![
            item("a", 1, false, 10),
            item("b", 2, false, 10),
            item("c", 3, false, 99),
        ])
        .await;
        let sets = DecisionSets::default();

        assert_eq!(
            vec!["c", "a", "b"],
            ids(&catalog.filtered(Filter::LargestFirst, None, &sets))
        );
    }

    #[tokio::test]
    async fn prune_drops_items_from_the_snapshot() {
        let mut catalog = catalog_with(vec![item("a", 1, false, 10), item("b", 2, false, 20)]).await;

        catalog.prune(&["a".to_owned()]);

        assert_eq!(1, catalog.total());
        assert_eq!(vec!["b"], ids(catalog.items()));
    }
}
