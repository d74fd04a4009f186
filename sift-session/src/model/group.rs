use chrono::{DateTime, Duration, Local};

use super::item::Item;

pub const DEFAULT_GROUP_THRESHOLD_SECONDS: i64 = 10;

/// Ephemeral burst grouping of items captured within a short window of
/// each other. Recomputed on demand, never persisted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ItemGroup {
    pub items: Vec<Item>,
    pub started_at: Option<DateTime<Local>>,
}

impl ItemGroup {
    fn new(items: Vec<Item>) -> Self {
        let started_at = items.first().and_then(|item| item.created_at);

        Self { items, started_at }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.items.len() == 1
    }
}

/// Sorts candidates ascending by capture time and merges adjacent items
/// within `threshold_seconds` of the previous one. Items without a
/// timestamp form singleton groups and break the current run.
pub fn group_by_time(items: &[Item], threshold_seconds: i64) -> Vec<ItemGroup> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|item| item.created_at);

    let mut groups = Vec::new();
    let mut current: Vec<Item> = Vec::new();
    let mut previous: Option<DateTime<Local>> = None;

    for item in sorted {
        let Some(created) = item.created_at else {
            if !current.is_empty() {
                groups.push(ItemGroup::new(std::mem::take(&mut current)));
            }

            groups.push(ItemGroup::new(vec![item]));
            previous = None;
            continue;
        };

        match previous {
            Some(last) if created - last <= Duration::seconds(threshold_seconds) => {
                current.push(item);
            }
            Some(_) => {
                if !current.is_empty() {
                    groups.push(ItemGroup::new(std::mem::take(&mut current)));
                }

                current.push(item);
            }
            None => current.push(item),
        }

        previous = Some(created);
    }

    if !current.is_empty() {
        groups.push(ItemGroup::new(current));
    }

    groups
}

#[cfg(test)]
mod test {
    use super::super::item::ItemKind;
    use super::*;

    fn item(id: &str, seconds_offset: Option<i64>) -> Item {
        Item {
            id: id.to_owned(),
            kind: ItemKind::Photo,
            created_at: seconds_offset
                .map(|offset| Local::now() - Duration::seconds(1_000 - offset)),
            is_screenshot: false,
            byte_size: 0,
            pixel_width: 0,
            pixel_height: 0,
        }
    }

    fn ids(group: &ItemGroup) -> Vec<&str> {
        group.items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn adjacent_items_within_threshold_merge() {
        let items = [
            item("a", Some(0)),
            item("b", Some(5)),
            item("c", Some(12)),
            item("d", Some(60)),
        ];

        let groups = group_by_time(&items, DEFAULT_GROUP_THRESHOLD_SECONDS);

        assert_eq!(2, groups.len());
        assert_eq!(vec!["a", "b", "c"], ids(&groups[0]));
        assert_eq!(vec!["d"], ids(&groups[1]));
    }

    #[test]
    fn untimestamped_items_form_singletons_and_break_runs() {
        let items = [item("a", Some(0)), item("b", None), item("c", Some(4))];

        let groups = group_by_time(&items, DEFAULT_GROUP_THRESHOLD_SECONDS);

        assert_eq!(2, groups.len());
        assert_eq!(vec!["b"], ids(&groups[0]));
        assert!(groups[0].is_single());
        assert_eq!(vec!["a", "c"], ids(&groups[1]));
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let groups = group_by_time(&[], DEFAULT_GROUP_THRESHOLD_SECONDS);

        assert!(groups.is_empty());
    }

    #[test]
    fn group_keeps_first_capture_time() {
        let items = [item("a", Some(0)), item("b", Some(3))];

        let groups = group_by_time(&items, DEFAULT_GROUP_THRESHOLD_SECONDS);

        assert_eq!(1, groups.len());
        assert_eq!(items[0].created_at, groups[0].started_at);
    }
}
