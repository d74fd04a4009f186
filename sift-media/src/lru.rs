use std::collections::{HashMap, VecDeque};

use crate::MediaImage;

/// Bounded associative image store with least recently used eviction.
///
/// Access order is kept explicitly next to the map: the front of `order`
/// is the coldest entry and gets evicted first when the bound is exceeded.
pub struct BoundedCache {
    capacity: usize,
    entries: HashMap<String, MediaImage>,
    order: VecDeque<String>,
}

impl BoundedCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&mut self, id: &str) -> Option<MediaImage> {
        let image = self.entries.get(id).cloned()?;
        self.touch(id);

        Some(image)
    }

    pub fn insert(&mut self, id: String, image: MediaImage) {
        if self.capacity == 0 {
            return;
        }

        if self.entries.insert(id.clone(), image).is_some() {
            self.touch(&id);
            return;
        }

        self.order.push_back(id);
        while self.entries.len() > self.capacity {
            let Some(coldest) = self.order.pop_front() else {
                break;
            };

            self.entries.remove(&coldest);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn touch(&mut self, id: &str) {
        if let Some(index) = self.order.iter().position(|queued| queued == id) {
            self.order.remove(index);
            self.order.push_back(id.to_owned());
        }
    }
}
