use std::cmp::Ordering;

use gallery_types::models::Media;

/// Local copy of the media list, kept in the server's list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaCache {
    items: Vec<Media>,
}

impl MediaCache {
    pub fn new(items: Vec<Media>) -> Self {
        let mut cache = Self { items };
        cache.sort();
        cache
    }

    pub fn items(&self) -> &[Media] {
        &self.items
    }

    pub fn ids(&self) -> Vec<i64> {
        self.items.iter().map(|m| m.id).collect()
    }

    pub fn get(&self, id: i64) -> Option<&Media> {
        self.items.iter().find(|m| m.id == id)
    }

    pub fn replace(&mut self, items: Vec<Media>) {
        self.items = items;
        self.sort();
    }

    pub fn snapshot(&self) -> Vec<Media> {
        self.items.clone()
    }

    pub fn restore(&mut self, snapshot: Vec<Media>) {
        self.items = snapshot;
    }

    /// Mirror of the server's reorder: listed ids get `displayOrder = index`,
    /// unknown ids are ignored, everything else keeps its value.
    pub fn apply_reorder(&mut self, ordered_ids: &[i64]) {
        for (index, id) in ordered_ids.iter().enumerate() {
            if let Some(item) = self.items.iter_mut().find(|m| m.id == *id) {
                item.display_order = index as i64;
            }
        }
        self.sort();
    }

    /// Returns false when the id is not cached.
    pub fn apply_like(&mut self, id: i64, liked: bool) -> bool {
        match self.items.iter_mut().find(|m| m.id == id) {
            Some(item) => {
                item.liked = liked;
                true
            }
            None => false,
        }
    }

    pub fn upsert(&mut self, media: Media) {
        match self.items.iter_mut().find(|m| m.id == media.id) {
            Some(item) => *item = media,
            None => self.items.push(media),
        }
        self.sort();
    }

    pub fn remove(&mut self, id: i64) -> Option<Media> {
        let pos = self.items.iter().position(|m| m.id == id)?;
        Some(self.items.remove(pos))
    }

    fn sort(&mut self) {
        self.items.sort_by(list_order);
    }
}

/// Ascending `displayOrder`, then newest first, then highest id first.
fn list_order(a: &Media, b: &Media) -> Ordering {
    a.display_order
        .cmp(&b.display_order)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}
