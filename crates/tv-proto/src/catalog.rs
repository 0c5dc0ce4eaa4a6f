//! Catalog store: the full channel set of the last load, its category index,
//! and the view selected by the active category filter.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::protocol::Channel;

/// Category sentinel that disables filtering.  Matched exactly.
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone)]
pub struct CatalogStore {
    channels: Vec<Channel>,
    categories: Vec<String>,
    filter: String,
    view: Vec<Channel>,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            categories: vec![ALL_CATEGORIES.to_string()],
            filter: ALL_CATEGORIES.to_string(),
            view: Vec::new(),
        }
    }
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly loaded channel set, shuffled.  The active filter is
    /// kept and re-applied.
    pub fn replace(&mut self, channels: Vec<Channel>) {
        self.replace_with_rng(channels, &mut rand::thread_rng());
    }

    pub fn replace_with_rng<R: Rng + ?Sized>(&mut self, mut channels: Vec<Channel>, rng: &mut R) {
        channels.shuffle(rng);
        self.categories = derive_categories(&channels);
        self.channels = channels;
        self.refilter();
    }

    /// Drop every channel; used while a load is in flight.
    pub fn clear(&mut self) {
        self.replace_with_rng(Vec::new(), &mut rand::thread_rng());
    }

    pub fn set_category_filter(&mut self, label: &str) {
        self.filter = label.to_string();
        self.refilter();
    }

    fn refilter(&mut self) {
        self.view = if self.filter == ALL_CATEGORIES {
            self.channels.clone()
        } else {
            let wanted = self.filter.to_lowercase();
            self.channels
                .iter()
                .filter(|c| c.category.to_lowercase() == wanted)
                .cloned()
                .collect()
        };
    }

    /// The full catalog, in (shuffled) presentation order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Channels matching the active filter.
    pub fn view(&self) -> &[Channel] {
        &self.view
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Look up a channel of the full catalog by stream URL.
    pub fn find(&self, stream_url: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.stream_url == stream_url)
    }

    pub fn contains(&self, stream_url: &str) -> bool {
        self.find(stream_url).is_some()
    }
}

/// Sorted distinct categories with the `"All"` sentinel prepended.
fn derive_categories(channels: &[Channel]) -> Vec<String> {
    let distinct: BTreeSet<&str> = channels.iter().map(|c| c.category.as_str()).collect();
    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(distinct.into_iter().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn channel(name: &str, category: &str) -> Channel {
        Channel {
            name: name.to_string(),
            stream_url: format!("http://streams.example/{}", name),
            category: category.to_string(),
            region: "all".to_string(),
            ..Default::default()
        }
    }

    fn sample() -> Vec<Channel> {
        vec![
            channel("a", "news"),
            channel("b", "music"),
            channel("c", "news"),
            channel("d", "sports"),
        ]
    }

    fn urls(channels: &[Channel]) -> HashSet<String> {
        channels.iter().map(|c| c.stream_url.clone()).collect()
    }

    #[test]
    fn test_replace_keeps_the_same_set() {
        let mut store = CatalogStore::new();
        store.replace(sample());
        assert_eq!(urls(store.channels()), urls(&sample()));
        assert_eq!(urls(store.view()), urls(&sample()));
    }

    #[test]
    fn test_categories_sorted_with_sentinel_first() {
        let mut store = CatalogStore::new();
        store.replace(sample());
        assert_eq!(store.categories(), &["All", "music", "news", "sports"]);
    }

    #[test]
    fn test_empty_store_still_lists_sentinel() {
        let store = CatalogStore::new();
        assert_eq!(store.categories(), &["All"]);
        assert!(store.view().is_empty());
        assert_eq!(store.filter(), ALL_CATEGORIES);
    }

    #[test]
    fn test_filter_is_case_insensitive_subset() {
        let mut store = CatalogStore::new();
        store.replace(sample());
        store.set_category_filter("NEWS");
        assert_eq!(store.view().len(), 2);
        assert!(store.view().iter().all(|c| store.contains(&c.stream_url)));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_all_filter_is_idempotent() {
        let mut store = CatalogStore::new();
        store.replace(sample());
        store.set_category_filter(ALL_CATEGORIES);
        let once = store.view().to_vec();
        store.set_category_filter(ALL_CATEGORIES);
        assert_eq!(store.view(), once.as_slice());
    }

    #[test]
    fn test_sentinel_match_is_exact() {
        let mut store = CatalogStore::new();
        store.replace(sample());
        // lower-case "all" is an ordinary label, not the sentinel
        store.set_category_filter("all");
        assert!(store.view().is_empty());
    }

    #[test]
    fn test_unknown_category_gives_empty_view() {
        let mut store = CatalogStore::new();
        store.replace(sample());
        store.set_category_filter("cooking");
        assert!(store.view().is_empty());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_replace_reapplies_active_filter() {
        let mut store = CatalogStore::new();
        store.set_category_filter("music");
        store.replace(sample());
        assert_eq!(store.view().len(), 1);
        assert_eq!(store.view()[0].name, "b");
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut store = CatalogStore::new();
        store.replace(sample());
        store.clear();
        assert!(store.is_empty());
        assert!(store.view().is_empty());
        assert_eq!(store.categories(), &["All"]);
    }
}
