use crate::catalog::{CatalogStore, ALL_CATEGORIES};
use crate::config::PlaybackConfig;
use crate::fetch::CatalogFetcher;
use crate::navigation::Navigator;
use crate::protocol::{Channel, TvState};
use crate::registry::{self, ALL_REGIONS};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Everything behind the single lock: catalog, cursor and settings flags.
#[derive(Debug)]
struct Session {
    rev: u64,
    /// Generation of the most recently started load.
    generation: u64,
    loading: bool,
    region: String,
    store: CatalogStore,
    navigator: Navigator,
    auto_skip_broken: bool,
    subtitles_enabled: bool,
}

impl Session {
    fn touch(&mut self) {
        self.rev += 1;
    }

    fn snapshot(&self) -> TvState {
        let view = self.store.view();
        let (next, prev) = self.navigator.neighbors(view);
        TvState {
            rev: self.rev,
            loading: self.loading,
            region: self.region.clone(),
            category: self.store.filter().to_string(),
            categories: self.store.categories().to_vec(),
            total_channels: self.store.len(),
            channels: view.to_vec(),
            selected: self.navigator.selected().cloned(),
            next,
            prev,
            broken_count: self.navigator.broken_count(),
            auto_skip_broken: self.auto_skip_broken,
            subtitles_enabled: self.subtitles_enabled,
        }
    }
}

/// Handed out by [`StateManager::begin_load`]; only the ticket of the newest
/// load can apply its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub region: String,
}

/// Single source of truth for catalog + cursor.  All mutation goes through
/// these methods, each under one write lock, so readers only ever see whole
/// states.
pub struct StateManager {
    session: Arc<RwLock<Session>>,
}

impl StateManager {
    pub fn new(playback: &PlaybackConfig) -> Self {
        let session = Session {
            rev: 1,
            generation: 0,
            loading: false,
            region: ALL_REGIONS.to_string(),
            store: CatalogStore::new(),
            navigator: Navigator::new(),
            auto_skip_broken: playback.auto_skip_broken,
            subtitles_enabled: playback.subtitles_enabled,
        };

        Self {
            session: Arc::new(RwLock::new(session)),
        }
    }

    pub async fn get_state(&self) -> TvState {
        self.session.read().await.snapshot()
    }

    pub async fn rev(&self) -> u64 {
        self.session.read().await.rev
    }

    // ── loading ───────────────────────────────────────────────────────────────

    /// Start a load for `region`: the catalog, cursor and broken set are
    /// dropped, the category filter returns to "All" and `loading` is set.
    pub async fn begin_load(&self, region: &str) -> LoadTicket {
        let region = region.trim().to_lowercase();
        if !registry::is_known_region(&region) {
            warn!("Loading unknown region code '{}'", region);
        }

        let mut session = self.session.write().await;
        session.generation += 1;
        session.loading = true;
        session.region = region.clone();
        session.store.set_category_filter(ALL_CATEGORIES);
        session.store.clear();
        session.navigator.clear_selection();
        session.navigator.clear_broken();
        session.touch();

        info!("Load #{} started for region '{}'", session.generation, region);
        LoadTicket {
            generation: session.generation,
            region,
        }
    }

    /// Apply the result of a load.  Returns false, leaving state untouched,
    /// when a newer load has started since `ticket` was issued.
    pub async fn finish_load(&self, ticket: LoadTicket, channels: Vec<Channel>) -> bool {
        let mut session = self.session.write().await;
        if ticket.generation != session.generation {
            info!(
                "Discarding stale load #{} for '{}' (current is #{})",
                ticket.generation, ticket.region, session.generation
            );
            return false;
        }

        session.store.replace(channels);
        let first = session.store.channels().first().cloned();
        match first {
            Some(channel) => session.navigator.select(channel),
            None => session.navigator.clear_selection(),
        }
        session.loading = false;
        session.touch();

        info!(
            "Load #{} applied: {} channels, {} categories",
            ticket.generation,
            session.store.len(),
            session.store.categories().len() - 1
        );
        true
    }

    /// Begin, fetch and finish a load in one go.  Returns whether the result
    /// was applied.
    pub async fn load_region(&self, fetcher: &CatalogFetcher, region: &str) -> bool {
        let ticket = self.begin_load(region).await;
        let channels = fetcher.fetch_region(&ticket.region).await;
        self.finish_load(ticket, channels).await
    }

    // ── filtering ─────────────────────────────────────────────────────────────

    /// Re-filter the view.  Neither the cursor nor the broken set changes.
    pub async fn select_category(&self, label: &str) {
        let mut session = self.session.write().await;
        session.store.set_category_filter(label);
        session.touch();
        debug!(
            "Category '{}': {} of {} channels",
            label,
            session.store.view().len(),
            session.store.len()
        );
    }

    // ── cursor ────────────────────────────────────────────────────────────────

    pub async fn current(&self) -> Option<Channel> {
        self.session.read().await.navigator.selected().cloned()
    }

    /// Select a channel of the full catalog by stream URL.  Returns false if
    /// no such channel is loaded.
    pub async fn select_by_url(&self, stream_url: &str) -> bool {
        let mut session = self.session.write().await;
        let Some(channel) = session.store.find(stream_url).cloned() else {
            return false;
        };
        session.navigator.select(channel);
        session.touch();
        true
    }

    pub async fn next(&self) -> Option<Channel> {
        let mut session = self.session.write().await;
        let Session {
            store, navigator, ..
        } = &mut *session;
        let selected = navigator.next(store.view()).cloned();
        session.touch();
        selected
    }

    pub async fn prev(&self) -> Option<Channel> {
        let mut session = self.session.write().await;
        let Session {
            store, navigator, ..
        } = &mut *session;
        let selected = navigator.previous(store.view()).cloned();
        session.touch();
        selected
    }

    /// Flag a stream as broken, advancing the cursor if it is the current
    /// channel.  The URL is resolved against the catalog (or the current
    /// selection); unknown URLs are ignored.  Returns true if the cursor
    /// moved.
    pub async fn mark_broken(&self, stream_url: &str) -> bool {
        let mut session = self.session.write().await;
        let Session {
            store, navigator, ..
        } = &mut *session;

        let channel = store
            .find(stream_url)
            .or_else(|| navigator.selected().filter(|c| c.stream_url == stream_url))
            .cloned();
        let Some(channel) = channel else {
            debug!("mark_broken: '{}' is not in the catalog", stream_url);
            return false;
        };

        let moved = navigator.mark_broken(&channel, store.view());
        info!(
            "Marked broken: {} ({} broken){}",
            channel.name,
            navigator.broken_count(),
            if moved { ", advanced" } else { "" }
        );
        session.touch();
        moved
    }

    // ── settings flags ────────────────────────────────────────────────────────

    pub async fn auto_skip_broken(&self) -> bool {
        self.session.read().await.auto_skip_broken
    }

    pub async fn toggle_auto_skip(&self) -> bool {
        let mut session = self.session.write().await;
        session.auto_skip_broken = !session.auto_skip_broken;
        session.touch();
        session.auto_skip_broken
    }

    pub async fn toggle_subtitles(&self) -> bool {
        let mut session = self.session.write().await;
        session.subtitles_enabled = !session.subtitles_enabled;
        session.touch();
        session.subtitles_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn channel(name: &str, category: &str) -> Channel {
        Channel {
            name: name.to_string(),
            stream_url: format!("http://streams.example/{}.m3u8", name),
            category: category.to_string(),
            region: "all".to_string(),
            ..Default::default()
        }
    }

    fn catalog() -> Vec<Channel> {
        vec![
            channel("a", "news"),
            channel("b", "news"),
            channel("c", "music"),
            channel("d", "sports"),
        ]
    }

    async fn loaded() -> StateManager {
        let sm = StateManager::new(&PlaybackConfig::default());
        let ticket = sm.begin_load("all").await;
        assert!(sm.finish_load(ticket, catalog()).await);
        sm
    }

    #[tokio::test]
    async fn test_load_selects_first_channel() {
        let sm = loaded().await;
        let state = sm.get_state().await;
        assert!(!state.loading);
        assert_eq!(state.total_channels, 4);
        assert_eq!(state.selected.as_ref(), state.channels.first());
        assert_eq!(state.categories, vec!["All", "music", "news", "sports"]);

        let names: HashSet<_> = state.channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, HashSet::from(["a", "b", "c", "d"]));
    }

    #[tokio::test]
    async fn test_begin_load_reports_loading_and_empty() {
        let sm = loaded().await;
        let _ticket = sm.begin_load("de").await;
        let state = sm.get_state().await;
        assert!(state.loading);
        assert_eq!(state.region, "de");
        assert!(state.channels.is_empty());
        assert!(state.selected.is_none());
    }

    #[tokio::test]
    async fn test_empty_load_is_loaded_and_empty() {
        let sm = StateManager::new(&PlaybackConfig::default());
        let ticket = sm.begin_load("us").await;
        assert!(sm.finish_load(ticket, Vec::new()).await);
        let state = sm.get_state().await;
        assert!(!state.loading);
        assert_eq!(state.total_channels, 0);
        assert!(state.selected.is_none());
    }

    #[tokio::test]
    async fn test_stale_load_is_discarded() {
        let sm = StateManager::new(&PlaybackConfig::default());
        let slow = sm.begin_load("fr").await;
        let fast = sm.begin_load("de").await;

        assert!(sm.finish_load(fast, vec![channel("de1", "news")]).await);
        assert!(!sm.finish_load(slow, vec![channel("fr1", "news")]).await);

        let state = sm.get_state().await;
        assert_eq!(state.region, "de");
        assert_eq!(state.channels.len(), 1);
        assert_eq!(state.channels[0].name, "de1");
    }

    #[tokio::test]
    async fn test_category_switch_keeps_cursor_and_broken_set() {
        let sm = loaded().await;
        assert!(sm.select_by_url("http://streams.example/c.m3u8").await);
        sm.mark_broken("http://streams.example/a.m3u8").await;

        sm.select_category("news").await;
        let state = sm.get_state().await;
        assert_eq!(state.category, "news");
        assert_eq!(state.channels.len(), 2);
        assert_eq!(state.selected.unwrap().name, "c");
        assert_eq!(state.broken_count, 1);
        // cursor is outside the view: no neighbours to pre-buffer
        assert!(state.next.is_none());
    }

    #[tokio::test]
    async fn test_next_within_filtered_view() {
        let sm = loaded().await;
        sm.select_category("news").await;
        assert!(sm.select_by_url("http://streams.example/a.m3u8").await);
        sm.mark_broken("http://streams.example/b.m3u8").await;

        // b is broken and the only other news channel, so a wraps onto itself
        let picked = sm.next().await.unwrap();
        assert_eq!(picked.name, "a");
    }

    #[tokio::test]
    async fn test_mark_broken_current_advances() {
        let sm = loaded().await;
        let current = sm.current().await.unwrap();
        assert!(sm.mark_broken(&current.stream_url).await);
        assert_ne!(sm.current().await.unwrap().stream_url, current.stream_url);
    }

    #[tokio::test]
    async fn test_region_switch_resets_broken_set() {
        let sm = loaded().await;
        let victim = "http://streams.example/b.m3u8";
        sm.mark_broken(victim).await;
        assert_eq!(sm.get_state().await.broken_count, 1);

        let ticket = sm.begin_load("de").await;
        sm.finish_load(ticket, vec![channel("x", "news")]).await;
        let ticket = sm.begin_load("all").await;
        sm.finish_load(ticket, catalog()).await;

        assert_eq!(sm.get_state().await.broken_count, 0);
        sm.select_category("news").await;
        assert!(sm.select_by_url("http://streams.example/a.m3u8").await);
        // b is reachable again
        assert_eq!(sm.next().await.unwrap().stream_url, victim);
    }

    #[tokio::test]
    async fn test_unknown_urls_are_ignored() {
        let sm = loaded().await;
        assert!(!sm.select_by_url("http://nowhere.example/x").await);
        assert!(!sm.mark_broken("http://nowhere.example/x").await);
        assert_eq!(sm.get_state().await.broken_count, 0);
    }

    #[tokio::test]
    async fn test_every_mutation_bumps_rev() {
        let sm = loaded().await;
        let before = sm.rev().await;
        sm.next().await;
        sm.select_category("music").await;
        assert!(!sm.toggle_auto_skip().await);
        assert!(!sm.auto_skip_broken().await);
        assert_eq!(sm.rev().await, before + 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_mixed_catalogs() {
        use std::sync::atomic::{AtomicBool, Ordering};

        fn regional(region: &str) -> Vec<Channel> {
            (0..50)
                .map(|i| Channel {
                    name: format!("{}{}", region, i),
                    stream_url: format!("http://{}.example/{}.m3u8", region, i),
                    category: "news".to_string(),
                    region: region.to_string(),
                    ..Default::default()
                })
                .collect()
        }

        let sm = Arc::new(StateManager::new(&PlaybackConfig::default()));
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let sm = sm.clone();
                let done = done.clone();
                tokio::spawn(async move {
                    let mut snapshots = 0usize;
                    loop {
                        let finished = done.load(Ordering::Relaxed);
                        let state = sm.get_state().await;
                        let regions: HashSet<&str> =
                            state.channels.iter().map(|c| c.region.as_str()).collect();
                        assert!(regions.len() <= 1, "mixed catalog: {:?}", regions);
                        if let Some(region) = regions.into_iter().next() {
                            assert_eq!(region, state.region);
                            assert_eq!(state.channels.len(), 50);
                        }
                        snapshots += 1;
                        if finished {
                            break;
                        }
                        tokio::task::yield_now().await;
                    }
                    snapshots
                })
            })
            .collect();

        for i in 0..200 {
            let region = if i % 2 == 0 { "de" } else { "fr" };
            let ticket = sm.begin_load(region).await;
            assert!(sm.finish_load(ticket, regional(region)).await);
            tokio::task::yield_now().await;
        }
        done.store(true, Ordering::Relaxed);

        for reader in readers {
            assert!(reader.await.unwrap() > 0);
        }
    }
}
