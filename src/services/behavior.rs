//! Consent-gated behavior tracking.
//!
//! Every tracker is a no-op for visitors without consent, and storage
//! failures are logged and swallowed so callers never see an error.
//! Mutations of one visitor's record are serialized, so a load-modify-save
//! never interleaves with another one or with a purge.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::AppResult,
    models::{BehaviorRecord, ViewedItem},
};

/// Durable key-value storage for behavior records, keyed by visitor id
#[async_trait::async_trait]
pub trait BehaviorStore: Send + Sync {
    async fn load(&self, visitor: &str) -> AppResult<Option<BehaviorRecord>>;

    async fn save(&self, visitor: &str, record: &BehaviorRecord) -> AppResult<()>;

    async fn remove(&self, visitor: &str) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Size limits applied to a behavior record
#[derive(Debug, Clone, Copy)]
pub struct HistoryLimits {
    /// Cap for search history and viewed items
    pub max_entries: usize,
    /// History length kept by the cleanup after each tracked search
    pub keep_after_search: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_entries: 50,
            keep_after_search: 15,
        }
    }
}

type VisitorLocks = DashMap<String, Arc<Mutex<()>>>;

/// Exclusive access to one visitor's record
///
/// Dropping the last guard for a visitor removes its lock entry.
struct VisitorGuard {
    locks: Arc<VisitorLocks>,
    visitor: String,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for VisitorGuard {
    fn drop(&mut self) {
        // One reference in the map, one held by `_guard`; more means waiters
        self.locks
            .remove_if(&self.visitor, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

#[derive(Clone)]
pub struct BehaviorTracker {
    store: Arc<dyn BehaviorStore>,
    limits: HistoryLimits,
    locks: Arc<VisitorLocks>,
}

impl BehaviorTracker {
    pub fn new(store: Arc<dyn BehaviorStore>, limits: HistoryLimits) -> Self {
        Self {
            store,
            limits,
            locks: Arc::new(DashMap::new()),
        }
    }

    async fn lock_visitor(&self, visitor: &str) -> VisitorGuard {
        let lock = Arc::clone(self.locks.entry(visitor.to_string()).or_default().value());
        VisitorGuard {
            locks: Arc::clone(&self.locks),
            visitor: visitor.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    pub async fn has_consent(&self, visitor: &str) -> bool {
        self.load_consented(visitor).await.is_some()
    }

    /// Granting consent creates an empty record; revoking it purges everything
    pub async fn set_consent(&self, visitor: &str, consent: bool) {
        let _guard = self.lock_visitor(visitor).await;

        if !consent {
            self.purge(visitor).await;
            return;
        }

        if self.load_consented(visitor).await.is_some() {
            return;
        }

        if let Err(e) = self
            .store
            .save(visitor, &BehaviorRecord::with_consent())
            .await
        {
            tracing::warn!(
                visitor = %visitor,
                store = self.store.name(),
                error = %e,
                "Failed to persist consent"
            );
        } else {
            tracing::info!(visitor = %visitor, "Tracking consent granted");
        }
    }

    /// Remembers a search query at the front of the history
    pub async fn track_search(&self, visitor: &str, query: &str) {
        let max_entries = self.limits.max_entries;
        self.update(visitor, "track_search", |record| {
            record.push_search(query, max_entries)
        })
        .await;
    }

    /// Records an opened item and bumps its view counter
    pub async fn track_view(&self, visitor: &str, id: &str, title: &str, genre: Option<&str>) {
        let max_entries = self.limits.max_entries;
        let viewed = ViewedItem {
            id: id.to_string(),
            title: title.to_string(),
            genre: genre
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string),
            timestamp: Utc::now(),
        };

        self.update(visitor, "track_view", |record| {
            record.push_view(viewed, max_entries);
            true
        })
        .await;
    }

    pub async fn track_genre(&self, visitor: &str, genre: Option<&str>) {
        let Some(genre) = genre else {
            return;
        };
        self.update(visitor, "track_genre", |record| record.count_genre(genre))
            .await;
    }

    /// Keeps only the `keep` most recent searches
    pub async fn clean_history(&self, visitor: &str, keep: usize) {
        self.update(visitor, "clean_history", |record| {
            let before = record.search_history.len();
            record.truncate_history(keep);
            record.search_history.len() != before
        })
        .await;
    }

    /// Drops the whole record, consent included
    pub async fn clear(&self, visitor: &str) {
        let _guard = self.lock_visitor(visitor).await;
        self.purge(visitor).await;
    }

    async fn purge(&self, visitor: &str) {
        match self.store.remove(visitor).await {
            Ok(()) => tracing::info!(visitor = %visitor, "Behavior data cleared"),
            Err(e) => tracing::warn!(
                visitor = %visitor,
                store = self.store.name(),
                error = %e,
                "Failed to clear behavior data"
            ),
        }
    }

    /// The visitor's record, or an empty non-consented one
    pub async fn snapshot(&self, visitor: &str) -> BehaviorRecord {
        self.load_consented(visitor).await.unwrap_or_default()
    }

    async fn load_consented(&self, visitor: &str) -> Option<BehaviorRecord> {
        match self.store.load(visitor).await {
            Ok(record) => record.filter(|r| r.consent),
            Err(e) => {
                tracing::warn!(
                    visitor = %visitor,
                    store = self.store.name(),
                    error = %e,
                    "Failed to load behavior record"
                );
                None
            }
        }
    }

    /// Read-modify-write of a consented record; `apply` returns whether it changed anything
    async fn update<F>(&self, visitor: &str, operation: &'static str, apply: F)
    where
        F: FnOnce(&mut BehaviorRecord) -> bool,
    {
        let _guard = self.lock_visitor(visitor).await;

        let Some(mut record) = self.load_consented(visitor).await else {
            tracing::debug!(visitor = %visitor, operation, "No tracking consent, skipping");
            return;
        };

        if !apply(&mut record) {
            return;
        }

        if let Err(e) = self.store.save(visitor, &record).await {
            tracing::warn!(
                visitor = %visitor,
                operation,
                store = self.store.name(),
                error = %e,
                "Failed to persist behavior record"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryBehaviorStore;
    use crate::error::AppError;

    fn tracker() -> BehaviorTracker {
        BehaviorTracker::new(
            Arc::new(InMemoryBehaviorStore::new()),
            HistoryLimits::default(),
        )
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl BehaviorStore for BrokenStore {
        async fn load(&self, _visitor: &str) -> AppResult<Option<BehaviorRecord>> {
            Err(AppError::Internal("storage offline".to_string()))
        }

        async fn save(&self, _visitor: &str, _record: &BehaviorRecord) -> AppResult<()> {
            Err(AppError::Internal("storage offline".to_string()))
        }

        async fn remove(&self, _visitor: &str) -> AppResult<()> {
            Err(AppError::Internal("storage offline".to_string()))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_consent_defaults_to_false() {
        let tracker = tracker();
        assert!(!tracker.has_consent("v1").await);
    }

    #[tokio::test]
    async fn test_trackers_are_noops_without_consent() {
        let tracker = tracker();
        tracker.track_search("v1", "elden ring").await;
        tracker.track_view("v1", "570", "Dota 2", Some("Strategy")).await;
        tracker.track_genre("v1", Some("Strategy")).await;

        let record = tracker.snapshot("v1").await;
        assert!(!record.consent);
        assert!(record.search_history.is_empty());
        assert!(record.viewed_items.is_empty());
        assert!(record.genre_counts.is_empty());
    }

    #[tokio::test]
    async fn test_track_search_normalizes_and_promotes() {
        let tracker = tracker();
        tracker.set_consent("v1", true).await;

        tracker.track_search("v1", "  Elden Ring ").await;
        tracker.track_search("v1", "doom").await;
        tracker.track_search("v1", "ELDEN RING").await;
        tracker.track_search("v1", "x").await;

        let record = tracker.snapshot("v1").await;
        assert_eq!(record.search_history, vec!["elden ring", "doom"]);
    }

    #[tokio::test]
    async fn test_search_history_never_exceeds_cap() {
        let tracker = BehaviorTracker::new(
            Arc::new(InMemoryBehaviorStore::new()),
            HistoryLimits {
                max_entries: 5,
                keep_after_search: 3,
            },
        );
        tracker.set_consent("v1", true).await;

        for i in 0..12 {
            tracker.track_search("v1", &format!("game {}", i)).await;
            let record = tracker.snapshot("v1").await;
            assert!(record.search_history.len() <= 5);
            assert!(record
                .search_history
                .iter()
                .all(|q| q.trim().chars().count() >= 2));
        }
    }

    #[tokio::test]
    async fn test_clean_history_keeps_most_recent() {
        let tracker = tracker();
        tracker.set_consent("v1", true).await;
        for q in ["one", "two", "three", "four"] {
            tracker.track_search("v1", q).await;
        }

        tracker.clean_history("v1", 2).await;

        let record = tracker.snapshot("v1").await;
        assert_eq!(record.search_history, vec!["four", "three"]);
    }

    #[tokio::test]
    async fn test_track_view_and_genre() {
        let tracker = tracker();
        tracker.set_consent("v1", true).await;

        tracker.track_view("v1", "570", "Dota 2", Some("Strategy")).await;
        tracker.track_genre("v1", Some("Strategy")).await;
        tracker.track_genre("v1", Some("")).await;
        tracker.track_genre("v1", None).await;

        let record = tracker.snapshot("v1").await;
        assert_eq!(record.viewed_items.len(), 1);
        assert_eq!(record.viewed_items[0].genre.as_deref(), Some("Strategy"));
        assert_eq!(record.view_counts.get("570"), Some(&1));
        assert_eq!(record.genre_counts.get("strategy"), Some(&1));
        assert_eq!(record.genre_counts.len(), 1);
    }

    #[tokio::test]
    async fn test_revoking_consent_purges_data() {
        let tracker = tracker();
        tracker.set_consent("v1", true).await;
        tracker.track_search("v1", "portal").await;

        tracker.set_consent("v1", false).await;

        assert!(!tracker.has_consent("v1").await);
        tracker.set_consent("v1", true).await;
        assert!(tracker.snapshot("v1").await.search_history.is_empty());
    }

    #[tokio::test]
    async fn test_granting_consent_twice_keeps_data() {
        let tracker = tracker();
        tracker.set_consent("v1", true).await;
        tracker.track_search("v1", "portal").await;
        tracker.set_consent("v1", true).await;

        assert_eq!(tracker.snapshot("v1").await.search_history, vec!["portal"]);
    }

    #[tokio::test]
    async fn test_storage_errors_degrade_to_noops() {
        let tracker = BehaviorTracker::new(Arc::new(BrokenStore), HistoryLimits::default());

        tracker.set_consent("v1", true).await;
        tracker.track_search("v1", "portal").await;
        tracker.clear("v1").await;

        assert!(!tracker.has_consent("v1").await);
        assert_eq!(tracker.snapshot("v1").await, BehaviorRecord::default());
    }

    /// Yields between the storage round-trips, like a networked store
    struct SlowStore {
        inner: InMemoryBehaviorStore,
    }

    #[async_trait::async_trait]
    impl BehaviorStore for SlowStore {
        async fn load(&self, visitor: &str) -> AppResult<Option<BehaviorRecord>> {
            let record = self.inner.load(visitor).await;
            tokio::task::yield_now().await;
            record
        }

        async fn save(&self, visitor: &str, record: &BehaviorRecord) -> AppResult<()> {
            tokio::task::yield_now().await;
            self.inner.save(visitor, record).await
        }

        async fn remove(&self, visitor: &str) -> AppResult<()> {
            tokio::task::yield_now().await;
            self.inner.remove(visitor).await
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    fn slow_tracker() -> BehaviorTracker {
        BehaviorTracker::new(
            Arc::new(SlowStore {
                inner: InMemoryBehaviorStore::new(),
            }),
            HistoryLimits::default(),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let tracker = slow_tracker();
        tracker.set_consent("v1", true).await;

        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.track_genre("v1", Some("rpg")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let record = tracker.snapshot("v1").await;
        assert_eq!(record.genre_counts.get("rpg"), Some(&200));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_revocation_is_not_undone_by_inflight_tracking() {
        let tracker = slow_tracker();

        for i in 0..200 {
            let visitor = format!("v{}", i);
            tracker.set_consent(&visitor, true).await;

            let inflight = {
                let tracker = tracker.clone();
                let visitor = visitor.clone();
                tokio::spawn(async move { tracker.track_search(&visitor, "elden ring").await })
            };
            tracker.set_consent(&visitor, false).await;
            inflight.await.unwrap();

            assert!(!tracker.has_consent(&visitor).await, "{} regained consent", visitor);
            assert!(tracker.snapshot(&visitor).await.search_history.is_empty());
        }
    }

    #[tokio::test]
    async fn test_visitor_locks_are_released() {
        let tracker = tracker();
        tracker.set_consent("v1", true).await;
        tracker.track_search("v1", "portal").await;
        tracker.clear("v1").await;

        assert!(tracker.locks.is_empty());
    }

    #[tokio::test]
    async fn test_visitors_are_isolated() {
        let tracker = tracker();
        tracker.set_consent("v1", true).await;
        tracker.set_consent("v2", true).await;
        tracker.track_search("v1", "portal").await;

        assert!(tracker.snapshot("v2").await.search_history.is_empty());
    }
}
