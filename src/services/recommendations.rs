use std::{
    collections::{HashMap, HashSet},
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde::Deserialize;
use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{BehaviorRecord, Item},
    services::providers::ContentProvider,
};

/// Genre labels that carry no signal
const UNKNOWN_GENRE: &str = "unknown";

/// Caps and per-term counts for every strategy
///
/// Loaded from `RECS_*` environment variables; every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecommendationLimits {
    /// Most frequent history entries resolved by the history strategy
    pub history_terms: usize,
    pub history_cap: usize,
    /// Top genres searched by the genre strategy
    pub genre_terms: usize,
    pub per_genre: usize,
    pub genre_cap: usize,
    /// Viewed items inspected by the recently-viewed strategy
    pub recent_window: usize,
    pub recent_genres: usize,
    pub per_recent_genre: usize,
    pub recent_cap: usize,
    /// Search hits whose genres seed a similar-items search
    pub similar_seed: usize,
    pub similar_cap: usize,
    /// Below this many candidates, term variants are tried
    pub similar_min: usize,
    pub merged_cap: usize,
}

impl Default for RecommendationLimits {
    fn default() -> Self {
        Self {
            history_terms: 5,
            history_cap: 12,
            genre_terms: 3,
            per_genre: 2,
            genre_cap: 10,
            recent_window: 5,
            recent_genres: 2,
            per_recent_genre: 3,
            recent_cap: 8,
            similar_seed: 3,
            similar_cap: 8,
            similar_min: 4,
            merged_cap: 15,
        }
    }
}

/// Keeps the first occurrence of every id, preserving order
pub fn dedup_by_id(items: impl IntoIterator<Item = Item>) -> Vec<Item> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

/// The `n` most frequent values, highest count first; ties keep first-seen order
fn top_by_count<'a>(values: impl IntoIterator<Item = &'a str>, n: usize) -> Vec<String> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut tally: Vec<(&str, u32)> = Vec::new();

    for value in values {
        match index.get(value) {
            Some(&i) => tally[i].1 += 1,
            None => {
                index.insert(value, tally.len());
                tally.push((value, 1));
            }
        }
    }

    ranked(tally, n)
}

/// Stable sort by descending count, so equal counts keep their input order
fn ranked(mut tally: Vec<(&str, u32)>, n: usize) -> Vec<String> {
    tally.sort_by(|a, b| b.1.cmp(&a.1));
    tally
        .into_iter()
        .take(n)
        .map(|(value, _)| value.to_string())
        .collect()
}

/// History entries to resolve, most searched first
pub fn history_terms(record: &BehaviorRecord, n: usize) -> Vec<String> {
    top_by_count(record.search_history.iter().map(String::as_str), n)
}

/// Top genres by tally; equal counts fall back to alphabetical order
pub fn genre_terms(record: &BehaviorRecord, n: usize) -> Vec<String> {
    let tally = record
        .genre_counts
        .iter()
        .map(|(genre, count)| (genre.as_str(), *count))
        .collect();
    ranked(tally, n)
}

/// Most common genres among the `window` most recently viewed items
pub fn recent_genre_terms(record: &BehaviorRecord, window: usize, n: usize) -> Vec<String> {
    let genres: Vec<String> = record
        .viewed_items
        .iter()
        .take(window)
        .filter_map(|viewed| viewed.genre.as_deref())
        .map(|genre| genre.trim().to_lowercase())
        .filter(|genre| !genre.is_empty() && genre != UNKNOWN_GENRE)
        .collect();

    top_by_count(genres.iter().map(String::as_str), n)
}

/// Poster-bearing items of every group, at most `per_group` from each
fn take_per_group(groups: Vec<Vec<Item>>, per_group: usize) -> Vec<Item> {
    groups
        .into_iter()
        .flat_map(|items| {
            items
                .into_iter()
                .filter(Item::has_poster)
                .take(per_group)
        })
        .collect()
}

/// Derives ranked candidate lists from a behavior record
///
/// Every public method resolves to a (possibly empty) list: lookup failures
/// are logged and dropped per term, and nothing is looked up without consent.
#[derive(Clone)]
pub struct RecommendationEngine {
    provider: Arc<dyn ContentProvider>,
    limits: RecommendationLimits,
}

impl RecommendationEngine {
    pub fn new(provider: Arc<dyn ContentProvider>, limits: RecommendationLimits) -> Self {
        Self { provider, limits }
    }

    pub fn limits(&self) -> &RecommendationLimits {
        &self.limits
    }

    /// Resolves the most searched history entries to their best match
    pub async fn from_search_history(&self, record: &BehaviorRecord) -> Vec<Item> {
        if !record.consent {
            return Vec::new();
        }

        let terms = history_terms(record, self.limits.history_terms);
        if terms.is_empty() {
            return Vec::new();
        }

        let resolved = self
            .settle_all("history", terms, |provider, term| async move {
                let hits = provider.search(&term).await?;
                match hits.into_iter().next() {
                    Some(hit) => provider.detail(&hit.id).await,
                    None => Ok(None),
                }
            })
            .await;

        let items: Vec<Item> = dedup_by_id(resolved.into_iter().flatten().filter(Item::has_poster))
            .into_iter()
            .take(self.limits.history_cap)
            .collect();

        self.log_strategy("history", &items);
        items
    }

    /// Searches the visitor's favourite genres
    pub async fn from_genres(&self, record: &BehaviorRecord) -> Vec<Item> {
        if !record.consent {
            return Vec::new();
        }

        let terms = genre_terms(record, self.limits.genre_terms);
        let items = self
            .search_groups("genre", terms, self.limits.per_genre, self.limits.genre_cap)
            .await;

        self.log_strategy("genre", &items);
        items
    }

    /// Searches the dominant genres of recently opened items
    pub async fn from_recently_viewed(&self, record: &BehaviorRecord) -> Vec<Item> {
        if !record.consent {
            return Vec::new();
        }

        let terms = recent_genre_terms(
            record,
            self.limits.recent_window,
            self.limits.recent_genres,
        );
        let items = self
            .search_groups(
                "recent",
                terms,
                self.limits.per_recent_genre,
                self.limits.recent_cap,
            )
            .await;

        self.log_strategy("recent", &items);
        items
    }

    /// Items sharing genres with the hits for `term`
    ///
    /// When the plain term yields fewer than `similar_min` candidates, the
    /// provider's term variants are tried in order and the first one reaching
    /// the minimum wins.
    pub async fn similar_to_search(&self, record: &BehaviorRecord, term: &str) -> Vec<Item> {
        let term = term.trim();
        if !record.consent || term.is_empty() {
            return Vec::new();
        }

        let candidates = self.similar_for(term).await;
        if candidates.len() >= self.limits.similar_min {
            self.log_strategy("similar", &candidates);
            return candidates;
        }

        for variant in self.provider.term_variants() {
            let query = format!("{} {}", term, variant);
            let candidates = self.similar_for(&query).await;

            if candidates.len() >= self.limits.similar_min {
                tracing::debug!(term = %term, variant = %variant, "Similar search used term variant");
                self.log_strategy("similar", &candidates);
                return candidates;
            }
        }

        tracing::debug!(term = %term, "No similar items reached the minimum");
        Vec::new()
    }

    /// Idle-view recommendations: history, genre and recently viewed, merged
    pub async fn all_recommendations(&self, record: &BehaviorRecord) -> Vec<Item> {
        if !record.consent {
            return Vec::new();
        }

        let (history, genres, recent) = tokio::join!(
            self.from_search_history(record),
            self.from_genres(record),
            self.from_recently_viewed(record),
        );

        let merged: Vec<Item> = dedup_by_id(history.into_iter().chain(genres).chain(recent))
            .into_iter()
            .take(self.limits.merged_cap)
            .collect();

        tracing::info!(
            results = merged.len(),
            provider = self.provider.name(),
            "Recommendations merged"
        );

        merged
    }

    async fn similar_for(&self, term: &str) -> Vec<Item> {
        let seed = match self.provider.search(term).await {
            Ok(seed) => seed,
            Err(e) => {
                tracing::warn!(term = %term, error = %e, "Similar seed search failed");
                return Vec::new();
            }
        };
        if seed.is_empty() {
            return Vec::new();
        }

        let seed_ids: HashSet<&str> = seed.iter().map(|item| item.id.as_str()).collect();
        let top = &seed[..seed.len().min(self.limits.similar_seed)];

        // Hits from search listings may lack genres; their details carry them
        let missing: Vec<String> = top
            .iter()
            .filter(|item| item.genres.is_empty())
            .map(|item| item.id.clone())
            .collect();
        let details = self
            .settle_all("similar", missing, |provider, id| async move {
                provider.detail(&id).await
            })
            .await;

        let mut seen = HashSet::new();
        let genres: Vec<String> = top
            .iter()
            .flat_map(|item| item.genres.iter())
            .chain(details.iter().flatten().flat_map(|item| item.genres.iter()))
            .map(|genre| genre.trim().to_lowercase())
            .filter(|genre| !genre.is_empty() && seen.insert(genre.clone()))
            .collect();

        if genres.is_empty() {
            return Vec::new();
        }

        let groups = self
            .settle_all("similar", genres, |provider, genre| async move {
                provider.search(&genre).await
            })
            .await;

        let candidates = groups
            .into_iter()
            .flatten()
            .filter(|item| item.has_poster() && !seed_ids.contains(item.id.as_str()));

        dedup_by_id(candidates)
            .into_iter()
            .take(self.limits.similar_cap)
            .collect()
    }

    async fn search_groups(
        &self,
        strategy: &'static str,
        terms: Vec<String>,
        per_term: usize,
        cap: usize,
    ) -> Vec<Item> {
        if terms.is_empty() {
            return Vec::new();
        }

        let groups = self
            .settle_all(strategy, terms, |provider, term| async move {
                provider.search(&term).await
            })
            .await;

        dedup_by_id(take_per_group(groups, per_term))
            .into_iter()
            .take(cap)
            .collect()
    }

    /// Runs one lookup per term in parallel and keeps the successful results
    /// in term order
    ///
    /// Every task is awaited; a failure never cancels its siblings.
    async fn settle_all<T, F, Fut>(
        &self,
        strategy: &'static str,
        terms: Vec<String>,
        lookup: F,
    ) -> Vec<T>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn ContentProvider>, String) -> Fut,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
    {
        let mut tasks = Vec::with_capacity(terms.len());

        for term in terms {
            let label = term.clone();
            let task = tokio::spawn(lookup(Arc::clone(&self.provider), term));
            tasks.push((label, task));
        }

        let mut results = Vec::with_capacity(tasks.len());
        let mut error_count = 0usize;

        for (term, task) in tasks {
            match task.await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => {
                    tracing::warn!(strategy, term = %term, error = %e, "Lookup failed");
                    error_count += 1;
                }
                Err(e) => {
                    tracing::error!(strategy, term = %term, error = %e, "Task join error");
                    error_count += 1;
                }
            }
        }

        if error_count > 0 {
            tracing::warn!(
                strategy,
                success_count = results.len(),
                error_count,
                provider = self.provider.name(),
                "Partial lookup failure"
            );
        }

        results
    }

    fn log_strategy(&self, strategy: &'static str, items: &[Item]) {
        tracing::debug!(
            strategy,
            results = items.len(),
            provider = self.provider.name(),
            "Strategy resolved"
        );
    }
}

/// Hands out request tokens so superseded responses can be dropped
///
/// Tokens are unique across visitors, and only visitors with a request in
/// flight keep an entry.
#[derive(Default)]
pub struct RequestTracker {
    next_token: AtomicU64,
    latest: RwLock<HashMap<String, u64>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a request for `visitor`, superseding any in flight
    pub async fn begin(&self, visitor: &str) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed) + 1;
        self.latest.write().await.insert(visitor.to_string(), token);
        token
    }

    /// Whether `token` is still the visitor's most recent request
    pub async fn is_current(&self, visitor: &str, token: u64) -> bool {
        self.latest.read().await.get(visitor) == Some(&token)
    }

    /// Ends a request; returns false when a newer one superseded it
    pub async fn finish(&self, visitor: &str, token: u64) -> bool {
        let mut latest = self.latest.write().await;
        if latest.get(visitor) != Some(&token) {
            return false;
        }
        latest.remove(visitor);
        true
    }

    pub async fn in_flight(&self) -> usize {
        self.latest.read().await.len()
    }
}
