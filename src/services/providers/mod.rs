//! Content lookup abstraction
//!
//! Providers turn a free-text term or an identifier into normalized `Item`
//! records. The recommendation engine only ever talks to this trait, so
//! movie (OMDb) and game (Steam) catalogs are interchangeable.

use crate::{error::AppResult, models::Item};

pub mod omdb;
pub mod steam;

pub use omdb::OmdbProvider;
pub use steam::SteamProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContentProvider: Send + Sync {
    /// Searches items by free text
    ///
    /// Returns an empty list when nothing matches and an error only on
    /// transport or parse failures.
    async fn search(&self, term: &str) -> AppResult<Vec<Item>>;

    /// Looks up one item by provider id, or by title when the input is not an id
    async fn detail(&self, id_or_term: &str) -> AppResult<Option<Item>>;

    /// Curated landing-page items
    async fn popular(&self) -> AppResult<Vec<Item>>;

    /// Words appended to a search term when a similar-items search comes up short
    fn term_variants(&self) -> Vec<String>;

    /// Clone provider for parallel task execution
    fn clone_for_task(&self) -> Box<dyn ContentProvider>;

    /// Provider name for logging and cache keys
    fn name(&self) -> &'static str;
}

/// Fetches details for many ids in parallel
///
/// Failed or missing lookups are logged and dropped; the order of `ids` is
/// preserved for the ones that succeed.
pub async fn fetch_details(provider: &dyn ContentProvider, ids: Vec<String>) -> Vec<Item> {
    let mut tasks = Vec::with_capacity(ids.len());

    for id in ids {
        let provider = provider.clone_for_task();
        let task = tokio::spawn(async move { provider.detail(&id).await });
        tasks.push(task);
    }

    let mut results = Vec::new();
    let mut error_count = 0usize;

    for task in tasks {
        match task.await {
            Ok(Ok(Some(item))) => results.push(item),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, provider = provider.name(), "Detail lookup failed");
                error_count += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, "Task join error");
                error_count += 1;
            }
        }
    }

    if error_count > 0 {
        tracing::warn!(
            success_count = results.len(),
            error_count,
            provider = provider.name(),
            "Partial detail fetch failure"
        );
    }

    results
}
