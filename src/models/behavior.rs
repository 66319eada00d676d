use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum trimmed length for a query to be remembered
pub const MIN_QUERY_LEN: usize = 2;

/// An item the visitor opened
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewedItem {
    pub id: String,
    pub title: String,
    pub genre: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Per-visitor behavior signals used for personalization
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorRecord {
    #[serde(default)]
    pub consent: bool,
    /// Normalized queries, most recent first, unique
    #[serde(default)]
    pub search_history: Vec<String>,
    /// Most recent first
    #[serde(default)]
    pub viewed_items: Vec<ViewedItem>,
    /// Lowercased genre name to occurrence count
    #[serde(default)]
    pub genre_counts: BTreeMap<String, u32>,
    /// Item id to number of opens
    #[serde(default)]
    pub view_counts: BTreeMap<String, u32>,
}

impl BehaviorRecord {
    pub fn with_consent() -> Self {
        Self {
            consent: true,
            ..Default::default()
        }
    }

    /// Trims and lowercases a query, rejecting ones shorter than `MIN_QUERY_LEN`
    pub fn normalize_query(query: &str) -> Option<String> {
        let trimmed = query.trim();
        if trimmed.chars().count() < MIN_QUERY_LEN {
            return None;
        }
        Some(trimmed.to_lowercase())
    }

    /// Moves `query` to the front of the history (inserting it when new),
    /// then truncates to `max_entries`. Returns false when the query is rejected.
    pub fn push_search(&mut self, query: &str, max_entries: usize) -> bool {
        let Some(normalized) = Self::normalize_query(query) else {
            return false;
        };

        self.search_history.retain(|existing| existing != &normalized);
        self.search_history.insert(0, normalized);
        self.search_history.truncate(max_entries);
        true
    }

    pub fn push_view(&mut self, viewed: ViewedItem, max_entries: usize) {
        *self.view_counts.entry(viewed.id.clone()).or_insert(0) += 1;
        self.viewed_items.insert(0, viewed);
        self.viewed_items.truncate(max_entries);
    }

    /// Increments the lowercased genre tally; empty names are ignored
    pub fn count_genre(&mut self, genre: &str) -> bool {
        let genre = genre.trim();
        if genre.is_empty() {
            return false;
        }
        *self.genre_counts.entry(genre.to_lowercase()).or_insert(0) += 1;
        true
    }

    pub fn truncate_history(&mut self, keep: usize) {
        self.search_history.truncate(keep);
    }
}
