//! Search-box suggestions derived from a behavior record.

use serde::Serialize;

use crate::{
    models::{BehaviorRecord, ViewedItem},
    services::recommendations::genre_terms,
};

const HISTORY_SUGGESTIONS: usize = 3;
const GENRE_SUGGESTIONS: usize = 2;
const SMART_ENTRIES: usize = 3;
const SMART_GENRES: usize = 2;

/// Typed hint shown under an empty search box
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SmartSuggestion {
    /// Most recent searches
    Search { searches: Vec<String> },
    /// Favourite genres, highest tally first
    Genre { genres: Vec<String> },
    /// Recently opened items
    Similar { items: Vec<ViewedItem> },
}

/// History entries containing `query` (up to 3), then genre names containing it (up to 2)
pub fn suggestions(record: &BehaviorRecord, query: &str) -> Vec<String> {
    if !record.consent {
        return Vec::new();
    }

    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let history = record
        .search_history
        .iter()
        .filter(|entry| entry.to_lowercase().contains(&needle))
        .take(HISTORY_SUGGESTIONS);

    let genres = record
        .genre_counts
        .keys()
        .filter(|genre| genre.contains(&needle))
        .take(GENRE_SUGGESTIONS);

    history.chain(genres).cloned().collect()
}

/// At most one hint of each kind, skipping kinds with no data
pub fn smart_suggestions(record: &BehaviorRecord) -> Vec<SmartSuggestion> {
    if !record.consent {
        return Vec::new();
    }

    let mut hints = Vec::new();

    if !record.search_history.is_empty() {
        hints.push(SmartSuggestion::Search {
            searches: record
                .search_history
                .iter()
                .take(SMART_ENTRIES)
                .cloned()
                .collect(),
        });
    }

    let genres = genre_terms(record, SMART_GENRES);
    if !genres.is_empty() {
        hints.push(SmartSuggestion::Genre { genres });
    }

    if !record.viewed_items.is_empty() {
        hints.push(SmartSuggestion::Similar {
            items: record
                .viewed_items
                .iter()
                .take(SMART_ENTRIES)
                .cloned()
                .collect(),
        });
    }

    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record() -> BehaviorRecord {
        let mut record = BehaviorRecord::with_consent();
        record.search_history = ["dark souls", "darkest dungeon", "portal", "dark and darker", "dota"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for (genre, count) in [("action", 4), ("adventure", 1), ("indie", 7)] {
            record.genre_counts.insert(genre.to_string(), count);
        }
        record
    }

    #[test]
    fn test_suggestions_history_then_genres() {
        let got = suggestions(&record(), "DARK");
        assert_eq!(got, vec!["dark souls", "darkest dungeon", "dark and darker"]);

        let got = suggestions(&record(), "a");
        assert_eq!(
            got,
            vec!["dark souls", "darkest dungeon", "portal", "action", "adventure"]
        );
    }

    #[test]
    fn test_suggestions_require_consent_and_query() {
        let mut no_consent = record();
        no_consent.consent = false;
        assert!(suggestions(&no_consent, "dark").is_empty());
        assert!(suggestions(&record(), "  ").is_empty());
    }

    #[test]
    fn test_smart_suggestions() {
        let mut record = record();
        record.viewed_items.push(ViewedItem {
            id: "570".to_string(),
            title: "Dota 2".to_string(),
            genre: Some("Strategy".to_string()),
            timestamp: Utc::now(),
        });

        let hints = smart_suggestions(&record);

        assert_eq!(hints.len(), 3);
        assert_eq!(
            hints[0],
            SmartSuggestion::Search {
                searches: vec![
                    "dark souls".to_string(),
                    "darkest dungeon".to_string(),
                    "portal".to_string()
                ]
            }
        );
        assert_eq!(
            hints[1],
            SmartSuggestion::Genre {
                genres: vec!["indie".to_string(), "action".to_string()]
            }
        );
        assert!(matches!(&hints[2], SmartSuggestion::Similar { items } if items.len() == 1));
    }

    #[test]
    fn test_smart_suggestions_skip_empty_kinds() {
        let mut record = BehaviorRecord::with_consent();
        record.search_history.push("portal".to_string());

        let hints = smart_suggestions(&record);
        assert_eq!(hints.len(), 1);

        let json = serde_json::to_value(&hints[0]).unwrap();
        assert_eq!(json["type"], "search");
    }
}
