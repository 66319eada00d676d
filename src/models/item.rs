use serde::{Deserialize, Serialize};

/// What kind of catalog a normalized item came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Movie,
    Game,
}

/// Normalized item record returned by every content provider.
///
/// Search results and detail lookups share this shape; detail lookups fill
/// in `description` and usually the full `genres` list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub kind: ItemKind,
    pub title: String,
    pub year: Option<i32>,
    /// Primary genre, the first entry of `genres`
    pub genre: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Rating on a 0-10 scale, 0 when unknown
    pub rating: f32,
    pub poster: Option<String>,
    pub price: Option<String>,
    #[serde(default)]
    pub is_free: bool,
    pub description: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<String>, kind: ItemKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            year: None,
            genre: None,
            genres: Vec::new(),
            rating: 0.0,
            poster: None,
            price: None,
            is_free: false,
            description: None,
        }
    }

    /// Sets `genres` and derives the primary `genre` from it
    pub fn with_genres(mut self, genres: Vec<String>) -> Self {
        self.genre = genres.first().cloned();
        self.genres = genres;
        self
    }

    pub fn with_poster(mut self, poster: impl Into<String>) -> Self {
        self.poster = Some(poster.into());
        self
    }

    /// Only items with a display image are surfaced as recommendations
    pub fn has_poster(&self) -> bool {
        self.poster.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

/// Extracts the leading four-digit year from strings like "2010", "2010–2015"
/// or "12 Mar, 2019".
pub fn parse_year(raw: &str) -> Option<i32> {
    let bytes = raw.as_bytes();
    bytes
        .windows(4)
        .position(|w| w.iter().all(u8::is_ascii_digit))
        .and_then(|start| raw[start..start + 4].parse().ok())
}

/// Splits a comma separated genre string ("Action, Drama") into trimmed names
pub fn split_genres(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty() && !g.eq_ignore_ascii_case("n/a"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year_variants() {
        assert_eq!(parse_year("2010"), Some(2010));
        assert_eq!(parse_year("2010–2015"), Some(2010));
        assert_eq!(parse_year("12 Mar, 2019"), Some(2019));
        assert_eq!(parse_year("Coming soon"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn test_split_genres() {
        assert_eq!(
            split_genres("Action, Adventure ,Sci-Fi"),
            vec!["Action", "Adventure", "Sci-Fi"]
        );
        assert!(split_genres("N/A").is_empty());
    }

    #[test]
    fn test_with_genres_sets_primary() {
        let item = Item::new("1", ItemKind::Game, "Portal")
            .with_genres(vec!["Puzzle".to_string(), "Action".to_string()]);
        assert_eq!(item.genre.as_deref(), Some("Puzzle"));
        assert_eq!(item.genres.len(), 2);
    }

    #[test]
    fn test_has_poster() {
        let item = Item::new("1", ItemKind::Movie, "Heat");
        assert!(!item.has_poster());
        assert!(item.clone().with_poster("https://img/1.jpg").has_poster());
        assert!(!item.with_poster("  ").has_poster());
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let item = Item::new("570", ItemKind::Game, "Dota 2");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["isFree"], false);
        assert_eq!(json["kind"], "game");
    }
}
