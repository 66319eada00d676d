use serde::Deserialize;

use crate::services::recommendations::RecommendationLimits;

/// Which Content Lookup backend serves item searches
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentProviderKind {
    Steam,
    Omdb,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL for favorites and comments.
    /// Favorites are kept in memory when unset.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL for behavior records and lookup caching.
    /// Behavior records are kept in memory when unset.
    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_content_provider")]
    pub content_provider: ContentProviderKind,

    /// OMDb API key, required when `content_provider = omdb`
    #[serde(default)]
    pub omdb_api_key: Option<String>,

    #[serde(default = "default_omdb_api_url")]
    pub omdb_api_url: String,

    #[serde(default = "default_steam_store_url")]
    pub steam_store_url: String,

    /// Store language passed to Steam (`l=` parameter)
    #[serde(default = "default_steam_language")]
    pub steam_language: String,

    /// Store country passed to Steam (`cc=` parameter)
    #[serde(default = "default_steam_country")]
    pub steam_country: String,

    /// Hard cap for search history and viewed items
    #[serde(default = "default_history_max_entries")]
    pub history_max_entries: usize,

    /// Search history length kept by the cleanup after every tracked search
    #[serde(default = "default_history_keep_after_search")]
    pub history_keep_after_search: usize,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(skip)]
    pub recommendations: RecommendationLimits,
}

fn default_content_provider() -> ContentProviderKind {
    ContentProviderKind::Steam
}

fn default_omdb_api_url() -> String {
    "https://www.omdbapi.com".to_string()
}

fn default_steam_store_url() -> String {
    "https://store.steampowered.com/api".to_string()
}

fn default_steam_language() -> String {
    "hungarian".to_string()
}

fn default_steam_country() -> String {
    "HU".to_string()
}

fn default_history_max_entries() -> usize {
    50
}

fn default_history_keep_after_search() -> usize {
    15
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.recommendations = envy::prefixed("RECS_")
            .from_env::<RecommendationLimits>()
            .map_err(|e| anyhow::anyhow!("Failed to load recommendation limits: {}", e))?;

        if config.content_provider == ContentProviderKind::Omdb && config.omdb_api_key.is_none()
        {
            anyhow::bail!("OMDB_API_KEY must be set when CONTENT_PROVIDER=omdb");
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_env() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.content_provider, ContentProviderKind::Steam);
        assert_eq!(config.history_max_entries, 50);
        assert_eq!(config.history_keep_after_search, 15);
        assert!(config.database_url.is_none());
        assert_eq!(config.bind_address(), "127.0.0.1:3001");
    }

    #[test]
    fn test_provider_kind_parsing() {
        let config: Config = envy::from_iter(vec![
            ("CONTENT_PROVIDER".to_string(), "omdb".to_string()),
            ("OMDB_API_KEY".to_string(), "abc".to_string()),
        ])
        .unwrap();
        assert_eq!(config.content_provider, ContentProviderKind::Omdb);
        assert_eq!(config.omdb_api_key.as_deref(), Some("abc"));
    }
}
