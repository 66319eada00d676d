/// OMDb movie provider
///
/// API Flow:
/// 1. Search: `/?s={term}&type=movie` returns short hits (id, title, year, poster)
/// 2. Detail: `/?i={imdb_id}` or `/?t={title}` returns genres, rating and plot
///
/// OMDb answers HTTP 200 with `"Response": "False"` for misses, so "not found"
/// errors are mapped to empty results rather than failures.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{parse_year, split_genres, Item, ItemKind},
    services::providers::{fetch_details, ContentProvider},
};
use reqwest::Client as HttpClient;
use serde::Deserialize;

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const DETAIL_CACHE_TTL: u64 = 86400; // 1 day

/// Titles shown on the landing page
const POPULAR_TITLES: [&str; 12] = [
    "The Dark Knight",
    "Inception",
    "Pulp Fiction",
    "The Godfather",
    "Forrest Gump",
    "The Matrix",
    "Goodfellas",
    "The Lord of the Rings: The Fellowship of the Ring",
    "Fight Club",
    "The Shawshank Redemption",
    "Interstellar",
    "The Avengers",
];

const TERM_VARIANTS: [&str; 2] = ["movie", "film"];

/// Placeholder OMDb uses for missing fields
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Deserialize)]
struct OmdbSearchResponse {
    #[serde(rename = "Search", default)]
    search: Vec<OmdbSearchHit>,
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error", default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OmdbSearchHit {
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year", default)]
    year: Option<String>,
    #[serde(rename = "Poster", default)]
    poster: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OmdbMovie {
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Year", default)]
    year: Option<String>,
    #[serde(rename = "Genre", default)]
    genre: Option<String>,
    #[serde(rename = "imdbRating", default)]
    imdb_rating: Option<String>,
    #[serde(rename = "Poster", default)]
    poster: Option<String>,
    #[serde(rename = "Plot", default)]
    plot: Option<String>,
}

/// OMDb wraps every payload with the same status envelope
#[derive(Debug, Deserialize)]
struct OmdbEnvelope {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error", default)]
    error: Option<String>,
}

fn available(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && v != NOT_AVAILABLE)
}

fn is_not_found(error: Option<&str>) -> bool {
    error.is_some_and(|e| e.to_lowercase().contains("not found"))
}

/// IMDb ids look like `tt` followed by digits
fn is_imdb_id(value: &str) -> bool {
    value.len() > 2
        && value.starts_with("tt")
        && value[2..].chars().all(|c| c.is_ascii_digit())
}

impl From<OmdbSearchHit> for Item {
    fn from(hit: OmdbSearchHit) -> Self {
        let mut item = Item::new(hit.imdb_id, ItemKind::Movie, hit.title);
        item.year = hit.year.as_deref().and_then(parse_year);
        item.poster = available(hit.poster);
        item
    }
}

impl From<OmdbMovie> for Item {
    fn from(movie: OmdbMovie) -> Self {
        let genres = available(movie.genre)
            .map(|g| split_genres(&g))
            .unwrap_or_default();

        let mut item = Item::new(movie.imdb_id, ItemKind::Movie, movie.title).with_genres(genres);
        item.year = movie.year.as_deref().and_then(parse_year);
        item.rating = available(movie.imdb_rating)
            .and_then(|r| r.parse::<f32>().ok())
            .unwrap_or(0.0);
        item.poster = available(movie.poster);
        item.description = available(movie.plot);
        item
    }
}

fn parse_search_response(body: &str) -> AppResult<Vec<Item>> {
    let response: OmdbSearchResponse = serde_json::from_str(body)
        .map_err(|e| AppError::ExternalApi(format!("Failed to parse OMDb response: {}", e)))?;

    if response.response.eq_ignore_ascii_case("false") {
        if is_not_found(response.error.as_deref()) {
            return Ok(Vec::new());
        }
        return Err(AppError::ExternalApi(format!(
            "OMDb search failed: {}",
            response.error.unwrap_or_default()
        )));
    }

    Ok(response.search.into_iter().map(Item::from).collect())
}

fn parse_detail_response(body: &str) -> AppResult<Option<Item>> {
    let envelope: OmdbEnvelope = serde_json::from_str(body)
        .map_err(|e| AppError::ExternalApi(format!("Failed to parse OMDb response: {}", e)))?;

    if envelope.response.eq_ignore_ascii_case("false") {
        if is_not_found(envelope.error.as_deref()) {
            return Ok(None);
        }
        return Err(AppError::ExternalApi(format!(
            "OMDb detail failed: {}",
            envelope.error.unwrap_or_default()
        )));
    }

    let movie: OmdbMovie = serde_json::from_str(body)
        .map_err(|e| AppError::ExternalApi(format!("Failed to parse OMDb movie: {}", e)))?;
    Ok(Some(movie.into()))
}

#[derive(Clone)]
pub struct OmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Option<Cache>,
}

impl OmdbProvider {
    pub fn new(api_key: String, api_url: String, cache: Option<Cache>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    async fn get(&self, params: &[(&str, &str)]) -> AppResult<String> {
        let url = format!("{}/", self.api_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "OMDb API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.text().await?)
    }
}

#[async_trait::async_trait]
impl ContentProvider for OmdbProvider {
    async fn search(&self, term: &str) -> AppResult<Vec<Item>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(AppError::Validation(
                "Search term cannot be empty".to_string(),
            ));
        }

        cached!(
            &self.cache,
            CacheKey::Search(self.name(), term.to_string()),
            SEARCH_CACHE_TTL,
            async move {
                let body = self.get(&[("s", term), ("type", "movie")]).await?;
                let items = parse_search_response(&body)?;

                tracing::info!(
                    term = %term,
                    results = items.len(),
                    provider = "omdb",
                    "Search completed"
                );

                Ok::<_, AppError>(items)
            }
        )
    }

    async fn detail(&self, id_or_term: &str) -> AppResult<Option<Item>> {
        let key = id_or_term.trim();
        if key.is_empty() {
            return Ok(None);
        }

        cached!(
            &self.cache,
            CacheKey::Detail(self.name(), key.to_string()),
            DETAIL_CACHE_TTL,
            async move {
                let lookup = if is_imdb_id(key) { "i" } else { "t" };
                let body = self.get(&[(lookup, key), ("plot", "short")]).await?;
                let item = parse_detail_response(&body)?;

                tracing::debug!(
                    key = %key,
                    found = item.is_some(),
                    provider = "omdb",
                    "Detail fetched"
                );

                Ok::<_, AppError>(item)
            }
        )
    }

    async fn popular(&self) -> AppResult<Vec<Item>> {
        let titles = POPULAR_TITLES.iter().map(|t| t.to_string()).collect();
        let items: Vec<Item> = fetch_details(self, titles)
            .await
            .into_iter()
            .filter(Item::has_poster)
            .collect();

        if items.is_empty() {
            return Err(AppError::ExternalApi(
                "No popular movies could be fetched from OMDb".to_string(),
            ));
        }

        Ok(items)
    }

    fn term_variants(&self) -> Vec<String> {
        TERM_VARIANTS.iter().map(|v| v.to_string()).collect()
    }

    fn clone_for_task(&self) -> Box<dyn ContentProvider> {
        Box::new(self.clone())
    }

    fn name(&self) -> &'static str {
        "omdb"
    }
}
