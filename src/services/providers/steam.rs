/// Steam store game provider
///
/// API Flow:
/// 1. Search: `/storesearch/?term=` returns app ids and names only
/// 2. Detail: `/appdetails?appids={id}` returns genres, price, images, metacritic
///
/// The store rejects multi-id `appdetails` calls, so search hits are resolved
/// with one detail request per app, in parallel.
use std::collections::HashMap;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{parse_year, Item, ItemKind},
    services::providers::{fetch_details, ContentProvider},
};
use reqwest::Client as HttpClient;
use serde::Deserialize;

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const DETAIL_CACHE_TTL: u64 = 86400; // 1 day

/// Search hits resolved to full details
const MAX_SEARCH_DETAILS: usize = 12;

/// Counter-Strike 2, Dota 2, Cyberpunk 2077, ELDEN RING, GTA V, PUBG,
/// Apex Legends, The Witcher 3, Civilization VI, Skyrim, Destiny 2, Dead by Daylight
const POPULAR_APP_IDS: [u64; 12] = [
    730, 570, 1091500, 1245620, 271590, 578080, 1172470, 292030, 393080, 489830, 1085660, 381210,
];

#[derive(Debug, Deserialize)]
struct StoreSearchResponse {
    #[serde(default)]
    items: Vec<StoreSearchItem>,
}

#[derive(Debug, Deserialize)]
struct StoreSearchItem {
    id: u64,
    #[serde(rename = "type", default)]
    item_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppDetailsEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<SteamApp>,
}

#[derive(Debug, Deserialize)]
struct SteamApp {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    is_free: bool,
    #[serde(default)]
    short_description: Option<String>,
    #[serde(default)]
    header_image: Option<String>,
    #[serde(default)]
    genres: Vec<SteamGenre>,
    #[serde(default)]
    release_date: Option<SteamReleaseDate>,
    #[serde(default)]
    metacritic: Option<SteamMetacritic>,
    #[serde(default)]
    price_overview: Option<SteamPrice>,
}

#[derive(Debug, Deserialize)]
struct SteamGenre {
    description: String,
}

#[derive(Debug, Deserialize)]
struct SteamReleaseDate {
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SteamMetacritic {
    score: u32,
}

#[derive(Debug, Deserialize)]
struct SteamPrice {
    #[serde(default)]
    final_formatted: Option<String>,
}

fn to_item(app_id: &str, app: SteamApp) -> Item {
    let genres = app.genres.into_iter().map(|g| g.description).collect();
    let title = app
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("App {}", app_id));

    let mut item = Item::new(app_id, ItemKind::Game, title).with_genres(genres);
    item.year = app
        .release_date
        .and_then(|r| r.date)
        .as_deref()
        .and_then(parse_year);
    item.rating = app.metacritic.map(|m| m.score as f32 / 10.0).unwrap_or(0.0);
    item.poster = app.header_image.filter(|p| !p.trim().is_empty());
    item.is_free = app.is_free;
    item.price = app.price_overview.and_then(|p| p.final_formatted);
    item.description = app.short_description.filter(|d| !d.trim().is_empty());
    item
}

/// Ids of search hits that are games (or untyped), in store order
fn parse_search_ids(body: &str) -> AppResult<Vec<String>> {
    let response: StoreSearchResponse = serde_json::from_str(body)
        .map_err(|e| AppError::ExternalApi(format!("Failed to parse Steam search: {}", e)))?;

    Ok(response
        .items
        .into_iter()
        .filter(|item| {
            matches!(
                item.item_type.as_deref(),
                None | Some("game") | Some("app")
            )
        })
        .map(|item| item.id.to_string())
        .take(MAX_SEARCH_DETAILS)
        .collect())
}

fn parse_app_details(app_id: &str, body: &str) -> AppResult<Option<Item>> {
    if body.trim().is_empty() {
        return Err(AppError::ExternalApi(
            "Empty response from Steam store".to_string(),
        ));
    }

    let mut envelopes: HashMap<String, AppDetailsEnvelope> = serde_json::from_str(body)
        .map_err(|e| AppError::ExternalApi(format!("Failed to parse Steam app details: {}", e)))?;

    match envelopes.remove(app_id) {
        Some(AppDetailsEnvelope {
            success: true,
            data: Some(app),
        }) => Ok(Some(to_item(app_id, app))),
        _ => Ok(None),
    }
}

/// "game" plus the store-language word for it
fn variants_for_language(language: &str) -> Vec<String> {
    let localized = match language.to_lowercase().as_str() {
        "hungarian" => Some("játék"),
        "german" => Some("spiel"),
        "french" => Some("jeu"),
        "spanish" => Some("juego"),
        "italian" => Some("gioco"),
        _ => None,
    };

    std::iter::once("game")
        .chain(localized)
        .map(str::to_string)
        .collect()
}

#[derive(Clone)]
pub struct SteamProvider {
    http_client: HttpClient,
    store_url: String,
    language: String,
    country: String,
    cache: Option<Cache>,
}

impl SteamProvider {
    pub fn new(store_url: String, language: String, country: String, cache: Option<Cache>) -> Self {
        Self {
            http_client: HttpClient::new(),
            store_url: store_url.trim_end_matches('/').to_string(),
            language,
            country,
            cache,
        }
    }

    async fn get(&self, path: &str, params: &[(&str, &str)]) -> AppResult<String> {
        let url = format!("{}{}", self.store_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(params)
            .query(&[("l", self.language.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Steam store returned status {}: {}",
                status, body
            )));
        }

        Ok(response.text().await?)
    }

    async fn app_details(&self, app_id: &str) -> AppResult<Option<Item>> {
        cached!(
            &self.cache,
            CacheKey::Detail(self.name(), app_id.to_string()),
            DETAIL_CACHE_TTL,
            async move {
                let body = self.get("/appdetails", &[("appids", app_id)]).await?;
                let item = parse_app_details(app_id, &body)?;

                tracing::debug!(
                    app_id = %app_id,
                    found = item.is_some(),
                    provider = "steam",
                    "App details fetched"
                );

                Ok::<_, AppError>(item)
            }
        )
    }

    async fn resolve(&self, ids: Vec<String>) -> Vec<Item> {
        fetch_details(self, ids)
            .await
            .into_iter()
            .filter(Item::has_poster)
            .collect()
    }
}

#[async_trait::async_trait]
impl ContentProvider for SteamProvider {
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
                let body = self
                    .get(
                        "/storesearch/",
                        &[("term", term), ("cc", self.country.as_str())],
                    )
                    .await?;
                let ids = parse_search_ids(&body)?;
                let hits = ids.len();
                let items = self.resolve(ids).await;

                tracing::info!(
                    term = %term,
                    hits,
                    results = items.len(),
                    provider = "steam",
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

        if key.chars().all(|c| c.is_ascii_digit()) {
            return self.app_details(key).await;
        }

        // Not an app id: treat it as a title and take the best search hit
        Ok(self.search(key).await?.into_iter().next())
    }

    async fn popular(&self) -> AppResult<Vec<Item>> {
        let ids = POPULAR_APP_IDS.iter().map(|id| id.to_string()).collect();
        let games = self.resolve(ids).await;

        if games.is_empty() {
            return Err(AppError::ExternalApi(
                "No popular games could be fetched from Steam".to_string(),
            ));
        }

        Ok(games)
    }

    fn term_variants(&self) -> Vec<String> {
        variants_for_language(&self.language)
    }

    fn clone_for_task(&self) -> Box<dyn ContentProvider> {
        Box::new(self.clone())
    }

    fn name(&self) -> &'static str {
        "steam"
    }
}
