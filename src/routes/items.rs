use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::{Identity, VisitorId},
    models::{BehaviorRecord, Item, MIN_QUERY_LEN},
    routes::AppState,
    services::ProgressionEvent,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
}

/// Body of `POST /items/:id/open`
#[derive(Debug, Deserialize)]
pub struct OpenItem {
    title: String,
    #[serde(default)]
    genre: Option<String>,
}

/// Searches the content provider and tracks the query
///
/// A search with at least one hit counts towards search achievements.
pub async fn search(
    State(state): State<AppState>,
    visitor: Option<VisitorId>,
    identity: Identity,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Item>>> {
    if BehaviorRecord::normalize_query(&params.q).is_none() {
        return Err(AppError::Validation(format!(
            "Search query must be at least {} characters",
            MIN_QUERY_LEN
        )));
    }

    let items = state.provider.search(&params.q).await?;

    if let Some(VisitorId(visitor)) = &visitor {
        state.behavior.track_search(visitor, &params.q).await;
        let keep = state.behavior.limits().keep_after_search;
        state.behavior.clean_history(visitor, keep).await;
    }

    if !items.is_empty() {
        state
            .record_progress(identity.as_deref(), ProgressionEvent::SearchSucceeded)
            .await;
    }

    Ok(Json(items))
}

pub async fn popular(State(state): State<AppState>) -> AppResult<Json<Vec<Item>>> {
    let items = state.provider.popular().await?;
    Ok(Json(items))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Item>> {
    state
        .provider
        .detail(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Item {} not found", id)))
}

/// Records that the visitor opened an item page
pub async fn open(
    State(state): State<AppState>,
    visitor: Option<VisitorId>,
    identity: Identity,
    Path(id): Path<String>,
    Json(body): Json<OpenItem>,
) -> AppResult<StatusCode> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title is required".to_string()));
    }

    if let Some(VisitorId(visitor)) = &visitor {
        let genre = body.genre.as_deref();
        state.behavior.track_view(visitor, &id, title, genre).await;
        state.behavior.track_genre(visitor, genre).await;
    }

    state
        .record_progress(identity.as_deref(), ProgressionEvent::ItemOpened)
        .await;

    Ok(StatusCode::NO_CONTENT)
}
