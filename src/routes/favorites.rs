use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    middleware::Identity,
    models::{Comment, Favorite, NewComment, NewFavorite},
    routes::AppState,
    services::ProgressionEvent,
};

pub async fn list_favorites(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<Vec<Favorite>>> {
    let favorites = state.favorites.list_favorites(identity.as_deref()).await?;
    Ok(Json(favorites))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<NewFavorite>,
) -> AppResult<(StatusCode, Json<Favorite>)> {
    let favorite = state
        .favorites
        .add_favorite(identity.as_deref(), &body)
        .await?;

    state
        .record_progress(identity.as_deref(), ProgressionEvent::FavoriteAdded)
        .await;

    Ok((StatusCode::CREATED, Json(favorite)))
}

pub async fn delete_favorite(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state
        .favorites
        .delete_favorite(identity.as_deref(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> AppResult<Json<Vec<Comment>>> {
    let comments = state.favorites.list_comments(&external_id).await?;
    Ok(Json(comments))
}

pub async fn add_comment(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<NewComment>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .favorites
        .add_comment(identity.as_deref(), &body)
        .await?;

    state
        .record_progress(identity.as_deref(), ProgressionEvent::CommentAdded)
        .await;

    Ok((StatusCode::CREATED, Json(comment)))
}
