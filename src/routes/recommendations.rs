use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    middleware::VisitorId,
    models::{BehaviorRecord, Item, MIN_QUERY_LEN},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    q: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    items: Vec<Item>,
    /// A newer request from the same visitor started before this one finished
    stale: bool,
}

/// Stale results are dropped so an older response never overwrites a newer one
async fn finish(
    state: &AppState,
    visitor: &str,
    token: u64,
    items: Vec<Item>,
) -> Json<RecommendationResponse> {
    if state.requests.finish(visitor, token).await {
        return Json(RecommendationResponse {
            items,
            stale: false,
        });
    }

    tracing::debug!(visitor = %visitor, token, "Discarding superseded recommendations");
    Json(RecommendationResponse {
        items: Vec::new(),
        stale: true,
    })
}

/// Idle-view recommendations merged from every strategy
pub async fn recommend(
    State(state): State<AppState>,
    VisitorId(visitor): VisitorId,
) -> Json<RecommendationResponse> {
    let token = state.requests.begin(&visitor).await;
    let record = state.behavior.snapshot(&visitor).await;
    let items = state.recommendations.all_recommendations(&record).await;

    finish(&state, &visitor, token, items).await
}

/// Items similar to the current search term
pub async fn similar(
    State(state): State<AppState>,
    VisitorId(visitor): VisitorId,
    Query(params): Query<SimilarQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    if BehaviorRecord::normalize_query(&params.q).is_none() {
        return Err(AppError::Validation(format!(
            "Search query must be at least {} characters",
            MIN_QUERY_LEN
        )));
    }

    let token = state.requests.begin(&visitor).await;
    let record = state.behavior.snapshot(&visitor).await;
    let items = state
        .recommendations
        .similar_to_search(&record, &params.q)
        .await;

    Ok(finish(&state, &visitor, token, items).await)
}
