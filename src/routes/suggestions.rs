use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    middleware::VisitorId,
    routes::AppState,
    services::suggestions::{self, SmartSuggestion},
};

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    q: String,
}

pub async fn suggest(
    State(state): State<AppState>,
    VisitorId(visitor): VisitorId,
    Query(params): Query<SuggestionQuery>,
) -> Json<Vec<String>> {
    let record = state.behavior.snapshot(&visitor).await;
    Json(suggestions::suggestions(&record, &params.q))
}

pub async fn smart(
    State(state): State<AppState>,
    VisitorId(visitor): VisitorId,
) -> Json<Vec<SmartSuggestion>> {
    let record = state.behavior.snapshot(&visitor).await;
    Json(suggestions::smart_suggestions(&record))
}
