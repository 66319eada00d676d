use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{middleware::VisitorId, models::BehaviorRecord, routes::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsentBody {
    consent: bool,
}

pub async fn get_consent(
    State(state): State<AppState>,
    VisitorId(visitor): VisitorId,
) -> Json<ConsentBody> {
    let consent = state.behavior.has_consent(&visitor).await;
    Json(ConsentBody { consent })
}

/// Granting consent starts tracking; revoking it deletes everything tracked so far
pub async fn put_consent(
    State(state): State<AppState>,
    VisitorId(visitor): VisitorId,
    Json(body): Json<ConsentBody>,
) -> Json<ConsentBody> {
    state.behavior.set_consent(&visitor, body.consent).await;
    let consent = state.behavior.has_consent(&visitor).await;
    Json(ConsentBody { consent })
}

pub async fn snapshot(
    State(state): State<AppState>,
    VisitorId(visitor): VisitorId,
) -> Json<BehaviorRecord> {
    Json(state.behavior.snapshot(&visitor).await)
}
