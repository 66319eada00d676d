use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

pub mod behavior;
pub mod favorites;
pub mod items;
pub mod recommendations;
pub mod session;
pub mod state;
pub mod suggestions;

pub use state::{AppState, AppStateBuilder};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Content lookup
        .route("/items/search", get(items::search))
        .route("/items/popular", get(items::popular))
        .route("/items/:id", get(items::detail))
        .route("/items/:id/open", post(items::open))
        // Behavior tracking
        .route(
            "/consent",
            get(behavior::get_consent).put(behavior::put_consent),
        )
        .route("/behavior", get(behavior::snapshot))
        // Recommendations
        .route("/recommendations", get(recommendations::recommend))
        .route("/recommendations/similar", get(recommendations::similar))
        .route("/suggestions", get(suggestions::suggest))
        .route("/suggestions/smart", get(suggestions::smart))
        // Sessions and achievements
        .route("/session/login", post(session::login))
        .route("/session/logout", post(session::logout))
        .route("/achievements", get(session::achievements))
        .route(
            "/achievements/notification",
            delete(session::dismiss_notification),
        )
        // Favorites and comments
        .route(
            "/favorites",
            get(favorites::list_favorites).post(favorites::add_favorite),
        )
        .route("/favorites/:id", delete(favorites::delete_favorite))
        .route("/comments", post(favorites::add_comment))
        .route("/comments/:external_id", get(favorites::list_comments))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
