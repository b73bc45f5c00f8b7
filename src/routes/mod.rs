pub mod auth;
pub mod collections;
pub mod images;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The whole HTTP surface: `/api/*`, `/uploads/*` and `/health`.
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.config.uploads_path());
    let body_limit = state.config.max_upload_bytes();

    let api = Router::new()
        .merge(auth::router())
        .merge(images::router())
        .merge(collections::router())
        .merge(users::router());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
