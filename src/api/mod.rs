//! HTTP API - thin request/response mapping over the core / HTTP接口
//!
//! Handlers hold no logic of their own: they snapshot the shared state,
//! call into search/config/ingest and serialize the answer.

pub mod admin;
pub mod search;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub use admin::ApiResponse;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/search", get(search::search))
        .route("/api/categories", get(search::categories))
        .route("/api/stats", get(admin::stats))
        .route("/api/config/validate", get(admin::validate_config))
        .route("/api/config/examples", get(admin::list_examples))
        .route("/api/config/examples/:name", get(admin::get_example))
        .route("/api/reload", post(admin::reload))
        .route("/api/data", post(admin::upload_data))
        .with_state(state)
}
