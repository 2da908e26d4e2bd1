//! API route modules.

pub mod health;
pub mod info;
pub mod status;

use axum::Router;

use crate::api::error::ApiError;
use crate::api::server::AppState;

/// Create the API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(status::router())
        .merge(health::router())
        .merge(info::router())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::endpoint_not_found()
}
