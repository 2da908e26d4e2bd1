//! Current status route.

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;

use crate::api::models::{API_VERSION, StatusData, StatusResponse};
use crate::api::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.store.read();
    Json(StatusResponse {
        success: true,
        data: StatusData::from(&snapshot),
        api_version: API_VERSION,
        timestamp: Utc::now().to_rfc3339(),
    })
}
