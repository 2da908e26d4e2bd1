use axum::{Json, Router, extract::State, routing::get};

use crate::api::models::InfoResponse;
use crate::api::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/info", get(get_info))
}

async fn get_info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse::new(state.start_time.elapsed().as_secs()))
}
