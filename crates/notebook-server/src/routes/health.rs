use axum::extract::State;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    message: &'static str,
    timestamp: String,
    environment: &'static str,
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

async fn health(State(state): State<AppState>) -> ApiResponse<Health> {
    ApiResponse::ok(Health {
        status: "OK",
        message: "Notebook store API is running",
        timestamp: chrono::Utc::now().to_rfc3339(),
        environment: state.config.server.environment.as_str(),
    })
}
