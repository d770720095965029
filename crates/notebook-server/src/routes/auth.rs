//! Admin login and account routes.

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use http::StatusCode;
use notebook_auth::{AdminProfile, LoginOutcome, NewAdmin};
use serde::Deserialize;
use tracing::info;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::AdminSession;
use crate::response::ApiResponse;
use crate::state::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/profile", get(profile))
        .route("/logout", post(logout))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginRequest {
    username: String,
    password: String,
}

// Password hashing is CPU bound, so it runs off the async workers.
async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<ApiResponse<LoginOutcome>, ApiError> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let auth = state.auth.clone();
    let dispatch = tracing::dispatcher::get_default(|current| current.clone());
    let outcome = tokio::task::spawn_blocking(move || {
        tracing::dispatcher::with_default(&dispatch, || {
            auth.login(&request.username, &request.password)
        })
    })
    .await??;
    Ok(ApiResponse::ok(outcome).with_message("Login successful"))
}

async fn register(
    State(state): State<AppState>,
    session: AdminSession,
    ApiJson(request): ApiJson<NewAdmin>,
) -> Result<(StatusCode, ApiResponse<AdminProfile>), ApiError> {
    let auth = state.auth.clone();
    let actor = session.admin;
    let profile = tokio::task::spawn_blocking(move || auth.register(&actor, request)).await??;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(profile).with_message("Admin created successfully"),
    ))
}

async fn profile(session: AdminSession) -> ApiResponse<AdminProfile> {
    ApiResponse::ok(session.admin)
}

async fn logout(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<ApiResponse<()>, ApiError> {
    state.auth.logout(&session.token)?;
    info!(username = %session.admin.username, "Admin logged out");
    Ok(ApiResponse::message("Logout successful"))
}
