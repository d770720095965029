//! HTTP routes.

mod admin;
mod auth;
mod cart;
mod health;
mod laptops;
mod upload;

use axum::extract::DefaultBodyLimit;
use axum::http::Uri;
use axum::middleware;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, Method};
use notebook_commerce::ProductId;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeader;
use tracing::warn;

use crate::error::ApiError;
use crate::middleware::{expose_internal_detail, rate_limit, request_tracing};
use crate::state::AppState;

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let api = Router::new()
        .nest("/health", health::router())
        .nest("/laptops", laptops::router())
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
        .nest("/upload", upload::router())
        .nest("/cart", cart::router())
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    let uploads = SetResponseHeader::overriding(
        ServeDir::new(config.storage.uploads_dir()),
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("cross-origin"),
    );

    let mut router = Router::new()
        .nest("/api", api)
        .nest_service("/uploads", uploads)
        .fallback(not_found);
    if !config.server.environment.is_production() {
        router = router.layer(middleware::from_fn(expose_internal_detail));
    }

    router
        .layer(DefaultBodyLimit::max(config.server.body_limit_bytes))
        .layer(cors_layer(&config.server.cors_origins))
        .layer(middleware::from_fn(request_tracing))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} not found", uri.path()))
}

/// Product ids in paths are numeric; anything else cannot name a product.
fn parse_product_id(raw: &str) -> Result<ProductId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found(format!("Laptop not found: {raw}")))
}
