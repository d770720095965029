//! Public catalog reads and bearer-gated JSON writes.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use http::StatusCode;
use notebook_commerce::catalog::{
    Category, PriceRange, Product, ProductDraft, ProductPatch, DEFAULT_RECOMMENDATIONS,
    DEFAULT_TEXT_RESULTS,
};
use notebook_commerce::search::CatalogQuery;
use serde::Deserialize;
use tracing::info;

use super::parse_product_id;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AdminSession;
use crate::response::ApiResponse;
use crate::state::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/brands", get(brands))
        .route("/categories", get(categories))
        .route("/recommendations", get(recommendations))
        .route("/price-range", get(price_range))
        .route("/search", get(search))
        .route("/{id}", get(show).put(update).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LimitParams {
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchParams {
    q: Option<String>,
    limit: Option<usize>,
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> ApiResponse<Vec<Product>> {
    ApiResponse::page(state.catalog.read().await.query(&query))
}

async fn brands(State(state): State<AppState>) -> ApiResponse<Vec<String>> {
    ApiResponse::ok(state.catalog.read().await.brands())
}

async fn categories(State(state): State<AppState>) -> ApiResponse<Vec<Category>> {
    ApiResponse::ok(state.catalog.read().await.categories())
}

async fn recommendations(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<LimitParams>,
) -> ApiResponse<Vec<Product>> {
    let limit = params.limit.unwrap_or(DEFAULT_RECOMMENDATIONS);
    ApiResponse::ok(state.catalog.read().await.recommendations(limit))
}

async fn price_range(State(state): State<AppState>) -> ApiResponse<PriceRange> {
    ApiResponse::ok(state.catalog.read().await.price_range())
}

async fn search(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<ApiResponse<Vec<Product>>, ApiError> {
    let q = params.q.unwrap_or_default();
    let limit = params.limit.unwrap_or(DEFAULT_TEXT_RESULTS);
    let results = state.catalog.read().await.search_text(&q, limit)?;
    Ok(ApiResponse::ok(results).with_query(q))
}

async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<ApiResponse<Product>, ApiError> {
    let id = parse_product_id(&id)?;
    let product = state.catalog.read().await.require(id)?.clone();
    Ok(ApiResponse::ok(product))
}

async fn create(
    State(state): State<AppState>,
    session: AdminSession,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> Result<(StatusCode, ApiResponse<Product>), ApiError> {
    let product = state.catalog.write().await.create(draft)?;
    info!(id = %product.id, admin = %session.admin.username, "Created laptop");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(product).with_message("Laptop created successfully"),
    ))
}

async fn update(
    State(state): State<AppState>,
    session: AdminSession,
    ApiPath(id): ApiPath<String>,
    ApiJson(patch): ApiJson<ProductPatch>,
) -> Result<ApiResponse<Product>, ApiError> {
    let id = parse_product_id(&id)?;
    let product = state.catalog.write().await.update(id, patch)?;
    info!(id = %product.id, admin = %session.admin.username, "Updated laptop");
    Ok(ApiResponse::ok(product).with_message("Laptop updated successfully"))
}

async fn remove(
    State(state): State<AppState>,
    session: AdminSession,
    ApiPath(id): ApiPath<String>,
) -> Result<ApiResponse<Product>, ApiError> {
    let id = parse_product_id(&id)?;
    let product = state.catalog.write().await.delete(id)?;
    state.images.delete_by_url(&product.image).await;
    info!(id = %product.id, admin = %session.admin.username, "Deleted laptop");
    Ok(ApiResponse::ok(product).with_message("Laptop deleted successfully"))
}
