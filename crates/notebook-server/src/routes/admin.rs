//! Admin product management with multipart image attachments.
//!
//! Create and update take a multipart form with a `productData` JSON field
//! and an optional `image` file. A stored upload becomes the product image;
//! if the catalog write fails the new file is removed again.

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use http::StatusCode;
use notebook_commerce::catalog::{CatalogStats, Product, ProductDraft, ProductPatch};
use notebook_commerce::search::{CatalogQuery, SortField, SortOrder};
use serde::de::DeserializeOwned;
use tracing::info;

use super::parse_product_id;
use super::upload::{store, Form};
use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};
use crate::images::StoredImage;
use crate::middleware::AdminSession;
use crate::response::ApiResponse;
use crate::state::AppState;

const PRODUCT_FIELD: &str = "productData";
const IMAGE_FIELD: &str = "image";

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list).post(create))
        .route("/products/{id}", get(show).put(update).delete(remove))
        .route("/products/{id}/toggle-stock", post(toggle_stock))
        .route("/stats", get(stats))
}

async fn list(
    State(state): State<AppState>,
    _session: AdminSession,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> ApiResponse<Vec<Product>> {
    let query = query.with_default_sort(SortField::CreatedAt, SortOrder::Desc);
    ApiResponse::page(state.catalog.read().await.query(&query))
}

async fn show(
    State(state): State<AppState>,
    _session: AdminSession,
    ApiPath(id): ApiPath<String>,
) -> Result<ApiResponse<Product>, ApiError> {
    let id = parse_product_id(&id)?;
    let product = state.catalog.read().await.require(id)?.clone();
    Ok(ApiResponse::ok(product))
}

async fn create(
    State(state): State<AppState>,
    session: AdminSession,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, ApiResponse<Product>), ApiError> {
    let mut form = Form::read(multipart).await?;
    let mut draft: ProductDraft = product_data(&form)?
        .ok_or_else(|| ApiError::bad_request("productData is required"))?;
    let upload = store_image(&state, &mut form).await?;
    if let Some(image) = &upload {
        draft.image = Some(image.url.clone());
    }

    let created = state.catalog.write().await.create(draft);
    let product = match created {
        Ok(product) => product,
        Err(e) => {
            discard(&state, upload).await;
            return Err(e.into());
        }
    };

    info!(id = %product.id, admin = %session.admin.username, "Admin created product");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(product).with_message("Product created successfully"),
    ))
}

async fn update(
    State(state): State<AppState>,
    session: AdminSession,
    ApiPath(id): ApiPath<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<Product>, ApiError> {
    let id = parse_product_id(&id)?;
    let mut form = Form::read(multipart).await?;
    let mut patch: ProductPatch = product_data(&form)?.unwrap_or_default();
    let upload = store_image(&state, &mut form).await?;
    if let Some(image) = &upload {
        patch.image = Some(image.url.clone());
    }

    let (previous, updated) = {
        let mut catalog = state.catalog.write().await;
        let previous = catalog.get(id).map(|p| p.image.clone());
        (previous, catalog.update(id, patch))
    };
    let product = match updated {
        Ok(product) => product,
        Err(e) => {
            discard(&state, upload).await;
            return Err(e.into());
        }
    };

    if upload.is_some() {
        if let Some(old) = previous.filter(|old| *old != product.image) {
            state.images.delete_by_url(&old).await;
        }
    }

    info!(id = %product.id, admin = %session.admin.username, "Admin updated product");
    Ok(ApiResponse::ok(product).with_message("Product updated successfully"))
}

async fn remove(
    State(state): State<AppState>,
    session: AdminSession,
    ApiPath(id): ApiPath<String>,
) -> Result<ApiResponse<()>, ApiError> {
    let id = parse_product_id(&id)?;
    let product = state.catalog.write().await.delete(id)?;
    state.images.delete_by_url(&product.image).await;
    info!(id = %product.id, admin = %session.admin.username, "Admin deleted product");
    Ok(ApiResponse::message("Product deleted successfully"))
}

async fn toggle_stock(
    State(state): State<AppState>,
    session: AdminSession,
    ApiPath(id): ApiPath<String>,
) -> Result<ApiResponse<Product>, ApiError> {
    let id = parse_product_id(&id)?;
    let product = state.catalog.write().await.toggle_stock(id)?;
    info!(id = %product.id, in_stock = product.in_stock, admin = %session.admin.username, "Toggled stock");

    let message = if product.in_stock {
        "Product marked in stock"
    } else {
        "Product marked out of stock"
    };
    Ok(ApiResponse::ok(product).with_message(message))
}

async fn stats(State(state): State<AppState>, _session: AdminSession) -> ApiResponse<CatalogStats> {
    ApiResponse::ok(state.catalog.read().await.stats())
}

/// Parse the `productData` field, if present.
fn product_data<T: DeserializeOwned>(form: &Form) -> Result<Option<T>, ApiError> {
    form.text(PRODUCT_FIELD)
        .map(|raw| {
            serde_json::from_str(raw)
                .map_err(|e| ApiError::bad_request(format!("productData is not valid JSON: {e}")))
        })
        .transpose()
}

async fn store_image(state: &AppState, form: &mut Form) -> Result<Option<StoredImage>, ApiError> {
    let mut files = form.take_files(IMAGE_FIELD);
    if files.len() > 1 {
        return Err(ApiError::bad_request("Only one image may be attached"));
    }
    match files.pop() {
        Some(part) => Ok(Some(store(state, &part).await?)),
        None => Ok(None),
    }
}

async fn discard(state: &AppState, upload: Option<StoredImage>) {
    if let Some(image) = upload {
        state.images.delete_by_url(&image.url).await;
    }
}
