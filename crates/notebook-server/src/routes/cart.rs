//! Per-session carts.
//!
//! The session id is chosen by the client and only has to be a safe
//! storage key. Reading a session that has nothing stored does not load a
//! cart. Quantity limits and stock are enforced here; the cart
//! store itself accepts any positive quantity.

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::Router;
use notebook_commerce::cart::{
    validate_for_cart, CartPricing, CartState, CartStore, PricingPolicy, MAX_QUANTITY_PER_ITEM,
};
use notebook_commerce::{CartSessionId, CommerceError, ProductId};
use serde::{Deserialize, Serialize};

use super::parse_product_id;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::response::ApiResponse;
use crate::state::AppState;

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/{session}", get(show).delete(clear))
        .route("/{session}/items", post(add_item))
        .route("/{session}/items/{laptop_id}", put(update_item).delete(remove_item))
        .route("/{session}/toggle", post(toggle))
}

/// Cart state with its pricing breakdown.
#[derive(Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub state: CartState,
    pub pricing: CartPricing,
}

impl CartView {
    fn of(cart: &CartStore, policy: &PricingPolicy) -> Self {
        Self {
            state: cart.state().clone(),
            pricing: cart.pricing(policy),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItemRequest {
    laptop_id: ProductId,
    #[serde(default)]
    quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct UpdateItemRequest {
    quantity: i64,
}

fn session_id(raw: &str) -> Result<CartSessionId, ApiError> {
    CartSessionId::parse(raw).ok_or_else(|| ApiError::bad_request("Invalid cart session id"))
}

async fn show(
    State(state): State<AppState>,
    ApiPath(session): ApiPath<String>,
) -> Result<ApiResponse<CartView>, ApiError> {
    let session = session_id(&session)?;
    let policy = state.config.cart;
    let view = state
        .carts
        .read_cart(&session, move |cart| CartView::of(cart, &policy))
        .await?;
    Ok(ApiResponse::ok(view))
}

async fn add_item(
    State(state): State<AppState>,
    ApiPath(session): ApiPath<String>,
    ApiJson(request): ApiJson<AddItemRequest>,
) -> Result<ApiResponse<CartView>, ApiError> {
    let session = session_id(&session)?;
    let quantity = request.quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(CommerceError::InvalidQuantity(quantity).into());
    }

    let product = state.catalog.read().await.require(request.laptop_id)?.clone();
    validate_for_cart(&product)?;
    if !product.in_stock {
        return Err(ApiError::bad_request(format!("{} is out of stock", product.name)));
    }

    let policy = state.config.cart;
    let (outcome, view) = state
        .carts
        .with_cart(&session, move |cart| {
            let in_cart = cart.get(product.id).map_or(0, |item| item.quantity);
            let wanted = in_cart.saturating_add(quantity);
            if wanted > MAX_QUANTITY_PER_ITEM {
                return Err(CommerceError::QuantityExceedsLimit(wanted, MAX_QUANTITY_PER_ITEM));
            }
            let outcome = cart.add_item(&product, quantity);
            Ok((outcome, CartView::of(cart, &policy)))
        })
        .await??;

    Ok(ApiResponse::ok(view).with_message(outcome.message))
}

async fn update_item(
    State(state): State<AppState>,
    ApiPath((session, laptop_id)): ApiPath<(String, String)>,
    ApiJson(request): ApiJson<UpdateItemRequest>,
) -> Result<ApiResponse<CartView>, ApiError> {
    let session = session_id(&session)?;
    let id = parse_product_id(&laptop_id)?;
    if request.quantity < 0 {
        return Err(CommerceError::InvalidQuantity(request.quantity).into());
    }
    if request.quantity > MAX_QUANTITY_PER_ITEM {
        return Err(CommerceError::QuantityExceedsLimit(request.quantity, MAX_QUANTITY_PER_ITEM).into());
    }

    let quantity = request.quantity;
    let policy = state.config.cart;
    let view = state
        .carts
        .with_cart(&session, move |cart| {
            if cart.get(id).is_none() {
                return Err(CommerceError::ItemNotInCart(id.to_string()));
            }
            cart.update_quantity(id, quantity);
            Ok(CartView::of(cart, &policy))
        })
        .await??;

    let message = if quantity == 0 {
        "Item removed from cart"
    } else {
        "Cart updated"
    };
    Ok(ApiResponse::ok(view).with_message(message))
}

async fn remove_item(
    State(state): State<AppState>,
    ApiPath((session, laptop_id)): ApiPath<(String, String)>,
) -> Result<ApiResponse<CartView>, ApiError> {
    let session = session_id(&session)?;
    let id = parse_product_id(&laptop_id)?;

    let policy = state.config.cart;
    let view = state
        .carts
        .with_cart(&session, move |cart| {
            if cart.get(id).is_none() {
                return Err(CommerceError::ItemNotInCart(id.to_string()));
            }
            cart.remove_item(id);
            Ok(CartView::of(cart, &policy))
        })
        .await??;
    Ok(ApiResponse::ok(view).with_message("Item removed from cart"))
}

async fn clear(
    State(state): State<AppState>,
    ApiPath(session): ApiPath<String>,
) -> Result<ApiResponse<CartView>, ApiError> {
    let session = session_id(&session)?;
    let policy = state.config.cart;
    let view = state
        .carts
        .with_cart(&session, move |cart| {
            cart.clear();
            CartView::of(cart, &policy)
        })
        .await?;
    Ok(ApiResponse::ok(view).with_message("Cart cleared"))
}

async fn toggle(
    State(state): State<AppState>,
    ApiPath(session): ApiPath<String>,
) -> Result<ApiResponse<CartView>, ApiError> {
    let session = session_id(&session)?;
    let policy = state.config.cart;
    let view = state
        .carts
        .with_cart(&session, move |cart| {
            cart.toggle();
            CartView::of(cart, &policy)
        })
        .await?;
    Ok(ApiResponse::ok(view))
}
