//! Shopping cart module.
//!
//! Contains the cart state and reducer, the persisted cart store, and
//! pricing.

mod pricing;
mod state;
mod store;

pub use pricing::{CartPricing, PricingPolicy};
pub use state::{validate_for_cart, CartAction, CartItem, CartState, MAX_QUANTITY_PER_ITEM};
pub use store::{AddOutcome, CartEvent, CartStore, SubscriptionId, CART_STORAGE_KEY};
