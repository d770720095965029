//! Cart state and the reducer that drives it.

use crate::catalog::Product;
use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Maximum quantity of a single product the storefront lets a customer pick.
///
/// The reducer itself accepts any positive quantity; HTTP routes enforce
/// this bound before dispatching.
pub const MAX_QUANTITY_PER_ITEM: i64 = 10;

/// A line in the cart: a snapshot of the product at the time it was added
/// plus a quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub quantity: i64,
}

impl CartItem {
    /// Snapshot `product` with `quantity`.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            brand: product.brand.clone(),
            model: product.model.clone(),
            quantity,
        }
    }

    /// `price * quantity`.
    pub fn line_total(&self) -> Money {
        self.price.saturating_multiply(self.quantity)
    }
}

/// Something that can happen to a cart.
#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    /// Add `item`, merging into an existing line with the same id.
    AddItem { item: CartItem },
    /// Drop the line with `id`.
    RemoveItem { id: ProductId },
    /// Set the quantity of `id`; zero or less removes the line.
    UpdateQuantity { id: ProductId, quantity: i64 },
    /// Back to the empty state, closed.
    Clear,
    /// Replace the items, keeping `is_open`.
    Load(Vec<CartItem>),
    /// Flip `is_open`.
    Toggle,
}

/// Cart contents plus derived totals.
///
/// `total_items` and `total_price` are recomputed from `items` by every
/// reduction and never diverge from them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    pub items: Vec<CartItem>,
    pub total_items: i64,
    pub total_price: Money,
    pub is_open: bool,
}

impl CartState {
    /// The empty, closed cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `action` and return the next state. `self` is untouched.
    pub fn reduce(&self, action: CartAction) -> CartState {
        match action {
            CartAction::AddItem { item } => {
                let mut items = self.items.clone();
                match items.iter().position(|line| line.id == item.id) {
                    Some(index) => {
                        let merged = items[index].quantity.saturating_add(item.quantity);
                        if merged <= 0 {
                            items.remove(index);
                        } else {
                            items[index].quantity = merged;
                        }
                    }
                    None if item.quantity > 0 => items.push(item),
                    None => {}
                }
                self.with_items(items)
            }
            CartAction::RemoveItem { id } => {
                let items = self.items.iter().filter(|line| line.id != id).cloned().collect();
                self.with_items(items)
            }
            CartAction::UpdateQuantity { id, quantity } => {
                if quantity <= 0 {
                    return self.reduce(CartAction::RemoveItem { id });
                }
                let items = self
                    .items
                    .iter()
                    .map(|line| {
                        if line.id == id {
                            CartItem {
                                quantity,
                                ..line.clone()
                            }
                        } else {
                            line.clone()
                        }
                    })
                    .collect();
                self.with_items(items)
            }
            CartAction::Clear => CartState::new(),
            CartAction::Load(items) => self.with_items(normalize(items)),
            CartAction::Toggle => CartState {
                is_open: !self.is_open,
                ..self.clone()
            },
        }
    }

    /// Line for `id`, if present.
    pub fn get(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|line| line.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn with_items(&self, items: Vec<CartItem>) -> CartState {
        let total_items = items
            .iter()
            .fold(0i64, |acc, line| acc.saturating_add(line.quantity));
        let total_price = items
            .iter()
            .fold(Money::zero(), |acc, line| acc.saturating_add(&line.line_total()));

        CartState {
            items,
            total_items,
            total_price,
            is_open: self.is_open,
        }
    }
}

/// Drop non-positive lines and merge duplicate ids from persisted data.
fn normalize(items: Vec<CartItem>) -> Vec<CartItem> {
    let mut merged: Vec<CartItem> = Vec::with_capacity(items.len());
    for item in items.into_iter().filter(|item| item.quantity > 0) {
        match merged.iter_mut().find(|line| line.id == item.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
            None => merged.push(item),
        }
    }
    merged
}

/// Check that `product` can be put in a cart.
pub fn validate_for_cart(product: &Product) -> Result<(), CommerceError> {
    if product.name.trim().is_empty() {
        return Err(CommerceError::validation("product has no name"));
    }
    if !product.price.is_positive() {
        return Err(CommerceError::validation("product has no valid price"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::test_runner::Config;

    fn item(id: u64, price_units: i64, quantity: i64) -> CartItem {
        CartItem {
            id: ProductId::new(id),
            name: format!("Laptop {id}"),
            price: Money::from_units(price_units),
            image: String::new(),
            brand: "Lenovo".to_string(),
            model: None,
            quantity,
        }
    }

    #[test]
    fn test_add_new_and_merge() {
        let state = CartState::new()
            .reduce(CartAction::AddItem { item: item(1, 1000, 2) })
            .reduce(CartAction::AddItem { item: item(2, 500, 1) })
            .reduce(CartAction::AddItem { item: item(1, 1000, 1) });

        assert_eq!(state.items.len(), 2);
        assert_eq!(state.get(ProductId::new(1)).unwrap().quantity, 3);
        assert_eq!(state.total_items, 4);
        assert_eq!(state.total_price, Money::from_units(3500));
    }

    #[test]
    fn test_add_keeps_first_snapshot() {
        let mut repriced = item(1, 900, 1);
        repriced.name = "Renamed".to_string();
        let state = CartState::new()
            .reduce(CartAction::AddItem { item: item(1, 1000, 1) })
            .reduce(CartAction::AddItem { item: repriced });

        let line = state.get(ProductId::new(1)).unwrap();
        assert_eq!(line.price, Money::from_units(1000));
        assert_eq!(line.name, "Laptop 1");
    }

    #[test]
    fn test_add_non_positive() {
        let state = CartState::new().reduce(CartAction::AddItem { item: item(1, 1000, 0) });
        assert!(state.is_empty());

        let state = CartState::new()
            .reduce(CartAction::AddItem { item: item(1, 1000, 2) })
            .reduce(CartAction::AddItem { item: item(1, 1000, -2) });
        assert!(state.is_empty());
        assert_eq!(state.total_items, 0);
    }

    #[test]
    fn test_update_quantity() {
        let state = CartState::new()
            .reduce(CartAction::AddItem { item: item(1, 1000, 1) })
            .reduce(CartAction::UpdateQuantity {
                id: ProductId::new(1),
                quantity: 25,
            });
        assert_eq!(state.total_items, 25);

        let removed = state.reduce(CartAction::UpdateQuantity {
            id: ProductId::new(1),
            quantity: 0,
        });
        assert!(removed.is_empty());
        assert_eq!(removed.total_price, Money::zero());
    }

    #[test]
    fn test_update_missing_is_noop() {
        let state = CartState::new().reduce(CartAction::AddItem { item: item(1, 1000, 1) });
        let next = state.reduce(CartAction::UpdateQuantity {
            id: ProductId::new(9),
            quantity: 4,
        });
        assert_eq!(next, state);
    }

    #[test]
    fn test_clear_resets_open_flag() {
        let state = CartState::new()
            .reduce(CartAction::AddItem { item: item(1, 1000, 1) })
            .reduce(CartAction::Toggle)
            .reduce(CartAction::Clear);
        assert_eq!(state, CartState::new());
    }

    #[test]
    fn test_load_normalizes() {
        let state = CartState::new()
            .reduce(CartAction::Toggle)
            .reduce(CartAction::Load(vec![
                item(1, 1000, 1),
                item(2, 500, 0),
                item(1, 1000, 2),
            ]));

        assert!(state.is_open);
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.total_items, 3);
        assert_eq!(state.total_price, Money::from_units(3000));
    }

    #[test]
    fn test_reduce_is_pure() {
        let state = CartState::new().reduce(CartAction::AddItem { item: item(1, 1000, 1) });
        let before = state.clone();
        let _ = state.reduce(CartAction::Clear);
        assert_eq!(state, before);
    }

    #[test]
    fn test_json_shape() {
        let state = CartState::new().reduce(CartAction::AddItem { item: item(7, 1899, 2) });
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["totalItems"], 2);
        assert_eq!(json["totalPrice"], 3798);
        assert_eq!(json["isOpen"], false);
        assert_eq!(json["items"][0]["id"], 7);
        assert_eq!(json["items"][0]["price"], 1899);
    }

    fn action() -> impl Strategy<Value = CartAction> {
        prop_oneof![
            (1u64..5, 1i64..2000, -3i64..8)
                .prop_map(|(id, price, quantity)| CartAction::AddItem { item: item(id, price, quantity) }),
            (1u64..5).prop_map(|id| CartAction::RemoveItem { id: ProductId::new(id) }),
            (1u64..5, -2i64..12).prop_map(|(id, quantity)| CartAction::UpdateQuantity {
                id: ProductId::new(id),
                quantity,
            }),
            Just(CartAction::Clear),
            Just(CartAction::Toggle),
        ]
    }

    fn replay(actions: &[CartAction]) -> CartState {
        actions
            .iter()
            .fold(CartState::new(), |state, action| state.reduce(action.clone()))
    }

    proptest! {
        #![proptest_config(Config::with_cases(256))]
        #[test]
        fn totals_match_lines_after_any_actions(actions in prop::collection::vec(action(), 0..40)) {
            let state = replay(&actions);

            let quantity: i64 = state.items.iter().map(|line| line.quantity).sum();
            let price = state
                .items
                .iter()
                .fold(Money::zero(), |acc, line| acc.saturating_add(&line.price.saturating_multiply(line.quantity)));
            prop_assert_eq!(state.total_items, quantity);
            prop_assert_eq!(state.total_price, price);

            prop_assert!(state.items.iter().all(|line| line.quantity > 0));
            let mut ids: Vec<ProductId> = state.items.iter().map(|line| line.id).collect();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), state.items.len());
        }

        #[test]
        fn zero_quantity_update_is_removal(
            actions in prop::collection::vec(action(), 0..40),
            id in 1u64..5
        ) {
            let state = replay(&actions);
            let id = ProductId::new(id);
            prop_assert_eq!(
                state.reduce(CartAction::UpdateQuantity { id, quantity: 0 }),
                state.reduce(CartAction::RemoveItem { id })
            );
        }
    }
}
