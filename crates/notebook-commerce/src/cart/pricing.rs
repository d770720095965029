//! Cart pricing calculations.

use crate::cart::CartState;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Tax, shipping and free-shipping rules applied at checkout display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PricingPolicy {
    /// Tax rate as a percentage of the subtotal.
    pub tax_rate: f64,
    /// Orders strictly above this subtotal ship free.
    pub free_shipping_threshold: Money,
    /// Flat shipping fee below the threshold.
    pub shipping_cost: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: 19.0,
            free_shipping_threshold: Money::from_units(200_000),
            shipping_cost: Money::from_units(15_000),
        }
    }
}

/// Complete pricing breakdown for a cart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartPricing {
    /// Sum of line totals.
    pub subtotal: Money,
    /// Tax on the subtotal.
    pub tax: Money,
    /// Shipping fee; zero for an empty cart or above the threshold.
    pub shipping: Money,
    /// subtotal + tax + shipping.
    pub total: Money,
    /// Sum of quantities.
    pub item_count: i64,
    pub is_empty: bool,
}

impl CartPricing {
    /// Price `state` under `policy`.
    pub fn calculate(state: &CartState, policy: &PricingPolicy) -> Self {
        let subtotal = state.total_price;
        let tax = subtotal.percentage(policy.tax_rate);
        let shipping = if state.is_empty() || subtotal > policy.free_shipping_threshold {
            Money::zero()
        } else {
            policy.shipping_cost
        };

        Self {
            subtotal,
            tax,
            shipping,
            total: subtotal.saturating_add(&tax).saturating_add(&shipping),
            item_count: state.total_items,
            is_empty: state.is_empty(),
        }
    }

    /// Whether this order ships free.
    pub fn has_free_shipping(&self) -> bool {
        !self.is_empty && self.shipping.is_zero()
    }
}
