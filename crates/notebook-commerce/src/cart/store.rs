//! The cart store: reducer state, persistence and change listeners.

use std::fmt;

use notebook_cache::{cache_key, Cache};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cart::{CartAction, CartItem, CartPricing, CartState, PricingPolicy};
use crate::catalog::Product;
use crate::ids::{CartSessionId, ProductId};
use crate::money::Money;

/// Storage key of the persisted item list.
pub const CART_STORAGE_KEY: &str = "notebook-cart";

/// Handle returned by [`CartStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Notification sent to listeners after a change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CartEvent {
    /// Items changed and were persisted.
    #[serde(rename_all = "camelCase")]
    Updated { total_items: i64, total_price: Money },
    /// The cart drawer was opened or closed.
    #[serde(rename_all = "camelCase")]
    Toggled { is_open: bool },
}

/// Result of [`CartStore::add_item`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutcome {
    pub success: bool,
    pub message: String,
}

type Listener = Box<dyn Fn(&CartEvent) + Send + Sync>;

/// A cart whose item list is written through to a [`Cache`] after every
/// mutation.
///
/// Storage problems never reach the caller: a failed load starts an empty
/// cart and a failed save is logged while the in-memory state stays
/// authoritative.
pub struct CartStore {
    state: CartState,
    cache: Cache,
    key: String,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl CartStore {
    /// Open the cart stored under [`CART_STORAGE_KEY`].
    pub fn open(cache: Cache) -> Self {
        Self::open_with_key(cache, CART_STORAGE_KEY)
    }

    /// Open the cart belonging to a server-side session.
    pub fn for_session(cache: Cache, session: &CartSessionId) -> Self {
        Self::open_with_key(cache, Self::session_key(session))
    }

    /// Storage key of the cart for `session`.
    pub fn session_key(session: &CartSessionId) -> String {
        cache_key!(CART_STORAGE_KEY, session)
    }

    /// Open the cart stored under `key`.
    pub fn open_with_key(cache: Cache, key: impl Into<String>) -> Self {
        let key = key.into();
        let mut store = Self {
            state: CartState::new(),
            cache,
            key,
            listeners: Vec::new(),
            next_subscription: 0,
        };

        match store.cache.get::<Vec<CartItem>>(&store.key) {
            Ok(Some(items)) => {
                store.state = store.state.reduce(CartAction::Load(items));
                debug!(key = %store.key, items = store.state.items.len(), "Loaded cart");
            }
            Ok(None) => {}
            Err(e) => warn!(key = %store.key, error = %e, "Failed to load cart, starting empty"),
        }

        store
    }

    /// A cart that lives only in memory.
    pub fn in_memory() -> Self {
        Self::open(Cache::memory())
    }

    /// Storage key this cart persists under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> &CartState {
        &self.state
    }

    pub fn items(&self) -> &[CartItem] {
        &self.state.items
    }

    pub fn total_items(&self) -> i64 {
        self.state.total_items
    }

    pub fn total_price(&self) -> Money {
        self.state.total_price
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    /// Line for `id`, if present.
    pub fn get(&self, id: ProductId) -> Option<&CartItem> {
        self.state.get(id)
    }

    /// Add `quantity` of `product`. Always reports success; stock is not
    /// checked here.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> AddOutcome {
        self.dispatch(CartAction::AddItem {
            item: CartItem::from_product(product, quantity),
        });
        AddOutcome {
            success: true,
            message: "Product added to cart".to_string(),
        }
    }

    /// Add a single unit of `product`.
    pub fn add_one(&mut self, product: &Product) -> AddOutcome {
        self.add_item(product, 1)
    }

    pub fn remove_item(&mut self, id: ProductId) {
        self.dispatch(CartAction::RemoveItem { id });
    }

    /// Set the quantity of `id`; zero or less removes it.
    pub fn update_quantity(&mut self, id: ProductId, quantity: i64) {
        self.dispatch(CartAction::UpdateQuantity { id, quantity });
    }

    pub fn clear(&mut self) {
        self.dispatch(CartAction::Clear);
    }

    pub fn toggle(&mut self) {
        self.dispatch(CartAction::Toggle);
    }

    /// Replace the items wholesale.
    pub fn load(&mut self, items: Vec<CartItem>) {
        self.dispatch(CartAction::Load(items));
    }

    /// Reduce `action`, then persist and notify.
    ///
    /// Toggling only touches the open flag, which is not persisted.
    pub fn dispatch(&mut self, action: CartAction) {
        let toggled = matches!(action, CartAction::Toggle);
        self.state = self.state.reduce(action);

        if toggled {
            self.emit(CartEvent::Toggled {
                is_open: self.state.is_open,
            });
            return;
        }

        self.persist();
        self.emit(CartEvent::Updated {
            total_items: self.state.total_items,
            total_price: self.state.total_price,
        });
    }

    /// Register `listener` for change events.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&CartEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() < before
    }

    /// Price the current contents under `policy`.
    pub fn pricing(&self, policy: &PricingPolicy) -> CartPricing {
        CartPricing::calculate(&self.state, policy)
    }

    /// An empty cart leaves nothing behind in storage.
    fn persist(&self) {
        let saved = if self.state.items.is_empty() {
            self.cache.delete(&self.key)
        } else {
            self.cache.set(&self.key, &self.state.items)
        };
        if let Err(e) = saved {
            warn!(key = %self.key, error = %e, "Failed to persist cart");
        }
    }

    fn emit(&self, event: CartEvent) {
        for (_, listener) in &self.listeners {
            listener(&event);
        }
    }
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.key)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
