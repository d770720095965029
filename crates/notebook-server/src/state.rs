//! Shared application state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notebook_auth::Authenticator;
use notebook_cache::Cache;
use notebook_commerce::cart::{CartEvent, CartStore};
use notebook_commerce::catalog::Catalog;
use notebook_commerce::CartSessionId;
use tokio::sync::RwLock;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::images::ImageStore;
use crate::middleware::RateLimiter;
use crate::seed;

/// Everything handlers share. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub catalog: Arc<RwLock<Catalog>>,
    pub carts: Arc<CartRegistry>,
    pub auth: Arc<Authenticator>,
    pub images: Arc<ImageStore>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Open the stores under the configured data directory, seed the
    /// catalog and create the bootstrap admin if configured.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let storage = &config.storage;
        std::fs::create_dir_all(&storage.data_dir).with_context(|| {
            format!("Failed to create data directory: {}", storage.data_dir.display())
        })?;

        let catalog_cache = Cache::open_file(storage.catalog_path())
            .with_context(|| format!("Failed to open {}", storage.catalog_path().display()))?;
        let mut catalog = Catalog::open(catalog_cache).context("Failed to load catalog")?;
        if storage.seed_catalog {
            seed::seed_if_empty(&mut catalog).context("Failed to seed catalog")?;
        }

        let carts_cache = Cache::open_file(storage.carts_path())
            .with_context(|| format!("Failed to open {}", storage.carts_path().display()))?;

        let auth_cache = Cache::open_file(storage.auth_path())
            .with_context(|| format!("Failed to open {}", storage.auth_path().display()))?;
        let auth = Authenticator::open(auth_cache, config.auth.token_ttl_secs)
            .context("Failed to load admin accounts")?;
        match &config.auth.admin_password {
            Some(password) => {
                auth.ensure_bootstrap_admin(
                    &config.auth.admin_username,
                    &config.auth.admin_email,
                    password,
                )
                .context("Failed to create bootstrap admin")?;
            }
            None => debug!("No bootstrap admin password configured"),
        }
        match auth.purge_expired_tokens() {
            Ok(0) => {}
            Ok(purged) => info!(purged, "Purged expired tokens"),
            Err(e) => warn!(error = %e, "Failed to purge expired tokens"),
        }

        let uploads_dir = storage.uploads_dir();
        let images = ImageStore::open(&uploads_dir).with_context(|| {
            format!("Failed to create uploads directory: {}", uploads_dir.display())
        })?;

        let limiter = RateLimiter::new(&config.rate_limit);

        Ok(Self {
            catalog: Arc::new(RwLock::new(catalog)),
            carts: Arc::new(CartRegistry::new(carts_cache)),
            auth: Arc::new(auth),
            images: Arc::new(images),
            limiter: Arc::new(limiter),
            config: Arc::new(config),
        })
    }
}

/// A loaded cart and when it was last touched.
struct OpenCart {
    store: CartStore,
    last_used: Instant,
    /// Set once the entry has left the registry map.
    retired: bool,
}

impl OpenCart {
    /// Nothing worth keeping in memory: no items and the drawer is closed.
    fn is_idle(&self) -> bool {
        self.store.items().is_empty() && !self.store.is_open()
    }
}

type SharedCart = Arc<Mutex<OpenCart>>;

/// Open carts, one per client session, all persisting into one cache.
///
/// Each cart has its own lock and every operation runs on the blocking
/// pool, since a write flushes the backing file. A cart leaves memory once
/// it is empty and closed, or after sitting idle past the eviction age.
pub struct CartRegistry {
    cache: Cache,
    carts: Mutex<HashMap<CartSessionId, SharedCart>>,
}

impl CartRegistry {
    pub fn new(cache: Cache) -> Self {
        Self {
            cache,
            carts: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` against the cart for `session`, loading it on first use.
    pub async fn with_cart<F, R>(self: &Arc<Self>, session: &CartSessionId, f: F) -> Result<R, JoinError>
    where
        F: FnOnce(&mut CartStore) -> R + Send + 'static,
        R: Send + 'static,
    {
        let registry = Arc::clone(self);
        let session = session.clone();
        tokio::task::spawn_blocking(move || registry.run(&session, f)).await
    }

    /// Run `f` against the cart for `session` without loading a cart that
    /// has nothing stored. Such a session sees an empty cart.
    pub async fn read_cart<F, R>(self: &Arc<Self>, session: &CartSessionId, f: F) -> Result<R, JoinError>
    where
        F: FnOnce(&CartStore) -> R + Send + 'static,
        R: Send + 'static,
    {
        let registry = Arc::clone(self);
        let session = session.clone();
        tokio::task::spawn_blocking(move || {
            if !registry.is_loaded(&session) && !registry.has_stored(&session) {
                return f(&CartStore::in_memory());
            }
            registry.run(&session, |cart| f(cart))
        })
        .await
    }

    /// Drop carts untouched for `max_idle`. Carts in use are kept.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut carts = self.lock_carts();
        let before = carts.len();
        carts.retain(|_, entry| match entry.try_lock() {
            Ok(mut open) => {
                if open.last_used.elapsed() < max_idle {
                    return true;
                }
                open.retired = true;
                false
            }
            Err(TryLockError::WouldBlock) => true,
            Err(TryLockError::Poisoned(poisoned)) => {
                poisoned.into_inner().retired = true;
                false
            }
        });
        before - carts.len()
    }

    /// Number of carts held in memory.
    pub fn len(&self) -> usize {
        self.lock_carts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn run<R>(&self, session: &CartSessionId, f: impl FnOnce(&mut CartStore) -> R) -> R {
        let entry = self.entry(session);
        let mut open = entry.lock().unwrap_or_else(PoisonError::into_inner);
        // Lost a race with eviction; fetch the replacement.
        if open.retired {
            drop(open);
            return self.run(session, f);
        }

        open.last_used = Instant::now();
        let result = f(&mut open.store);
        if open.is_idle() {
            open.retired = true;
            self.lock_carts().remove(session);
        }
        result
    }

    fn entry(&self, session: &CartSessionId) -> SharedCart {
        let mut carts = self.lock_carts();
        let entry = carts.entry(session.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(OpenCart {
                store: self.open_cart(session),
                last_used: Instant::now(),
                retired: false,
            }))
        });
        Arc::clone(entry)
    }

    fn is_loaded(&self, session: &CartSessionId) -> bool {
        self.lock_carts().contains_key(session)
    }

    fn has_stored(&self, session: &CartSessionId) -> bool {
        self.cache
            .exists(&CartStore::session_key(session))
            .unwrap_or(true)
    }

    fn lock_carts(&self) -> MutexGuard<'_, HashMap<CartSessionId, SharedCart>> {
        self.carts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_cart(&self, session: &CartSessionId) -> CartStore {
        let mut cart = CartStore::for_session(self.cache.clone(), session);
        let session = session.clone();
        cart.subscribe(move |event| match event {
            CartEvent::Updated {
                total_items,
                total_price,
            } => debug!(%session, total_items, %total_price, "Cart updated"),
            CartEvent::Toggled { is_open } => debug!(%session, is_open, "Cart toggled"),
        });
        cart
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebook_commerce::catalog::{Product, ProductDraft, SpecificationsDraft};
    use notebook_commerce::{Money, ProductId};

    fn session(raw: &str) -> CartSessionId {
        CartSessionId::parse(raw).unwrap()
    }

    fn laptop(id: u64) -> Product {
        ProductDraft {
            name: Some(format!("Laptop {id}")),
            brand: Some("Lenovo".to_string()),
            price: Some(Money::from_units(999)),
            category: Some("business".to_string()),
            specifications: Some(SpecificationsDraft {
                processor: Some("Intel Core i5-1335U".to_string()),
                ram: Some("16GB".to_string()),
                storage: Some("512GB SSD".to_string()),
                graphics: Some("Intel Iris Xe".to_string()),
                display: Some("14\" FHD".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
        .into_product(ProductId::new(id))
        .unwrap()
    }

    #[tokio::test]
    async fn test_reads_of_unknown_sessions_load_nothing() {
        let cache = Cache::memory();
        let registry = Arc::new(CartRegistry::new(cache.clone()));

        for n in 0..50 {
            let total = registry
                .read_cart(&session(&format!("visitor-{n}")), |cart| cart.total_items())
                .await
                .unwrap();
            assert_eq!(total, 0);
        }
        assert!(registry.is_empty());
        assert!(cache.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_emptied_cart_leaves_memory_and_storage() {
        let cache = Cache::memory();
        let registry = Arc::new(CartRegistry::new(cache.clone()));
        let buyer = session("buyer");
        let product = laptop(1);

        registry
            .with_cart(&buyer, move |cart| {
                cart.add_one(&product);
            })
            .await
            .unwrap();
        assert_eq!(registry.len(), 1);
        let items = registry.read_cart(&buyer, |cart| cart.total_items()).await.unwrap();
        assert_eq!(items, 1);

        registry.with_cart(&buyer, |cart| cart.clear()).await.unwrap();
        assert!(registry.is_empty());
        assert!(!cache.exists(&CartStore::session_key(&buyer)).unwrap());
    }

    #[tokio::test]
    async fn test_stored_cart_is_loaded_on_read() {
        let cache = Cache::memory();
        let buyer = session("returning");
        CartStore::for_session(cache.clone(), &buyer).add_item(&laptop(2), 3);

        let registry = Arc::new(CartRegistry::new(cache));
        let items = registry.read_cart(&buyer, |cart| cart.total_items()).await.unwrap();
        assert_eq!(items, 3);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_open_drawer_stays_until_closed() {
        let registry = Arc::new(CartRegistry::new(Cache::memory()));
        let browser = session("browser");

        registry.with_cart(&browser, |cart| cart.toggle()).await.unwrap();
        assert_eq!(registry.len(), 1);
        let open = registry.read_cart(&browser, |cart| cart.is_open()).await.unwrap();
        assert!(open);

        registry.with_cart(&browser, |cart| cart.toggle()).await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_evict_idle() {
        let cache = Cache::memory();
        let registry = Arc::new(CartRegistry::new(cache.clone()));
        let buyer = session("idle-buyer");
        let product = laptop(3);

        registry
            .with_cart(&buyer, move |cart| {
                cart.add_item(&product, 2);
            })
            .await
            .unwrap();

        assert_eq!(registry.evict_idle(Duration::from_secs(3600)), 0);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.evict_idle(Duration::ZERO), 1);
        assert!(registry.is_empty());

        // Evicted carts come back from storage.
        let items = registry.read_cart(&buyer, |cart| cart.total_items()).await.unwrap();
        assert_eq!(items, 2);
    }
}
