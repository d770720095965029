//! The catalog: every product, keyed by id, persisted through a [`Cache`].

use std::collections::{BTreeMap, BTreeSet};

use notebook_cache::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{Category, Product, ProductDraft, ProductPatch};
use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::Money;
use crate::search::{CatalogQuery, SearchResults, TextQuery};

/// Storage key of the persisted product list.
pub const CATALOG_STORAGE_KEY: &str = "catalog:products";

/// Default size of the recommendations shelf.
pub const DEFAULT_RECOMMENDATIONS: usize = 6;

/// Default number of text search hits.
pub const DEFAULT_TEXT_RESULTS: usize = 10;

const MAX_SHELF: usize = 50;

/// Lowest and highest list price in the catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PriceRange {
    pub min: Money,
    pub max: Money,
}

/// Per-category aggregate for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub category: Category,
    pub count: usize,
    pub avg_price: Money,
}

/// Admin dashboard numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total_products: usize,
    pub in_stock_products: usize,
    pub out_of_stock_products: usize,
    pub total_categories: usize,
    pub total_brands: usize,
    pub categories: Vec<Category>,
    pub brands: Vec<String>,
    pub category_stats: Vec<CategoryStat>,
}

/// Product collection with write-through persistence.
///
/// Every mutation is written to the cache before it returns; if the write
/// fails the in-memory change is rolled back and the error returned.
pub struct Catalog {
    products: BTreeMap<ProductId, Product>,
    cache: Cache,
}

impl Catalog {
    /// Load the catalog persisted in `cache`, or start empty.
    ///
    /// Persisted products that no longer pass validation are skipped with a
    /// warning rather than failing the whole load.
    pub fn open(cache: Cache) -> Result<Self, CommerceError> {
        let stored: Vec<Product> = cache.get(CATALOG_STORAGE_KEY)?.unwrap_or_default();

        let mut products = BTreeMap::new();
        for mut product in stored {
            if let Err(e) = product.validate() {
                warn!(id = %product.id, error = %e, "skipping invalid stored product");
                continue;
            }
            product.refresh_discounted_price();
            products.insert(product.id, product);
        }

        info!(products = products.len(), "catalog loaded");
        Ok(Self { products, cache })
    }

    /// An empty catalog that is never written anywhere durable.
    pub fn in_memory() -> Self {
        Self {
            products: BTreeMap::new(),
            cache: Cache::memory(),
        }
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Look up a product.
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    /// Look up a product, failing with [`CommerceError::ProductNotFound`].
    pub fn require(&self, id: ProductId) -> Result<&Product, CommerceError> {
        self.get(id)
            .ok_or_else(|| CommerceError::ProductNotFound(id.to_string()))
    }

    /// All products in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Id a new product gets when none is supplied.
    pub fn next_id(&self) -> ProductId {
        self.products
            .keys()
            .next_back()
            .map(|id| id.next())
            .unwrap_or(ProductId::new(1))
    }

    /// Validate and add a product.
    pub fn create(&mut self, draft: ProductDraft) -> Result<Product, CommerceError> {
        let id = draft.id.unwrap_or_else(|| self.next_id());
        if self.products.contains_key(&id) {
            return Err(CommerceError::DuplicateProduct(id.to_string()));
        }

        let product = draft.into_product(id)?;
        self.commit(id, Some(product.clone()))?;
        debug!(id = %id, name = %product.name, "product created");
        Ok(product)
    }

    /// Apply a partial update.
    pub fn update(&mut self, id: ProductId, patch: ProductPatch) -> Result<Product, CommerceError> {
        let updated = patch.apply(self.require(id)?)?;
        self.commit(id, Some(updated.clone()))?;
        debug!(id = %id, "product updated");
        Ok(updated)
    }

    /// Remove a product, returning it.
    pub fn delete(&mut self, id: ProductId) -> Result<Product, CommerceError> {
        self.require(id)?;
        let removed = self
            .commit(id, None)?
            .ok_or_else(|| CommerceError::ProductNotFound(id.to_string()))?;
        debug!(id = %id, "product deleted");
        Ok(removed)
    }

    /// Flip availability. Marking a product out of stock zeroes its
    /// quantity on hand.
    pub fn toggle_stock(&mut self, id: ProductId) -> Result<Product, CommerceError> {
        let mut product = self.require(id)?.clone();
        product.in_stock = !product.in_stock;
        if !product.in_stock {
            product.stock_quantity = 0;
        }
        product.updated_at = current_timestamp();
        self.commit(id, Some(product.clone()))?;
        Ok(product)
    }

    /// Create every draft, skipping ones that fail validation.
    ///
    /// Returns the number of products created.
    pub fn seed(&mut self, drafts: impl IntoIterator<Item = ProductDraft>) -> usize {
        let mut created = 0;
        for draft in drafts {
            match self.create(draft) {
                Ok(_) => created += 1,
                Err(e) => warn!(error = %e, "skipping seed product"),
            }
        }
        created
    }

    /// Run a filtered, sorted, paginated query.
    pub fn query(&self, query: &CatalogQuery) -> SearchResults<Product> {
        query.apply(self.products.values())
    }

    /// Distinct brands, sorted.
    pub fn brands(&self) -> Vec<String> {
        self.products
            .values()
            .map(|p| p.brand.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct categories in use, sorted by name.
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self
            .products
            .values()
            .map(|p| p.category)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        categories.sort_by_key(|c| c.as_str());
        categories
    }

    /// Recommended products, best rated first.
    pub fn recommendations(&self, limit: usize) -> Vec<Product> {
        let mut recommended: Vec<&Product> =
            self.products.values().filter(|p| p.is_recommended).collect();
        recommended.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then(b.review_count.cmp(&a.review_count))
                .then(a.id.cmp(&b.id))
        });
        recommended
            .into_iter()
            .take(limit.clamp(1, MAX_SHELF))
            .cloned()
            .collect()
    }

    /// Lowest and highest price; zeros for an empty catalog.
    pub fn price_range(&self) -> PriceRange {
        let prices = self.products.values().map(|p| p.price);
        PriceRange {
            min: prices.clone().min().unwrap_or_default(),
            max: prices.max().unwrap_or_default(),
        }
    }

    /// Relevance-ranked text search over name, brand, processor and tags.
    pub fn search_text(&self, q: &str, limit: usize) -> Result<Vec<Product>, CommerceError> {
        let query = TextQuery::parse(q)
            .ok_or_else(|| CommerceError::validation("a search term is required"))?;
        Ok(query.run(self.products.values(), limit.clamp(1, MAX_SHELF)))
    }

    /// Dashboard numbers.
    pub fn stats(&self) -> CatalogStats {
        let total_products = self.products.len();
        let in_stock_products = self.products.values().filter(|p| p.in_stock).count();
        let categories = self.categories();
        let brands = self.brands();

        let category_stats = categories
            .iter()
            .map(|&category| {
                let prices: Vec<Money> = self
                    .products
                    .values()
                    .filter(|p| p.category == category)
                    .map(|p| p.price)
                    .collect();
                let total = Money::sum(prices.iter());
                CategoryStat {
                    category,
                    count: prices.len(),
                    avg_price: Money::new(total.amount_cents / prices.len().max(1) as i64),
                }
            })
            .collect();

        CatalogStats {
            total_products,
            in_stock_products,
            out_of_stock_products: total_products - in_stock_products,
            total_categories: categories.len(),
            total_brands: brands.len(),
            categories,
            brands,
            category_stats,
        }
    }

    /// Insert or remove `id`, persist, and roll back on failure.
    ///
    /// Returns the previous value.
    fn commit(
        &mut self,
        id: ProductId,
        next: Option<Product>,
    ) -> Result<Option<Product>, CommerceError> {
        let previous = match next {
            Some(product) => self.products.insert(id, product),
            None => self.products.remove(&id),
        };

        let snapshot: Vec<&Product> = self.products.values().collect();
        if let Err(e) = self.cache.set(CATALOG_STORAGE_KEY, &snapshot) {
            match previous.clone() {
                Some(product) => self.products.insert(id, product),
                None => self.products.remove(&id),
            };
            return Err(e.into());
        }

        Ok(previous)
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
