//! Catalog query: filters, sort and pagination.

use std::cmp::Ordering;

use crate::catalog::Product;
use crate::money::Money;
use crate::search::{Pagination, SearchResults};
use serde::{Deserialize, Serialize};

/// Page size when none is requested.
pub const DEFAULT_LIMIT: i64 = 20;

/// Largest page size a client may request.
pub const MAX_LIMIT: i64 = 100;

/// Field to sort results by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Name,
    Brand,
    Price,
    Rating,
    ReviewCount,
    Discount,
    StockQuantity,
    CreatedAt,
    Id,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// A catalog query as accepted on `GET /api/laptops`.
///
/// Blank strings are treated as absent, so `?brand=` matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogQuery {
    /// Case-insensitive substring of the brand.
    pub brand: Option<String>,
    /// Exact category name.
    pub category: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<f64>,
    /// Inclusive upper price bound.
    pub max_price: Option<f64>,
    /// Case-insensitive substring of name, brand or processor.
    pub search: Option<String>,
    /// Sort field (default: name).
    pub sort_by: Option<SortField>,
    /// Sort direction (default: ascending).
    pub sort_order: Option<SortOrder>,
    /// Page number, 1-indexed.
    pub page: Option<i64>,
    /// Items per page.
    pub limit: Option<i64>,
    /// Restrict to products that are (or are not) in stock.
    pub in_stock: Option<bool>,
}

impl CatalogQuery {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by brand substring.
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    /// Filter by category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Filter by inclusive price range.
    pub fn with_price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Set the free-text filter.
    pub fn with_search(mut self, q: impl Into<String>) -> Self {
        self.search = Some(q.into());
        self
    }

    /// Filter by stock state.
    pub fn with_in_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = Some(in_stock);
        self
    }

    /// Set sort option.
    pub fn with_sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = Some(field);
        self.sort_order = Some(order);
        self
    }

    /// Set sort option only when the client did not choose one.
    pub fn with_default_sort(mut self, field: SortField, order: SortOrder) -> Self {
        if self.sort_by.is_none() {
            self.sort_by = Some(field);
            self.sort_order = Some(self.sort_order.unwrap_or(order));
        }
        self
    }

    /// Set pagination.
    pub fn with_pagination(mut self, page: i64, limit: i64) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    /// Effective page number (at least 1).
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Effective page size (1..=MAX_LIMIT).
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Number of matching items skipped before this page.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    /// Whether `product` passes every filter.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(brand) = non_blank(&self.brand) {
            if !contains_ci(&product.brand, brand) {
                return false;
            }
        }

        if let Some(category) = non_blank(&self.category) {
            if product.category.as_str() != category.trim() {
                return false;
            }
        }

        if let Some(min) = self.min_price {
            if product.price < Money::from_decimal(min) {
                return false;
            }
        }

        if let Some(max) = self.max_price {
            if product.price > Money::from_decimal(max) {
                return false;
            }
        }

        if let Some(q) = non_blank(&self.search) {
            let hit = contains_ci(&product.name, q)
                || contains_ci(&product.brand, q)
                || contains_ci(&product.specifications.processor, q);
            if !hit {
                return false;
            }
        }

        if let Some(in_stock) = self.in_stock {
            if product.in_stock != in_stock {
                return false;
            }
        }

        true
    }

    /// Ordering of two products under this query's sort. Ties fall back to
    /// id so pages are stable.
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let by_field = match self.sort_by.unwrap_or_default() {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Brand => a.brand.to_lowercase().cmp(&b.brand.to_lowercase()),
            SortField::Price => a.price.cmp(&b.price),
            SortField::Rating => a.rating.total_cmp(&b.rating),
            SortField::ReviewCount => a.review_count.cmp(&b.review_count),
            SortField::Discount => a.discount.total_cmp(&b.discount),
            SortField::StockQuantity => a.stock_quantity.cmp(&b.stock_quantity),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Id => Ordering::Equal,
        };
        let ordering = by_field.then(a.id.cmp(&b.id));

        match self.sort_order.unwrap_or_default() {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    /// Filter, sort and paginate `products`.
    pub fn apply<'a>(&self, products: impl Iterator<Item = &'a Product>) -> SearchResults<Product> {
        let mut matching: Vec<&Product> = products.filter(|p| self.matches(p)).collect();
        matching.sort_by(|a, b| self.compare(a, b));

        let total = matching.len() as i64;
        let data = matching
            .into_iter()
            .skip(self.offset().max(0) as usize)
            .take(self.limit() as usize)
            .cloned()
            .collect();

        SearchResults::new(data, Pagination::new(self.page(), self.limit(), total))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack
        .to_lowercase()
        .contains(&needle.trim().to_lowercase())
}
