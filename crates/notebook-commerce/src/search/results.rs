//! Search results and pagination.

use serde::{Deserialize, Serialize};

/// Pagination info, in the shape the storefront client reads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page (1-indexed).
    pub current_page: i64,
    /// Total number of pages; 0 when nothing matched.
    pub total_pages: i64,
    /// Total number of matching items.
    pub total_items: i64,
    /// Items per page.
    pub items_per_page: i64,
    /// Whether there's a next page.
    pub has_next_page: bool,
    /// Whether there's a previous page.
    pub has_prev_page: bool,
}

impl Pagination {
    /// Create pagination info.
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = (total + per_page - 1) / per_page;

        Self {
            current_page: page,
            total_pages,
            total_items: total,
            items_per_page: per_page,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }

    /// Get the offset of the first item on this page.
    pub fn offset(&self) -> i64 {
        (self.current_page - 1) * self.items_per_page
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults<T> {
    /// The result items.
    pub data: Vec<T>,
    /// Pagination info.
    pub pagination: Pagination,
}

impl<T> SearchResults<T> {
    /// Create new search results.
    pub fn new(data: Vec<T>, pagination: Pagination) -> Self {
        Self { data, pagination }
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get number of items in this page.
    pub fn len(&self) -> usize {
        self.data.len()
    }
}
