//! Search module.
//!
//! Contains the catalog query (filters, sort, pagination), result pages,
//! and relevance-ranked text search.

mod query;
mod results;
mod text;

pub use query::{CatalogQuery, SortField, SortOrder, DEFAULT_LIMIT, MAX_LIMIT};
pub use results::{Pagination, SearchResults};
pub use text::TextQuery;
