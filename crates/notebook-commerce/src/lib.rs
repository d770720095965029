//! Domain types and logic for the notebook store.
//!
//! - **Catalog**: laptops, their specifications, and the persisted catalog
//! - **Cart**: reducer-driven cart state, persisted per session, with pricing
//! - **Search**: filtered, sorted, paginated queries and ranked text search
//!
//! # Example
//!
//! ```rust
//! use notebook_commerce::prelude::*;
//!
//! let mut catalog = Catalog::in_memory();
//! let laptop = catalog
//!     .create(ProductDraft {
//!         name: Some("ThinkPad X1 Carbon".to_string()),
//!         brand: Some("Lenovo".to_string()),
//!         price: Some(Money::from_units(1899)),
//!         category: Some("business".to_string()),
//!         image: Some("/images/x1.jpg".to_string()),
//!         specifications: Some(SpecificationsDraft {
//!             processor: Some("Intel Core i7-1365U".to_string()),
//!             ram: Some("16GB".to_string()),
//!             storage: Some("512GB SSD".to_string()),
//!             graphics: Some("Intel Iris Xe".to_string()),
//!             display: Some("14\" WUXGA".to_string()),
//!             ..Default::default()
//!         }),
//!         ..Default::default()
//!     })
//!     .unwrap();
//!
//! let mut cart = CartStore::in_memory();
//! cart.add_item(&laptop, 2);
//! assert_eq!(cart.total_price(), Money::from_units(3798));
//!
//! let page = catalog.query(&CatalogQuery::new().with_brand("lenovo"));
//! assert_eq!(page.pagination.total_items, 1);
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod catalog;
pub mod search;

pub use error::CommerceError;
pub use ids::*;
pub use money::Money;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::Money;

    // Catalog
    pub use crate::catalog::{
        Catalog, CatalogStats, Category, PriceRange, Product, ProductDraft, ProductPatch,
        Specifications, SpecificationsDraft,
    };

    // Cart
    pub use crate::cart::{
        validate_for_cart, CartAction, CartEvent, CartItem, CartPricing, CartState, CartStore,
        PricingPolicy, MAX_QUANTITY_PER_ITEM,
    };

    // Search
    pub use crate::search::{CatalogQuery, Pagination, SearchResults, SortField, SortOrder, TextQuery};
}
