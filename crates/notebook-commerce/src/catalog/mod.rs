//! Product catalog module.
//!
//! Contains the product schema and the in-memory catalog that owns it.

mod product;
mod repository;

pub use product::{
    is_uploaded_image, Category, Product, ProductDraft, ProductPatch, Specifications,
    SpecificationsDraft, DEFAULT_OS,
};
pub use repository::{
    Catalog, CatalogStats, CategoryStat, PriceRange, CATALOG_STORAGE_KEY, DEFAULT_RECOMMENDATIONS,
    DEFAULT_TEXT_RESULTS,
};

#[cfg(test)]
pub(crate) use product::tests::draft as test_draft;
