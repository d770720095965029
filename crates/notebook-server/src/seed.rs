//! Bundled starter catalog.

use notebook_commerce::catalog::{Catalog, ProductDraft};
use notebook_commerce::CommerceError;
use tracing::info;

const SEED_LAPTOPS: &str = include_str!("../data/laptops.json");

/// Parse the bundled laptops.
pub fn seed_drafts() -> Result<Vec<ProductDraft>, CommerceError> {
    serde_json::from_str(SEED_LAPTOPS).map_err(|e| CommerceError::SerializationError(e.to_string()))
}

/// Fill an empty catalog with the bundled laptops. Returns how many were
/// created; a catalog that already has products is left alone.
pub fn seed_if_empty(catalog: &mut Catalog) -> Result<usize, CommerceError> {
    if !catalog.is_empty() {
        return Ok(0);
    }
    let created = catalog.seed(seed_drafts()?);
    info!(created, "Seeded catalog");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebook_commerce::search::CatalogQuery;

    #[test]
    fn test_bundled_data_is_valid() {
        let drafts = seed_drafts().unwrap();
        let mut catalog = Catalog::in_memory();
        assert_eq!(catalog.seed(drafts.clone()), drafts.len());
        assert_eq!(catalog.len(), 6);
    }

    #[test]
    fn test_seed_only_when_empty() {
        let mut catalog = Catalog::in_memory();
        assert_eq!(seed_if_empty(&mut catalog).unwrap(), 6);
        assert_eq!(seed_if_empty(&mut catalog).unwrap(), 0);
        assert_eq!(catalog.len(), 6);
    }

    #[test]
    fn test_seeded_price_range_query() {
        let mut catalog = Catalog::in_memory();
        seed_if_empty(&mut catalog).unwrap();

        let results = catalog.query(&CatalogQuery::new().with_price_range(Some(1000.0), Some(1899.0)));
        assert!(!results.is_empty());
        assert!(results.data.iter().all(|p| {
            p.price.amount_cents >= 100_000 && p.price.amount_cents <= 189_900
        }));
    }
}
