//! Relevance-ranked free-text search.

use std::cmp::Ordering;

use crate::catalog::Product;

const NAME_WEIGHT: u32 = 3;
const BRAND_WEIGHT: u32 = 2;
const PROCESSOR_WEIGHT: u32 = 1;
const TAG_WEIGHT: u32 = 1;

/// A parsed search box query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    terms: Vec<String>,
}

impl TextQuery {
    /// Split `q` into lowercase terms. `None` when nothing searchable is left.
    pub fn parse(q: &str) -> Option<Self> {
        let terms: Vec<String> = q.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            None
        } else {
            Some(Self { terms })
        }
    }

    /// The lowercase terms.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Relevance of `product`; 0 means no term matched.
    pub fn score(&self, product: &Product) -> u32 {
        let name = product.name.to_lowercase();
        let brand = product.brand.to_lowercase();
        let processor = product.specifications.processor.to_lowercase();
        let tags: Vec<String> = product.tags.iter().map(|t| t.to_lowercase()).collect();

        self.terms
            .iter()
            .map(|term| {
                let mut score = 0;
                if name.contains(term.as_str()) {
                    score += NAME_WEIGHT;
                }
                if brand.contains(term.as_str()) {
                    score += BRAND_WEIGHT;
                }
                if processor.contains(term.as_str()) {
                    score += PROCESSOR_WEIGHT;
                }
                if tags.iter().any(|t| t.contains(term.as_str())) {
                    score += TAG_WEIGHT;
                }
                score
            })
            .sum()
    }

    /// Best `limit` matches, highest score first, then by rating.
    pub fn run<'a>(&self, products: impl Iterator<Item = &'a Product>, limit: usize) -> Vec<Product> {
        let mut scored: Vec<(u32, &Product)> = products
            .filter(|p| p.is_active)
            .map(|p| (self.score(p), p))
            .filter(|(score, _)| *score > 0)
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| {
            sb.cmp(sa)
                .then_with(|| b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal))
                .then_with(|| a.id.cmp(&b.id))
        });

        scored
            .into_iter()
            .take(limit)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{test_draft, Catalog};

    #[test]
    fn test_parse_blank() {
        assert!(TextQuery::parse("").is_none());
        assert!(TextQuery::parse("   \t ").is_none());
        let q = TextQuery::parse("  ThinkPad  X1 ").unwrap();
        assert_eq!(q.terms(), ["thinkpad", "x1"]);
    }

    #[test]
    fn test_name_outranks_processor() {
        let mut catalog = Catalog::in_memory();
        let mut by_cpu = test_draft("Legion 5 Pro", "Lenovo", 1299);
        by_cpu.specifications.as_mut().unwrap().processor = Some("AMD Ryzen 7".to_string());
        catalog.create(by_cpu).unwrap();
        catalog.create(test_draft("Ryzen Book", "Acme", 899)).unwrap();
        catalog.create(test_draft("XPS 13", "Dell", 999)).unwrap();

        let query = TextQuery::parse("ryzen").unwrap();
        let hits = query.run(catalog.iter(), 10);
        let names: Vec<&str> = hits.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ryzen Book", "Legion 5 Pro"]);
    }

    #[test]
    fn test_tags_and_limit() {
        let mut catalog = Catalog::in_memory();
        let mut tagged = test_draft("Aero 16", "Gigabyte", 2199);
        tagged.tags = Some(vec!["Creator".to_string()]);
        catalog.create(tagged).unwrap();
        catalog.create(test_draft("Creator Z16", "MSI", 2999)).unwrap();

        let query = TextQuery::parse("creator").unwrap();
        assert_eq!(query.run(catalog.iter(), 10).len(), 2);
        assert_eq!(query.run(catalog.iter(), 1)[0].name, "Creator Z16");
    }

    #[test]
    fn test_rating_breaks_ties() {
        let mut catalog = Catalog::in_memory();
        let mut low = test_draft("Swift 3", "Acer", 699);
        low.rating = Some(3.9);
        let mut high = test_draft("Swift Go", "Acer", 799);
        high.rating = Some(4.6);
        catalog.create(low).unwrap();
        catalog.create(high).unwrap();

        let hits = TextQuery::parse("swift").unwrap().run(catalog.iter(), 10);
        assert_eq!(hits[0].name, "Swift Go");
    }
}
