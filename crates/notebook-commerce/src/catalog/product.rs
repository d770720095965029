//! Product types.
//!
//! A [`Product`] is always valid: it can only be built from a
//! [`ProductDraft`] through [`ProductDraft::into_product`], and only changed
//! through [`ProductPatch::apply`], both of which check required fields and
//! ranges and refresh the derived discounted price.

use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default operating system when none is given.
pub const DEFAULT_OS: &str = "Windows 11";

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Gaming,
    Business,
    Ultrabook,
    Workstation,
    Budget,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 5] = [
        Category::Gaming,
        Category::Business,
        Category::Ultrabook,
        Category::Workstation,
        Category::Budget,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Gaming => "gaming",
            Category::Business => "business",
            Category::Ultrabook => "ultrabook",
            Category::Workstation => "workstation",
            Category::Budget => "budget",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gaming" => Some(Category::Gaming),
            "business" => Some(Category::Business),
            "ultrabook" => Some(Category::Ultrabook),
            "workstation" => Some(Category::Workstation),
            "budget" => Some(Category::Budget),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hardware specifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Specifications {
    pub processor: String,
    pub ram: String,
    pub storage: String,
    pub graphics: String,
    pub display: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    pub os: String,
}

/// A laptop in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Manufacturer.
    pub brand: String,
    /// Model line, when it differs from the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Current selling price.
    pub price: Money,
    /// Price before markdown, for showing savings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Money>,
    /// Discount percentage (0-100).
    #[serde(default)]
    pub discount: f64,
    /// `price` with `discount` taken off. Derived, never set directly.
    #[serde(default)]
    pub discounted_price: Money,
    /// Image URL (relative paths under `/uploads/` are managed uploads).
    #[serde(default)]
    pub image: String,
    /// Category.
    pub category: Category,
    /// Hardware specifications.
    pub specifications: Specifications,
    /// Marketing feature bullets.
    #[serde(default)]
    pub features: Vec<String>,
    /// Whether the product can currently be bought.
    pub in_stock: bool,
    /// Units on hand.
    #[serde(default)]
    pub stock_quantity: u32,
    /// Average rating (0-5).
    #[serde(default)]
    pub rating: f64,
    /// Number of reviews behind `rating`.
    #[serde(default)]
    pub review_count: u32,
    /// Featured on the recommendations shelf.
    #[serde(default)]
    pub is_recommended: bool,
    /// Listed in the storefront.
    pub is_active: bool,
    /// Free-form tags for search.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Product {
    /// Recompute `discounted_price` from `price` and `discount`.
    pub fn refresh_discounted_price(&mut self) {
        self.discounted_price = self.price.discounted(self.discount);
    }

    /// Whether the product is on sale.
    pub fn is_on_sale(&self) -> bool {
        self.discount > 0.0
            || self
                .original_price
                .map(|op| op > self.price)
                .unwrap_or(false)
    }

    /// Check every invariant. Used after patches and when loading
    /// persisted data.
    pub fn validate(&self) -> Result<(), CommerceError> {
        require_text("name", &self.name)?;
        require_text("brand", &self.brand)?;
        require_text("specifications.processor", &self.specifications.processor)?;
        require_text("specifications.ram", &self.specifications.ram)?;
        require_text("specifications.storage", &self.specifications.storage)?;
        require_text("specifications.graphics", &self.specifications.graphics)?;
        require_text("specifications.display", &self.specifications.display)?;

        if self.price.is_negative() {
            return Err(CommerceError::validation("price must not be negative"));
        }
        if let Some(original) = self.original_price {
            if original.is_negative() {
                return Err(CommerceError::validation("originalPrice must not be negative"));
            }
        }
        if !(0.0..=100.0).contains(&self.discount) {
            return Err(CommerceError::validation("discount must be between 0 and 100"));
        }
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(CommerceError::validation("rating must be between 0 and 5"));
        }
        Ok(())
    }
}

/// Whether `url` points at a file managed by the upload store.
pub fn is_uploaded_image(url: &str) -> bool {
    url.starts_with("/uploads/")
}

/// Partial specifications as submitted by a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecificationsDraft {
    pub processor: Option<String>,
    pub ram: Option<String>,
    pub storage: Option<String>,
    pub graphics: Option<String>,
    pub display: Option<String>,
    pub battery: Option<String>,
    pub weight: Option<String>,
    pub os: Option<String>,
}

impl SpecificationsDraft {
    fn into_specifications(self) -> Result<Specifications, CommerceError> {
        Ok(Specifications {
            processor: required("specifications.processor", self.processor)?,
            ram: required("specifications.ram", self.ram)?,
            storage: required("specifications.storage", self.storage)?,
            graphics: required("specifications.graphics", self.graphics)?,
            display: required("specifications.display", self.display)?,
            battery: trimmed(self.battery),
            weight: trimmed(self.weight),
            os: trimmed(self.os).unwrap_or_else(|| DEFAULT_OS.to_string()),
        })
    }

    fn merge_into(self, specs: &mut Specifications) {
        if let Some(v) = self.processor {
            specs.processor = v.trim().to_string();
        }
        if let Some(v) = self.ram {
            specs.ram = v.trim().to_string();
        }
        if let Some(v) = self.storage {
            specs.storage = v.trim().to_string();
        }
        if let Some(v) = self.graphics {
            specs.graphics = v.trim().to_string();
        }
        if let Some(v) = self.display {
            specs.display = v.trim().to_string();
        }
        if self.battery.is_some() {
            specs.battery = trimmed(self.battery);
        }
        if self.weight.is_some() {
            specs.weight = trimmed(self.weight);
        }
        if let Some(v) = trimmed(self.os) {
            specs.os = v;
        }
    }
}

/// A product as submitted for creation. Every field is optional so that
/// missing values surface as validation errors naming the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductDraft {
    pub id: Option<ProductId>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub price: Option<Money>,
    pub original_price: Option<Money>,
    pub discount: Option<f64>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub specifications: Option<SpecificationsDraft>,
    pub features: Option<Vec<String>>,
    pub in_stock: Option<bool>,
    pub stock_quantity: Option<u32>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub is_recommended: Option<bool>,
    pub is_active: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl ProductDraft {
    /// Validate and build the product under `id`.
    pub fn into_product(self, id: ProductId) -> Result<Product, CommerceError> {
        let name = required("name", self.name)?;
        let brand = required("brand", self.brand)?;
        let price = self
            .price
            .ok_or_else(|| CommerceError::validation("price is required"))?;
        let category = parse_category(
            self.category
                .ok_or_else(|| CommerceError::validation("category is required"))?,
        )?;
        // An uploaded file may fill this in after validation.
        let image = trimmed(self.image).unwrap_or_default();
        let specifications = self
            .specifications
            .unwrap_or_default()
            .into_specifications()?;

        let now = current_timestamp();
        let mut product = Product {
            id,
            name,
            brand,
            model: trimmed(self.model),
            price,
            original_price: self.original_price,
            discount: self.discount.unwrap_or(0.0),
            discounted_price: price,
            image,
            category,
            specifications,
            features: self.features.unwrap_or_default(),
            in_stock: self.in_stock.unwrap_or(true),
            stock_quantity: self.stock_quantity.unwrap_or(0),
            rating: self.rating.unwrap_or(0.0),
            review_count: self.review_count.unwrap_or(0),
            is_recommended: self.is_recommended.unwrap_or(false),
            is_active: self.is_active.unwrap_or(true),
            tags: self.tags.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        product.validate()?;
        product.refresh_discounted_price();
        Ok(product)
    }
}

/// A partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub price: Option<Money>,
    pub original_price: Option<Money>,
    pub discount: Option<f64>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub specifications: Option<SpecificationsDraft>,
    pub features: Option<Vec<String>>,
    pub in_stock: Option<bool>,
    pub stock_quantity: Option<u32>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub is_recommended: Option<bool>,
    pub is_active: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl ProductPatch {
    /// Apply to a copy of `product` and validate the result.
    ///
    /// The original is left untouched when validation fails.
    pub fn apply(self, product: &Product) -> Result<Product, CommerceError> {
        let mut updated = product.clone();

        if let Some(v) = self.name {
            updated.name = v.trim().to_string();
        }
        if let Some(v) = self.brand {
            updated.brand = v.trim().to_string();
        }
        if self.model.is_some() {
            updated.model = trimmed(self.model);
        }
        if let Some(v) = self.price {
            updated.price = v;
        }
        if self.original_price.is_some() {
            updated.original_price = self.original_price;
        }
        if let Some(v) = self.discount {
            updated.discount = v;
        }
        if let Some(v) = self.image {
            updated.image = v.trim().to_string();
        }
        if let Some(v) = self.category {
            updated.category = parse_category(v)?;
        }
        if let Some(specs) = self.specifications {
            specs.merge_into(&mut updated.specifications);
        }
        if let Some(v) = self.features {
            updated.features = v;
        }
        if let Some(v) = self.in_stock {
            updated.in_stock = v;
        }
        if let Some(v) = self.stock_quantity {
            updated.stock_quantity = v;
        }
        if let Some(v) = self.rating {
            updated.rating = v;
        }
        if let Some(v) = self.review_count {
            updated.review_count = v;
        }
        if let Some(v) = self.is_recommended {
            updated.is_recommended = v;
        }
        if let Some(v) = self.is_active {
            updated.is_active = v;
        }
        if let Some(v) = self.tags {
            updated.tags = v;
        }

        updated.validate()?;
        updated.refresh_discounted_price();
        updated.updated_at = current_timestamp();
        Ok(updated)
    }
}

fn parse_category(raw: String) -> Result<Category, CommerceError> {
    Category::from_str(&raw).ok_or_else(|| {
        CommerceError::validation(format!(
            "category must be one of: {}",
            Category::ALL.map(|c| c.as_str()).join(", ")
        ))
    })
}

fn required(field: &str, value: Option<String>) -> Result<String, CommerceError> {
    trimmed(value).ok_or_else(|| CommerceError::validation(format!("{} is required", field)))
}

fn require_text(field: &str, value: &str) -> Result<(), CommerceError> {
    if value.trim().is_empty() {
        return Err(CommerceError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn draft(name: &str, brand: &str, price: i64) -> ProductDraft {
        ProductDraft {
            name: Some(name.to_string()),
            brand: Some(brand.to_string()),
            price: Some(Money::from_units(price)),
            category: Some("business".to_string()),
            image: Some("/images/laptop.jpg".to_string()),
            specifications: Some(SpecificationsDraft {
                processor: Some("Intel Core i7-1365U".to_string()),
                ram: Some("16GB".to_string()),
                storage: Some("512GB SSD".to_string()),
                graphics: Some("Intel Iris Xe".to_string()),
                display: Some("14\" WUXGA".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_draft_into_product_defaults() {
        let product = draft("ThinkPad X1", "Lenovo", 1899)
            .into_product(ProductId::new(1))
            .unwrap();

        assert_eq!(product.id, ProductId::new(1));
        assert!(product.in_stock);
        assert!(product.is_active);
        assert_eq!(product.specifications.os, DEFAULT_OS);
        assert_eq!(product.discounted_price, product.price);
    }

    #[test]
    fn test_draft_missing_field_names_it() {
        let mut d = draft("ThinkPad X1", "Lenovo", 1899);
        d.brand = Some("   ".to_string());
        let err = d.into_product(ProductId::new(1)).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: brand is required");

        let mut d = draft("ThinkPad X1", "Lenovo", 1899);
        d.specifications = None;
        let err = d.into_product(ProductId::new(1)).unwrap_err();
        assert!(err.to_string().contains("specifications.processor"));
    }

    #[test]
    fn test_draft_rejects_unknown_category() {
        let mut d = draft("ThinkPad X1", "Lenovo", 1899);
        d.category = Some("tablet".to_string());
        let err = d.into_product(ProductId::new(1)).unwrap_err();
        assert!(err.to_string().contains("category must be one of"));
    }

    #[test]
    fn test_discounted_price_on_create() {
        let mut d = draft("Legion 5", "Lenovo", 1000);
        d.discount = Some(15.0);
        let product = d.into_product(ProductId::new(2)).unwrap();
        assert_eq!(product.discounted_price, Money::from_units(850));
        assert!(product.is_on_sale());
    }

    #[test]
    fn test_discount_out_of_range() {
        let mut d = draft("Legion 5", "Lenovo", 1000);
        d.discount = Some(120.0);
        assert!(d.into_product(ProductId::new(2)).is_err());
    }

    #[test]
    fn test_patch_recomputes_discount() {
        let product = draft("Legion 5", "Lenovo", 1000)
            .into_product(ProductId::new(2))
            .unwrap();

        let patch = ProductPatch {
            discount: Some(10.0),
            ..Default::default()
        };
        let updated = patch.apply(&product).unwrap();
        assert_eq!(updated.discounted_price, Money::from_units(900));

        let patch = ProductPatch {
            price: Some(Money::from_units(2000)),
            ..Default::default()
        };
        let updated = patch.apply(&updated).unwrap();
        assert_eq!(updated.discounted_price, Money::from_units(1800));
    }

    #[test]
    fn test_patch_merges_specifications() {
        let product = draft("Legion 5", "Lenovo", 1000)
            .into_product(ProductId::new(2))
            .unwrap();

        let patch = ProductPatch {
            specifications: Some(SpecificationsDraft {
                ram: Some("32GB DDR5".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let updated = patch.apply(&product).unwrap();
        assert_eq!(updated.specifications.ram, "32GB DDR5");
        assert_eq!(updated.specifications.processor, "Intel Core i7-1365U");
    }

    #[test]
    fn test_invalid_patch_leaves_original() {
        let product = draft("Legion 5", "Lenovo", 1000)
            .into_product(ProductId::new(2))
            .unwrap();
        let patch = ProductPatch {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.apply(&product).is_err());
        assert_eq!(product.name, "Legion 5");
    }

    #[test]
    fn test_product_json_is_camel_case() {
        let product = draft("ThinkPad X1", "Lenovo", 1899)
            .into_product(ProductId::new(1))
            .unwrap();
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["discountedPrice"], 1899);
        assert_eq!(json["inStock"], true);
        assert_eq!(json["category"], "business");
        assert_eq!(json["specifications"]["os"], DEFAULT_OS);
    }

    #[test]
    fn test_uploaded_image_detection() {
        assert!(is_uploaded_image("/uploads/images/image-1.png"));
        assert!(!is_uploaded_image("/images/thinkpad.jpg"));
    }
}
