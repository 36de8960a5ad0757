//! # Product Types
//!
//! Catalog read model for peptide-shop.
//! Products are loaded from `config/products.toml`.
//!
//! Prices here carry no currency of their own: which field applies, and in
//! which currency, is decided by the active [`PricingMode`](crate::pricing::PricingMode).

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// A purchasable variant of a product (e.g. a vial size)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    /// Variation identifier, unique within its product
    pub id: String,

    /// Owning product id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,

    /// Display name (e.g. "10mg")
    pub name: String,

    /// Own price, used when no mode-specific override is set
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// Override for national (PHP) pricing
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub national_price: Option<Decimal>,

    /// Override for international (USD) pricing
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub international_price: Option<Decimal>,

    /// Units on hand, tracked independently of the product
    #[serde(default)]
    pub stock_quantity: u32,
}

impl Variation {
    /// Create a variation with only its own price set
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            product_id: None,
            name: name.into(),
            price,
            national_price: None,
            international_price: None,
            stock_quantity: 0,
        }
    }

    /// Builder: set national price override
    pub fn with_national_price(mut self, price: Decimal) -> Self {
        self.national_price = Some(price);
        self
    }

    /// Builder: set international price override
    pub fn with_international_price(mut self, price: Decimal) -> Self {
        self.international_price = Some(price);
        self
    }

    /// Builder: set stock
    pub fn with_stock(mut self, quantity: u32) -> Self {
        self.stock_quantity = quantity;
        self
    }
}

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Unique product identifier (e.g., "bpc-157")
    pub id: String,

    /// Display name
    pub name: String,

    /// Short description
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    /// Category id used for storefront filtering
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,

    /// Base price, the last fallback in every pricing mode
    #[serde(with = "rust_decimal::serde::float")]
    pub base_price: Decimal,

    /// Explicit national (PHP) price
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub national_price: Option<Decimal>,

    /// Explicit international (USD) price
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub international_price: Option<Decimal>,

    /// Whether the discount price is in effect
    #[serde(default)]
    pub discount_active: bool,

    /// Discounted national price
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_price: Option<Decimal>,

    /// Units on hand (ignored when a variation is chosen)
    #[serde(default)]
    pub stock_quantity: u32,

    /// Whether this product is listed
    #[serde(default = "default_true")]
    pub available: bool,

    /// Optional image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Variations, each with its own price and stock
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<Variation>,
}

fn default_true() -> bool {
    true
}

/// Saved carts may hold `null` where the catalog now has a plain string.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Product {
    /// Create a product with only a base price
    pub fn new(id: impl Into<String>, name: impl Into<String>, base_price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category: String::new(),
            base_price,
            national_price: None,
            international_price: None,
            discount_active: false,
            discount_price: None,
            stock_quantity: 0,
            available: true,
            image_url: None,
            variations: Vec::new(),
        }
    }

    /// Builder: set category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Builder: set national price
    pub fn with_national_price(mut self, price: Decimal) -> Self {
        self.national_price = Some(price);
        self
    }

    /// Builder: set international price
    pub fn with_international_price(mut self, price: Decimal) -> Self {
        self.international_price = Some(price);
        self
    }

    /// Builder: activate a discount price
    pub fn with_discount(mut self, price: Decimal) -> Self {
        self.discount_active = true;
        self.discount_price = Some(price);
        self
    }

    /// Builder: set stock
    pub fn with_stock(mut self, quantity: u32) -> Self {
        self.stock_quantity = quantity;
        self
    }

    /// Builder: attach a variation
    pub fn with_variation(mut self, variation: Variation) -> Self {
        let mut variation = variation;
        variation.product_id = Some(self.id.clone());
        self.variations.push(variation);
        self
    }

    /// Find a variation by id
    pub fn variation(&self, id: &str) -> Option<&Variation> {
        self.variations.iter().find(|v| v.id == id)
    }

    /// Stock that bounds a cart line for this product or one of its variations
    pub fn available_stock(&self, variation: Option<&Variation>) -> u32 {
        variation.map_or(self.stock_quantity, |v| v.stock_quantity)
    }

    /// Name shown in stock notices ("BPC-157 10mg")
    pub fn display_name(&self, variation: Option<&Variation>) -> String {
        match variation {
            Some(v) => format!("{} {}", self.name, v.name),
            None => self.name.clone(),
        }
    }
}

/// Category id that matches every product
pub const ALL_CATEGORIES: &str = "all";

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    #[serde(default)]
    pub products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    /// Add a product to the catalog
    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    /// Find a product by ID
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Get all listed products
    pub fn available_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.available)
    }

    /// Listed products in a category; `"all"` matches everything
    pub fn in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Product> + 'a {
        self.available_products()
            .filter(move |p| category == ALL_CATEGORIES || p.category == category)
    }

    /// Distinct categories in catalog order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for product in self.available_products() {
            if !product.category.is_empty() && !seen.contains(&product.category.as_str()) {
                seen.push(product.category.as_str());
            }
        }
        seen
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
