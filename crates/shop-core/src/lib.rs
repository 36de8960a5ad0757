//! # shop-core
//!
//! Cart and dual-currency pricing core for the peptide-shop storefront.
//!
//! This crate provides:
//! - `PricingMode` and `PricingAuthority` for national (PHP) / international (USD) pricing
//! - `Product`, `Variation` and `ProductCatalog` for the catalog read model
//! - `CartLedger`, `CartLineItem` and `CartOutcome` for the cart
//! - `ShopSession` for the confirmed currency-switch flow
//! - `KeyValueStore` with in-memory and file-backed implementations
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{MemoryStore, PricingMode, Preconfirmed, Product, ShopSession};
//! use std::sync::Arc;
//!
//! let mut session = ShopSession::restore(Arc::new(MemoryStore::new()));
//!
//! // Add products; stock problems come back as advisories, not errors
//! let outcome = session.cart_mut().add(&product, None, 2);
//! if let Some(notice) = outcome.message() {
//!     show_toast(&notice);
//! }
//!
//! // Switch currency once the customer has agreed
//! session.switch_pricing_mode(PricingMode::International, &Preconfirmed(true));
//! ```

pub mod cart;
pub mod error;
pub mod pricing;
pub mod product;
pub mod session;
pub mod store;

// Re-exports for convenience
pub use cart::{Advisory, CartLedger, CartLineItem, CartOutcome};
pub use error::{ShopError, ShopResult};
pub use pricing::{
    format, price_for_line, price_for_product, price_for_variation, Currency, PriceSource,
    Priced, PricingAuthority, PricingMode,
};
pub use product::{Product, ProductCatalog, Variation, ALL_CATEGORIES};
pub use session::{ConfirmPrompt, ModeSwitch, Preconfirmed, ShopSession, SWITCH_CONFIRMATION};
pub use store::{FileStore, KeyValueStore, MemoryStore, CART_KEY, PRICING_MODE_KEY};
