//! # Pricing
//!
//! Dual-currency pricing for peptide-shop.
//!
//! ## Fallback Chains
//!
//! Each mode resolves a price by walking an ordered list of optional
//! sources and taking the first one that is set:
//!
//! ```text
//! ┌────────────────┬──────────────────────────────────────────────┐
//! │ national       │ Discount ─► National ─► Base                 │
//! │ international  │ International ─► Base                        │
//! └────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Variations never offer a `Discount` source and use their own `price`
//! as `Base`, so one chain per mode serves both.

use crate::product::{Product, Variation};
use crate::store::{KeyValueStore, PRICING_MODE_KEY};
use parking_lot::RwLock;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Supported currencies (ISO 4217)
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    PHP,
    USD,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::PHP => "PHP",
            Currency::USD => "USD",
        }
    }

    /// Parse an ISO code. Only `PHP` and `USD` are accepted.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PHP" => Some(Currency::PHP),
            "USD" => Some(Currency::USD),
            _ => None,
        }
    }

    /// Display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::PHP => "₱",
            Currency::USD => "$",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pricing regime is active
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingMode {
    /// Local customers, priced in PHP
    #[default]
    National,
    /// Overseas customers, priced in USD
    International,
}

impl PricingMode {
    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMode::National => "national",
            PricingMode::International => "international",
        }
    }

    /// Parse the stored representation. Only the two exact literals are accepted.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "national" => Some(PricingMode::National),
            "international" => Some(PricingMode::International),
            _ => None,
        }
    }

    /// Currency prices are quoted in under this mode
    pub fn currency(&self) -> Currency {
        match self {
            PricingMode::National => Currency::PHP,
            PricingMode::International => Currency::USD,
        }
    }

    /// Display symbol for this mode's currency
    pub fn symbol(&self) -> &'static str {
        self.currency().symbol()
    }

    /// Ordered price sources, first match wins
    pub fn price_chain(&self) -> &'static [PriceSource] {
        match self {
            PricingMode::National => &[PriceSource::Discount, PriceSource::National, PriceSource::Base],
            PricingMode::International => &[PriceSource::International, PriceSource::Base],
        }
    }
}

impl std::fmt::Display for PricingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One link in a fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Discount,
    National,
    International,
    Base,
}

/// Anything that can be priced through a fallback chain
pub trait Priced {
    /// The price offered by `source`, if this item sets one
    fn price_from(&self, source: PriceSource) -> Option<Decimal>;

    /// Price used when nothing in the chain matches
    fn fallback_price(&self) -> Decimal;

    /// Resolve the price under `mode`
    fn price_for(&self, mode: PricingMode) -> Decimal {
        mode.price_chain()
            .iter()
            .find_map(|source| self.price_from(*source))
            .unwrap_or_else(|| self.fallback_price())
    }
}

impl Priced for Product {
    fn price_from(&self, source: PriceSource) -> Option<Decimal> {
        match source {
            // A zero discount price counts as unset.
            PriceSource::Discount => self
                .discount_price
                .filter(|price| self.discount_active && !price.is_zero()),
            PriceSource::National => self.national_price,
            PriceSource::International => self.international_price,
            PriceSource::Base => Some(self.base_price),
        }
    }

    fn fallback_price(&self) -> Decimal {
        self.base_price
    }
}

impl Priced for Variation {
    fn price_from(&self, source: PriceSource) -> Option<Decimal> {
        match source {
            PriceSource::Discount => None,
            PriceSource::National => self.national_price,
            PriceSource::International => self.international_price,
            PriceSource::Base => Some(self.price),
        }
    }

    fn fallback_price(&self) -> Decimal {
        self.price
    }
}

/// Price of a product under `mode`. Discounts apply in national mode only.
pub fn price_for_product(product: &Product, mode: PricingMode) -> Decimal {
    product.price_for(mode)
}

/// Price of a variation under `mode`. Variations never take a discount.
pub fn price_for_variation(variation: &Variation, mode: PricingMode) -> Decimal {
    variation.price_for(mode)
}

/// Price of a cart line: the variation's when one is chosen, else the product's
pub fn price_for_line(product: &Product, variation: Option<&Variation>, mode: PricingMode) -> Decimal {
    match variation {
        Some(v) => price_for_variation(v, mode),
        None => price_for_product(product, mode),
    }
}

/// Render `amount` with the mode's symbol and en-PH grouping,
/// e.g. `₱1,234.5`, `$2` or `₱-5`. The sign follows the symbol.
pub fn format(amount: Decimal, mode: PricingMode) -> String {
    let rounded = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = rounded.abs().to_string();
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits.as_str(), None),
    };

    let mut out = String::with_capacity(digits.len() + whole.len() / 3 + 4);
    out.push_str(mode.symbol());
    out.push_str(sign);
    out.push_str(&group_thousands(whole));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

fn group_thousands(whole: &str) -> String {
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Shared owner of the active pricing mode.
///
/// Clones share one value: a toggle made through any clone is seen by all.
/// Separate `PricingAuthority::new` calls are fully independent.
#[derive(Clone)]
pub struct PricingAuthority {
    mode: Arc<RwLock<PricingMode>>,
    store: Arc<dyn KeyValueStore>,
}

impl PricingAuthority {
    /// Restore the mode from `store`, defaulting to national
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let mode = match store.get(PRICING_MODE_KEY) {
            Ok(Some(saved)) => PricingMode::parse(&saved).unwrap_or_else(|| {
                warn!(value = %saved, "ignoring unrecognised stored pricing mode");
                PricingMode::default()
            }),
            Ok(None) => PricingMode::default(),
            Err(e) => {
                error!("Failed to read pricing mode: {}", e);
                PricingMode::default()
            }
        };

        Self {
            mode: Arc::new(RwLock::new(mode)),
            store,
        }
    }

    /// Active mode
    pub fn current_mode(&self) -> PricingMode {
        *self.mode.read()
    }

    /// Overwrite the mode. Cart contents are left alone.
    pub fn set_mode(&self, mode: PricingMode) {
        *self.mode.write() = mode;
        if let Err(e) = self.store.set(PRICING_MODE_KEY, mode.as_str()) {
            error!("Failed to persist pricing mode: {}", e);
        }
        info!(mode = %mode, "pricing mode set");
    }

    pub fn currency(&self) -> Currency {
        self.current_mode().currency()
    }

    pub fn symbol(&self) -> &'static str {
        self.current_mode().symbol()
    }

    pub fn is_national(&self) -> bool {
        self.current_mode() == PricingMode::National
    }

    pub fn is_international(&self) -> bool {
        self.current_mode() == PricingMode::International
    }

    pub fn price_for_product(&self, product: &Product, mode: PricingMode) -> Decimal {
        price_for_product(product, mode)
    }

    pub fn price_for_variation(&self, variation: &Variation, mode: PricingMode) -> Decimal {
        price_for_variation(variation, mode)
    }

    /// Format under the currently active mode
    pub fn format(&self, amount: Decimal) -> String {
        format(amount, self.current_mode())
    }
}

impl std::fmt::Debug for PricingAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingAuthority")
            .field("mode", &self.current_mode())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn product_p() -> Product {
        Product::new("p", "P", dec(100))
            .with_national_price(dec(90))
            .with_international_price(dec(2))
            .with_discount(dec(80))
            .with_stock(3)
    }

    #[test]
    fn test_discount_wins_in_national_mode() {
        assert_eq!(price_for_product(&product_p(), PricingMode::National), dec(80));
    }

    #[test]
    fn test_discount_ignored_in_international_mode() {
        assert_eq!(price_for_product(&product_p(), PricingMode::International), dec(2));
    }

    #[test]
    fn test_product_fallbacks() {
        let bare = Product::new("b", "B", dec(100));
        assert_eq!(price_for_product(&bare, PricingMode::National), dec(100));
        assert_eq!(price_for_product(&bare, PricingMode::International), dec(100));

        let national_only = Product::new("n", "N", dec(100)).with_national_price(dec(95));
        assert_eq!(price_for_product(&national_only, PricingMode::National), dec(95));
        assert_eq!(price_for_product(&national_only, PricingMode::International), dec(100));
    }

    #[test]
    fn test_inactive_or_zero_discount_is_skipped() {
        let mut inactive = product_p();
        inactive.discount_active = false;
        assert_eq!(price_for_product(&inactive, PricingMode::National), dec(90));

        let mut zero = product_p();
        zero.discount_price = Some(Decimal::ZERO);
        assert_eq!(price_for_product(&zero, PricingMode::National), dec(90));
    }

    #[test]
    fn test_variation_pricing_has_no_discount() {
        let variation = Variation::new("10mg", "10mg", dec(500)).with_international_price(dec(9));
        assert_eq!(price_for_variation(&variation, PricingMode::National), dec(500));
        assert_eq!(price_for_variation(&variation, PricingMode::International), dec(9));

        let national = variation.clone().with_national_price(dec(450));
        assert_eq!(price_for_variation(&national, PricingMode::National), dec(450));
    }

    #[test]
    fn test_mode_currency_and_symbol() {
        assert_eq!(PricingMode::National.currency(), Currency::PHP);
        assert_eq!(PricingMode::International.currency(), Currency::USD);
        assert_eq!(PricingMode::National.symbol(), "₱");
        assert_eq!(PricingMode::International.symbol(), "$");
    }

    #[test]
    fn test_parse_is_strict() {
        assert_eq!(PricingMode::parse("national"), Some(PricingMode::National));
        assert_eq!(PricingMode::parse("international"), Some(PricingMode::International));
        assert_eq!(PricingMode::parse("National"), None);
        assert_eq!(PricingMode::parse("usd"), None);
        assert_eq!(Currency::parse("USD"), Some(Currency::USD));
        assert_eq!(Currency::parse(""), None);
    }

    #[test]
    fn test_defaults_are_national_php() {
        assert_eq!(PricingMode::default(), PricingMode::National);
        assert_eq!(Currency::default(), Currency::PHP);
        assert_eq!(PricingMode::default().currency(), Currency::default());
    }

    #[test]
    fn test_format() {
        assert_eq!(format(dec(1500), PricingMode::National), "₱1,500");
        assert_eq!(format(Decimal::new(12345, 1), PricingMode::National), "₱1,234.5");
        assert_eq!(format(Decimal::new(2999, 2), PricingMode::International), "$29.99");
        assert_eq!(format(Decimal::new(1005, 3), PricingMode::International), "$1.01");
        assert_eq!(format(dec(1_234_567), PricingMode::International), "$1,234,567");
        assert_eq!(format(Decimal::new(2000, 2), PricingMode::National), "₱20");
        assert_eq!(format(Decimal::ZERO, PricingMode::National), "₱0");
    }

    #[test]
    fn test_format_negative_amounts() {
        assert_eq!(format(dec(-5), PricingMode::National), "₱-5");
        assert_eq!(format(Decimal::new(-123450, 2), PricingMode::International), "$-1,234.5");
        assert_eq!(format(Decimal::new(-1, 3), PricingMode::National), "₱0");
    }

    #[test]
    fn test_authority_defaults_to_national() {
        let authority = PricingAuthority::new(Arc::new(MemoryStore::new()));
        assert_eq!(authority.current_mode(), PricingMode::National);
        assert!(authority.is_national());
    }

    #[test]
    fn test_authority_ignores_invalid_stored_value() {
        let store = Arc::new(MemoryStore::new());
        store.set(PRICING_MODE_KEY, "euro").unwrap();

        let authority = PricingAuthority::new(store);
        assert_eq!(authority.current_mode(), PricingMode::National);
    }

    #[test]
    fn test_authority_persists_and_restores() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let authority = PricingAuthority::new(store.clone());
        authority.set_mode(PricingMode::International);

        assert_eq!(store.get(PRICING_MODE_KEY).unwrap().as_deref(), Some("international"));

        let restored = PricingAuthority::new(store);
        assert_eq!(restored.current_mode(), PricingMode::International);
        assert_eq!(restored.currency(), Currency::USD);
        assert_eq!(restored.symbol(), "$");
    }

    #[test]
    fn test_clones_share_mode_but_instances_do_not() {
        let first = PricingAuthority::new(Arc::new(MemoryStore::new()));
        let reader = first.clone();
        let other = PricingAuthority::new(Arc::new(MemoryStore::new()));

        first.set_mode(PricingMode::International);

        assert!(reader.is_international());
        assert!(other.is_national());
    }
}
