//! # Cart Ledger
//!
//! Ordered cart line items with stock-bounded quantities and snapshot prices.
//!
//! ## Operations
//!
//! ```text
//! ┌──────────────────┬───────────────────────────────────────────────────┐
//! │ add              │ merge into slot or append, clamped to stock       │
//! │ update_quantity  │ write in place, clamped; <= 0 removes             │
//! │ remove / clear   │ delete one line / everything                      │
//! │ reprice          │ recompute every price under a new mode            │
//! └──────────────────┴───────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation writes the whole cart to the store under
//! [`CART_KEY`](crate::store::CART_KEY). Stock problems never surface as
//! errors: each operation returns a [`CartOutcome`] carrying an optional
//! [`Advisory`] for the customer.

use crate::pricing::{price_for_line, Currency, PricingAuthority, PricingMode};
use crate::product::{Product, Variation};
use crate::store::{KeyValueStore, CART_KEY};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A line in the cart.
///
/// `price` and `currency` are frozen when the line is added or last
/// repriced; later catalog changes do not reach them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Product snapshot
    pub product: Product,

    /// Chosen variation snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<Variation>,

    /// Units in the cart (always positive)
    pub quantity: u32,

    /// Unit price under `pricing_mode`
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// Mode the price was captured under
    pub pricing_mode: PricingMode,

    /// Currency derived from `pricing_mode`
    pub currency: Currency,
}

impl CartLineItem {
    /// Snapshot a product (or one of its variations) under `mode`
    pub fn snapshot(
        product: &Product,
        variation: Option<&Variation>,
        quantity: u32,
        mode: PricingMode,
    ) -> Self {
        Self {
            product: product.clone(),
            variation: variation.cloned(),
            quantity,
            price: price_for_line(product, variation, mode),
            pricing_mode: mode,
            currency: mode.currency(),
        }
    }

    /// Calculate the total price for this line, saturating at `Decimal::MAX`
    pub fn total(&self) -> Decimal {
        self.price
            .checked_mul(Decimal::from(self.quantity))
            .unwrap_or(Decimal::MAX)
    }

    /// Stock of the referenced product or variation, as snapshotted
    pub fn available_stock(&self) -> u32 {
        self.product.available_stock(self.variation.as_ref())
    }

    /// Name used in notices
    pub fn display_name(&self) -> String {
        self.product.display_name(self.variation.as_ref())
    }

    /// Whether this line occupies the slot (product, variation, mode)
    pub fn is_slot(&self, product_id: &str, variation_id: Option<&str>, mode: PricingMode) -> bool {
        self.product.id == product_id
            && self.variation.as_ref().map(|v| v.id.as_str()) == variation_id
            && self.pricing_mode == mode
    }
}

/// Line item as found in storage. Carts saved before dual-currency pricing
/// have neither `pricing_mode` nor `currency`; empty or unknown values are
/// read as missing.
#[derive(Debug, Deserialize)]
struct StoredLineItem {
    product: Product,
    #[serde(default)]
    variation: Option<Variation>,
    quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    price: Decimal,
    #[serde(default, deserialize_with = "lenient_mode")]
    pricing_mode: Option<PricingMode>,
    #[serde(default, deserialize_with = "lenient_currency")]
    currency: Option<Currency>,
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.as_str().map(str::to_owned)))
}

fn lenient_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<PricingMode>, D::Error> {
    Ok(lenient_text(deserializer)?.as_deref().and_then(PricingMode::parse))
}

fn lenient_currency<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Currency>, D::Error> {
    Ok(lenient_text(deserializer)?.as_deref().and_then(Currency::parse))
}

impl StoredLineItem {
    fn needs_migration(&self) -> bool {
        self.pricing_mode.is_none() || self.currency.is_none()
    }

    /// Bring the line up to date, clamping its quantity to the snapshot
    /// stock. `None` when nothing sellable is left.
    fn migrate(self) -> Option<CartLineItem> {
        let stock = self.product.available_stock(self.variation.as_ref());
        let quantity = self.quantity.min(stock);
        if quantity == 0 {
            return None;
        }
        Some(CartLineItem {
            product: self.product,
            variation: self.variation,
            quantity,
            price: self.price,
            pricing_mode: self.pricing_mode.unwrap_or(PricingMode::National),
            currency: self.currency.unwrap_or(Currency::PHP),
        })
    }
}

/// Customer-facing notice attached to a cart outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// Nothing left to sell
    OutOfStock { item: String },
    /// The slot already holds every unit in stock
    AtMaximum { item: String, in_cart: u32 },
    /// An add was cut down to what stock allows
    StockLimited { item: String, requested: u32, added: u32 },
    /// A quantity update was capped at stock
    QuantityCapped { item: String, requested: u32, available: u32 },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::OutOfStock { item } => write!(f, "Sorry, {} is out of stock.", item),
            Advisory::AtMaximum { in_cart, .. } => write!(
                f,
                "Sorry, you already have the maximum available quantity ({}) in your cart.",
                in_cart
            ),
            Advisory::StockLimited { added, .. } => write!(
                f,
                "Only {} item(s) available in stock. Added {} to your cart.",
                added, added
            ),
            Advisory::QuantityCapped { available, .. } => {
                write!(f, "Only {} item(s) available in stock.", available)
            }
        }
    }
}

/// Result of a cart mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CartOutcome {
    /// Done exactly as asked
    Applied,
    /// Done, but with fewer units than asked
    PartiallyApplied { applied: u32, advisory: Advisory },
    /// Nothing changed
    Rejected { advisory: Advisory },
    /// Index out of range; nothing changed and nothing to tell the customer
    Ignored,
}

impl CartOutcome {
    /// Whether the cart changed
    pub fn is_applied(&self) -> bool {
        matches!(self, CartOutcome::Applied | CartOutcome::PartiallyApplied { .. })
    }

    pub fn advisory(&self) -> Option<&Advisory> {
        match self {
            CartOutcome::PartiallyApplied { advisory, .. } | CartOutcome::Rejected { advisory } => {
                Some(advisory)
            }
            CartOutcome::Applied | CartOutcome::Ignored => None,
        }
    }

    /// Notice text for the customer, if any
    pub fn message(&self) -> Option<String> {
        self.advisory().map(ToString::to_string)
    }
}

/// The shopping cart.
///
/// ## Invariants
/// - Lines are unique per slot at the time they are added (reprice may
///   leave two lines in one slot; they are not merged)
/// - No line is added or updated past the stock observed at call time
/// - Quantities are positive
pub struct CartLedger {
    items: Vec<CartLineItem>,
    pricing: PricingAuthority,
    store: Arc<dyn KeyValueStore>,
}

impl CartLedger {
    /// Create an empty cart without reading the store
    pub fn new(store: Arc<dyn KeyValueStore>, pricing: PricingAuthority) -> Self {
        Self {
            items: Vec::new(),
            pricing,
            store,
        }
    }

    /// Load the cart from the store, migrating legacy lines.
    ///
    /// Data that is not a JSON array yields an empty cart. Within the array,
    /// unreadable lines are dropped one by one, and quantities are clamped
    /// to snapshot stock (lines left at zero are dropped).
    pub fn restore(store: Arc<dyn KeyValueStore>, pricing: PricingAuthority) -> Self {
        let mut ledger = Self::new(store, pricing);

        let raw = match ledger.store.get(CART_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return ledger,
            Err(e) => {
                error!("Error loading cart from store: {}", e);
                return ledger;
            }
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Error parsing stored cart: {}", e);
                return ledger;
            }
        };

        let mut migrated = 0usize;
        let mut dropped = 0usize;
        let mut clamped = 0usize;
        for (index, entry) in entries.into_iter().enumerate() {
            let stored: StoredLineItem = match serde_json::from_value(entry) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(index, "dropping unreadable cart line: {}", e);
                    dropped += 1;
                    continue;
                }
            };

            if stored.needs_migration() {
                migrated += 1;
            }
            let stored_quantity = stored.quantity;
            match stored.migrate() {
                Some(line) => {
                    if line.quantity != stored_quantity {
                        clamped += 1;
                    }
                    ledger.items.push(line);
                }
                None => {
                    warn!(index, "dropping cart line with nothing in stock");
                    dropped += 1;
                }
            }
        }

        if migrated + dropped + clamped > 0 {
            info!(migrated, dropped, clamped, "rewrote stored cart");
            ledger.persist();
        }
        debug!(lines = ledger.items.len(), "cart restored");
        ledger
    }

    /// Lines in cart order
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&CartLineItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Authority consulted for new lines
    pub fn pricing(&self) -> &PricingAuthority {
        &self.pricing
    }

    /// Add one unit
    pub fn add_one(&mut self, product: &Product, variation: Option<&Variation>) -> CartOutcome {
        self.add(product, variation, 1)
    }

    /// Add `quantity` units of a product or one of its variations under the
    /// current pricing mode, merging into an existing slot.
    pub fn add(
        &mut self,
        product: &Product,
        variation: Option<&Variation>,
        quantity: u32,
    ) -> CartOutcome {
        if quantity == 0 {
            return CartOutcome::Ignored;
        }

        let available = product.available_stock(variation);
        let item = product.display_name(variation);

        if available == 0 {
            debug!(item = %item, "add rejected: out of stock");
            return CartOutcome::Rejected {
                advisory: Advisory::OutOfStock { item },
            };
        }

        let mode = self.pricing.current_mode();
        let variation_id = variation.map(|v| v.id.as_str());

        let outcome = match self
            .items
            .iter_mut()
            .find(|line| line.is_slot(&product.id, variation_id, mode))
        {
            Some(line) => {
                let current = line.quantity;
                if current.saturating_add(quantity) > available {
                    let remaining = available.saturating_sub(current);
                    if remaining == 0 {
                        debug!(item = %item, current, "add rejected: already at maximum");
                        return CartOutcome::Rejected {
                            advisory: Advisory::AtMaximum { item, in_cart: current },
                        };
                    }
                    line.quantity += remaining;
                    CartOutcome::PartiallyApplied {
                        applied: remaining,
                        advisory: Advisory::StockLimited {
                            item,
                            requested: quantity,
                            added: remaining,
                        },
                    }
                } else {
                    line.quantity += quantity;
                    CartOutcome::Applied
                }
            }
            None => {
                let added = quantity.min(available);
                self.items
                    .push(CartLineItem::snapshot(product, variation, added, mode));
                if added < quantity {
                    CartOutcome::PartiallyApplied {
                        applied: added,
                        advisory: Advisory::StockLimited {
                            item,
                            requested: quantity,
                            added,
                        },
                    }
                } else {
                    CartOutcome::Applied
                }
            }
        };

        debug!(product_id = %product.id, variation_id = ?variation_id, mode = %mode, ?outcome, "add");
        self.persist();
        outcome
    }

    /// Set the quantity of the line at `index`; `quantity <= 0` removes it
    pub fn update_quantity(&mut self, index: usize, quantity: i64) -> CartOutcome {
        if quantity <= 0 {
            return self.remove(index);
        }

        let Some(line) = self.items.get_mut(index) else {
            return CartOutcome::Ignored;
        };

        let requested = u32::try_from(quantity).unwrap_or(u32::MAX);
        let available = line.available_stock();
        let outcome = if requested > available {
            line.quantity = available;
            CartOutcome::PartiallyApplied {
                applied: available,
                advisory: Advisory::QuantityCapped {
                    item: line.display_name(),
                    requested,
                    available,
                },
            }
        } else {
            line.quantity = requested;
            CartOutcome::Applied
        };

        // A line whose stock dropped to zero cannot stay in the cart.
        if line.quantity == 0 {
            self.items.remove(index);
        }

        self.persist();
        outcome
    }

    /// Remove the line at `index`; later lines shift down
    pub fn remove(&mut self, index: usize) -> CartOutcome {
        if index >= self.items.len() {
            return CartOutcome::Ignored;
        }
        let removed = self.items.remove(index);
        debug!(product_id = %removed.product.id, index, "removed cart line");
        self.persist();
        CartOutcome::Applied
    }

    /// Empty the cart and erase it from the store
    pub fn clear(&mut self) {
        self.items.clear();
        if let Err(e) = self.store.remove(CART_KEY) {
            error!("Failed to erase stored cart: {}", e);
        }
        info!("cart cleared");
    }

    /// Sum of `price × quantity` over all lines, saturating at `Decimal::MAX`
    pub fn total_price(&self) -> Decimal {
        self.items.iter().fold(Decimal::ZERO, |sum, line| {
            sum.checked_add(line.total()).unwrap_or(Decimal::MAX)
        })
    }

    /// Sum of quantities over all lines, saturating at `u32::MAX`
    pub fn total_item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, line| count.saturating_add(line.quantity))
    }

    /// Recompute every line's price under `mode` from its product or
    /// variation snapshot. Lines keep their positions and are not merged.
    pub fn reprice(&mut self, mode: PricingMode) {
        for line in &mut self.items {
            line.price = price_for_line(&line.product, line.variation.as_ref(), mode);
            line.pricing_mode = mode;
            line.currency = mode.currency();
        }
        info!(mode = %mode, lines = self.items.len(), "cart repriced");
        self.persist();
    }

    /// Mode of the first line, or the authority's mode for an empty cart
    pub fn current_cart_mode(&self) -> PricingMode {
        self.items
            .first()
            .map(|line| line.pricing_mode)
            .unwrap_or_else(|| self.pricing.current_mode())
    }

    /// Format an amount under the cart's mode
    pub fn format(&self, amount: Decimal) -> String {
        crate::pricing::format(amount, self.current_cart_mode())
    }

    fn persist(&self) {
        let json = match serde_json::to_string(&self.items) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize cart: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(CART_KEY, &json) {
            warn!("Failed to persist cart: {}", e);
        }
    }
}

impl fmt::Debug for CartLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartLedger")
            .field("items", &self.items)
            .field("pricing", &self.pricing)
            .finish_non_exhaustive()
    }
}
