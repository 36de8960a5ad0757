//! # Shop Session
//!
//! One customer's storefront state: a store, the pricing authority reading
//! from it, and the cart ledger writing to it.
//!
//! ## Currency Switch
//!
//! ```text
//! switch_pricing_mode(new)
//!   │
//!   ├── new == current ─────────────► Unchanged
//!   ├── cart empty ─────────────────► set mode ─► Switched
//!   └── cart has items ─► prompt ─┬─► yes ─► reprice cart, set mode ─► Switched
//!                                 └─► no ──────────────────────────► Declined
//! ```

use crate::cart::CartLedger;
use crate::pricing::{PricingAuthority, PricingMode};
use crate::store::KeyValueStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// Question put to the customer before repricing a non-empty cart
pub const SWITCH_CONFIRMATION: &str =
    "Changing currency will update prices in your cart. Continue?";

/// Yes/no prompt capability supplied by the presentation layer
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Prompt with a fixed answer, for callers that asked the customer up front
#[derive(Debug, Clone, Copy)]
pub struct Preconfirmed(pub bool);

impl ConfirmPrompt for Preconfirmed {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}

/// Result of a currency switch request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModeSwitch {
    /// Already in the requested mode
    Unchanged,
    /// Mode changed; `repriced` cart lines were updated
    Switched { repriced: usize },
    /// Customer said no; mode and cart untouched
    Declined,
}

/// A customer's pricing mode and cart over one store
pub struct ShopSession {
    store: Arc<dyn KeyValueStore>,
    pricing: PricingAuthority,
    cart: CartLedger,
}

impl ShopSession {
    /// Restore pricing mode and cart from `store`
    pub fn restore(store: Arc<dyn KeyValueStore>) -> Self {
        let pricing = PricingAuthority::new(store.clone());
        let cart = CartLedger::restore(store.clone(), pricing.clone());
        Self {
            store,
            pricing,
            cart,
        }
    }

    pub fn pricing(&self) -> &PricingAuthority {
        &self.pricing
    }

    pub fn cart(&self) -> &CartLedger {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut CartLedger {
        &mut self.cart
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Toggle the pricing mode, repricing the cart when the customer agrees
    #[instrument(skip(self, prompt))]
    pub fn switch_pricing_mode(
        &mut self,
        new_mode: PricingMode,
        prompt: &impl ConfirmPrompt,
    ) -> ModeSwitch {
        if new_mode == self.pricing.current_mode() {
            return ModeSwitch::Unchanged;
        }

        let repriced = self.cart.len();
        if !self.cart.is_empty() {
            if !prompt.confirm(SWITCH_CONFIRMATION) {
                info!(to = %new_mode, "currency switch declined");
                return ModeSwitch::Declined;
            }
            self.cart.reprice(new_mode);
        }

        self.pricing.set_mode(new_mode);
        ModeSwitch::Switched { repriced }
    }
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("pricing", &self.pricing)
            .field("cart", &self.cart)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::Currency;
    use crate::product::Product;
    use crate::store::{MemoryStore, PRICING_MODE_KEY};
    use rust_decimal::Decimal;
    use std::cell::Cell;

    fn session() -> ShopSession {
        ShopSession::restore(Arc::new(MemoryStore::new()))
    }

    fn product() -> Product {
        Product::new("r", "R", Decimal::from(100))
            .with_international_price(Decimal::from(2))
            .with_stock(5)
    }

    #[test]
    fn test_same_mode_is_unchanged() {
        let mut session = session();
        let asked = Cell::new(false);
        let prompt = |_: &str| {
            asked.set(true);
            true
        };

        assert_eq!(
            session.switch_pricing_mode(PricingMode::National, &prompt),
            ModeSwitch::Unchanged
        );
        assert!(!asked.get());
    }

    #[test]
    fn test_empty_cart_switches_without_prompt() {
        let mut session = session();
        let prompt = |_: &str| -> bool { panic!("should not prompt for an empty cart") };

        assert_eq!(
            session.switch_pricing_mode(PricingMode::International, &prompt),
            ModeSwitch::Switched { repriced: 0 }
        );
        assert!(session.pricing().is_international());
    }

    #[test]
    fn test_confirmed_switch_reprices_cart() {
        let mut session = session();
        session.cart_mut().add_one(&product(), None);

        let message = std::cell::RefCell::new(String::new());
        let prompt = |m: &str| {
            *message.borrow_mut() = m.to_string();
            true
        };

        assert_eq!(
            session.switch_pricing_mode(PricingMode::International, &prompt),
            ModeSwitch::Switched { repriced: 1 }
        );
        assert_eq!(message.borrow().as_str(), SWITCH_CONFIRMATION);

        let line = &session.cart().items()[0];
        assert_eq!(line.currency, Currency::USD);
        assert_eq!(line.price, Decimal::from(2));
        assert_eq!(
            session.store().get(PRICING_MODE_KEY).unwrap().as_deref(),
            Some("international")
        );
    }

    #[test]
    fn test_declined_switch_changes_nothing() {
        let mut session = session();
        session.cart_mut().add_one(&product(), None);
        let before = session.cart().items().to_vec();

        assert_eq!(
            session.switch_pricing_mode(PricingMode::International, &Preconfirmed(false)),
            ModeSwitch::Declined
        );
        assert!(session.pricing().is_national());
        assert_eq!(session.cart().items(), &before[..]);
    }

    #[test]
    fn test_cart_sees_authority_toggle() {
        let mut session = session();
        session.switch_pricing_mode(PricingMode::International, &Preconfirmed(true));
        session.cart_mut().add_one(&product(), None);

        assert_eq!(session.cart().items()[0].pricing_mode, PricingMode::International);
    }

    #[test]
    fn test_restore_picks_up_both_keys() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        {
            let mut first = ShopSession::restore(store.clone());
            first.switch_pricing_mode(PricingMode::International, &Preconfirmed(true));
            first.cart_mut().add(&product(), None, 2);
        }

        let second = ShopSession::restore(store);
        assert!(second.pricing().is_international());
        assert_eq!(second.cart().total_item_count(), 2);
        assert_eq!(second.cart().total_price(), Decimal::from(4));
    }
}
