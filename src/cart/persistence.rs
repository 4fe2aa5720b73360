//! Cart persistence
//!
//! Best-effort storage of a visitor's cart. Reads that fail fall back to an
//! empty cart and writes that fail are logged; neither is reported to callers.

use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    cart::{Cart, CartLine},
    discounts::DiscountCode,
    pricing::money_serde,
    storage::{CartStorage, VisitorId, ensure_visitor_id},
};

/// Saved form of a cart. The drawer flag is not saved.
#[derive(Debug, Serialize)]
struct CartSnapshot<'a> {
    items: &'a [CartLine],
    applied_discount: Option<&'a DiscountCode>,
    #[serde(with = "money_serde")]
    discount_amount: Money<'static, Currency>,
}

#[derive(Debug, Deserialize)]
struct StoredCart {
    items: Vec<CartLine>,
    #[serde(default)]
    applied_discount: Option<DiscountCode>,
    #[serde(default, with = "money_serde::option")]
    discount_amount: Option<Money<'static, Currency>>,
}

/// Reads and writes one visitor's cart slot.
#[derive(Debug)]
pub struct CartPersistence<S> {
    storage: S,
    visitor: VisitorId,
}

impl<S: CartStorage> CartPersistence<S> {
    /// Bind to the visitor stored in `storage`, creating the visitor on first use.
    pub fn new(mut storage: S) -> Self {
        let visitor = ensure_visitor_id(&mut storage);

        Self { storage, visitor }
    }

    /// The visitor whose cart this adapter reads and writes.
    pub fn visitor_id(&self) -> VisitorId {
        self.visitor
    }

    /// Storage key of the visitor's cart slot.
    pub fn slot_key(&self) -> String {
        slot_key(self.visitor)
    }

    /// The underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Load the visitor's cart.
    ///
    /// A missing, unreadable or inconsistent slot yields an empty cart. The drawer is closed.
    pub fn load(&self, currency: &'static Currency) -> Cart {
        let key = self.slot_key();

        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(%key, "no saved cart, starting empty");
                return Cart::new(currency);
            }
            Err(err) => {
                warn!(%key, error = %err, "failed to read saved cart, starting empty");
                return Cart::new(currency);
            }
        };

        let stored = match serde_json::from_str::<StoredCart>(&raw) {
            Ok(stored) => stored,
            Err(err) => {
                warn!(%key, error = %err, "saved cart is unreadable, starting empty");
                return Cart::new(currency);
            }
        };

        let mut discount_amount = stored
            .discount_amount
            .unwrap_or_else(|| Money::from_minor(0, currency));

        if stored.applied_discount.is_none() && discount_amount.to_minor_units() != 0 {
            warn!(
                %key,
                %discount_amount,
                "saved discount amount has no discount code, dropping it"
            );
            discount_amount = Money::from_minor(0, currency);
        }

        match Cart::restore(
            currency,
            stored.items,
            stored.applied_discount,
            discount_amount,
        ) {
            Ok(cart) => {
                debug!(%key, lines = cart.len(), "restored saved cart");
                cart
            }
            Err(err) => {
                warn!(%key, error = %err, "saved cart is inconsistent, starting empty");
                Cart::new(currency)
            }
        }
    }

    /// Save the cart's lines and discount. Failures are logged, never returned.
    pub fn save(&mut self, cart: &Cart) {
        let key = self.slot_key();

        let snapshot = CartSnapshot {
            items: cart.lines(),
            applied_discount: cart.applied_discount(),
            discount_amount: cart.discount_amount(),
        };

        let json = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(err) => {
                warn!(%key, error = %err, "failed to serialize cart");
                return;
            }
        };

        match self.storage.set(&key, &json) {
            Ok(()) => debug!(%key, lines = cart.len(), "saved cart"),
            Err(err) => warn!(%key, error = %err, "failed to save cart"),
        }
    }
}

/// Storage key of a visitor's cart slot.
pub fn slot_key(visitor: VisitorId) -> String {
    format!("cart.{visitor}")
}

#[cfg(test)]
mod tests {
    use std::io;

    use rust_decimal::Decimal;
    use rusty_money::iso::{GBP, USD};
    use testresult::TestResult;

    use crate::{
        cart::CartError,
        discounts::DiscountKind,
        products::{Product, ProductId},
        storage::{MemoryStorage, MockCartStorage, StorageError, VISITOR_ID_KEY},
    };

    use super::*;

    fn sample_cart() -> Result<Cart, CartError> {
        let mut cart = Cart::new(GBP);
        let tee = Product::new(ProductId::new("tee"), "Tee", Money::from_minor(2000, GBP))
            .with_discount_price(Money::from_minor(1500, GBP))
            .with_colors(["Red", "Blue"]);

        cart.add(&tee, Some("Red"), Some("M"))?;
        cart.add(&tee, Some("Red"), Some("M"))?;
        cart.add(&tee, None, None)?;
        cart.apply_discount(
            DiscountCode {
                id: "d-1".to_string(),
                code: "SAVE10".to_string(),
                kind: DiscountKind::Percentage { value: Decimal::new(10, 0) },
            },
            Money::from_minor(450, GBP),
        )?;

        Ok(cart)
    }

    #[test]
    fn save_then_load_round_trips_state() -> TestResult {
        let mut persistence = CartPersistence::new(MemoryStorage::new());
        let mut cart = sample_cart()?;
        cart.open();

        persistence.save(&cart);

        let loaded = persistence.load(GBP);

        assert_eq!(loaded.lines(), cart.lines());
        assert_eq!(loaded.applied_discount(), cart.applied_discount());
        assert_eq!(loaded.discount_amount(), cart.discount_amount());
        assert!(!loaded.is_open(), "drawer flag is not persisted");

        Ok(())
    }

    #[test]
    fn saved_json_has_no_drawer_flag() -> TestResult {
        let mut persistence = CartPersistence::new(MemoryStorage::new());
        let mut cart = sample_cart()?;
        cart.open();

        persistence.save(&cart);

        let raw = persistence
            .storage()
            .get(&persistence.slot_key())?
            .unwrap_or_default();
        let json: serde_json::Value = serde_json::from_str(&raw)?;

        assert!(json.get("open").is_none());
        assert_eq!(json["items"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["discount_amount"], "4.50 GBP");

        Ok(())
    }

    #[test]
    fn load_without_slot_is_empty() {
        let persistence = CartPersistence::new(MemoryStorage::new());

        let cart = persistence.load(GBP);

        assert!(cart.is_empty());
        assert!(cart.applied_discount().is_none());
    }

    #[test]
    fn load_garbage_is_empty() -> TestResult {
        let mut storage = MemoryStorage::new();
        let visitor = ensure_visitor_id(&mut storage);
        storage.set(&slot_key(visitor), "{not json")?;

        let cart = CartPersistence::new(storage).load(GBP);

        assert!(cart.is_empty());

        Ok(())
    }

    #[test]
    fn load_zero_quantity_is_empty() -> TestResult {
        let mut storage = MemoryStorage::new();
        let visitor = ensure_visitor_id(&mut storage);
        storage.set(
            &slot_key(visitor),
            r#"{"items":[{"product":{"id":"a","name":"A","price":"1.00 GBP"},"quantity":0}]}"#,
        )?;

        let cart = CartPersistence::new(storage).load(GBP);

        assert!(cart.is_empty());

        Ok(())
    }

    #[test]
    fn load_in_other_currency_is_empty() -> TestResult {
        let mut persistence = CartPersistence::new(MemoryStorage::new());

        persistence.save(&sample_cart()?);

        assert!(persistence.load(USD).is_empty());

        Ok(())
    }

    #[test]
    fn load_accepts_slot_without_discount_fields() -> TestResult {
        let mut storage = MemoryStorage::new();
        let visitor = ensure_visitor_id(&mut storage);
        storage.set(
            &slot_key(visitor),
            r#"{"items":[{"product":{"id":"a","name":"A","price":"1.00 GBP"},"quantity":3,"color":"Red"}]}"#,
        )?;

        let cart = CartPersistence::new(storage).load(GBP);

        assert_eq!(cart.total_item_count(), 3);
        assert_eq!(cart.lines().first().and_then(CartLine::color), Some("Red"));
        assert_eq!(cart.discount_amount(), Money::from_minor(0, GBP));

        Ok(())
    }

    #[test]
    fn fixed_amount_discount_round_trips() -> TestResult {
        let mut persistence = CartPersistence::new(MemoryStorage::new());
        let mut cart = Cart::new(GBP);
        let mug = Product::new(ProductId::new("mug"), "Mug", Money::from_minor(800, GBP));

        cart.add(&mug, None, None)?;
        cart.apply_discount(
            DiscountCode {
                id: "fiver".to_string(),
                code: "FIVER".to_string(),
                kind: DiscountKind::FixedAmount {
                    value: Money::from_minor(500, GBP),
                },
            },
            Money::from_minor(500, GBP),
        )?;

        persistence.save(&cart);

        let loaded = persistence.load(GBP);

        assert_eq!(loaded.applied_discount(), cart.applied_discount());
        assert_eq!(loaded.final_total()?, Money::from_minor(300, GBP));

        Ok(())
    }

    #[test]
    fn stale_discount_survives_round_trip() -> TestResult {
        let mut persistence = CartPersistence::new(MemoryStorage::new());
        let mut cart = sample_cart()?;

        cart.remove(0);
        cart.remove(0);
        persistence.save(&cart);

        let loaded = persistence.load(GBP);

        assert_eq!(loaded.discount_amount(), Money::from_minor(450, GBP));
        assert_eq!(loaded.final_total()?, Money::from_minor(0, GBP));

        Ok(())
    }

    #[test]
    fn orphaned_discount_amount_is_dropped() -> TestResult {
        let mut storage = MemoryStorage::new();
        let visitor = ensure_visitor_id(&mut storage);
        storage.set(
            &slot_key(visitor),
            r#"{"items":[{"product":{"id":"a","name":"A","price":"10.00 GBP"},"quantity":1}],"applied_discount":null,"discount_amount":"2.00 GBP"}"#,
        )?;

        let cart = CartPersistence::new(storage).load(GBP);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.discount_amount(), Money::from_minor(0, GBP));
        assert_eq!(cart.final_total()?, Money::from_minor(1000, GBP));

        Ok(())
    }

    #[test]
    fn storage_read_failure_is_empty() {
        let mut storage = MockCartStorage::new();

        storage.expect_get().returning(|key| {
            if key == VISITOR_ID_KEY {
                Ok(Some(VisitorId::generate().to_string()))
            } else {
                Err(StorageError::Io(io::Error::other("disk on fire")))
            }
        });

        let cart = CartPersistence::new(storage).load(GBP);

        assert!(cart.is_empty());
    }

    #[test]
    fn storage_write_failure_is_swallowed() -> TestResult {
        let mut storage = MockCartStorage::new();

        storage
            .expect_get()
            .returning(|_| Ok(Some(VisitorId::generate().to_string())));
        storage
            .expect_set()
            .times(1)
            .returning(|_, _| Err(StorageError::Io(io::Error::other("quota exceeded"))));

        let mut persistence = CartPersistence::new(storage);

        persistence.save(&sample_cart()?);

        Ok(())
    }

    #[test]
    fn visitor_id_is_stable_across_adapters() {
        let mut storage = MemoryStorage::new();

        let first = CartPersistence::new(&mut storage).visitor_id();
        let second = CartPersistence::new(&mut storage).visitor_id();

        assert_eq!(first, second);
    }
}
