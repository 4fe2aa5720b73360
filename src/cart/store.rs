//! Cart store

use std::num::NonZeroU32;

use rusty_money::{Money, iso::Currency};
use tracing::{debug, info};

use crate::{
    cart::{Cart, CartError, CartLine, VariantKey, persistence::CartPersistence},
    discounts::{DiscountCode, DiscountEvaluator},
    orders::{OrderConfirmation, OrderError, OrderPlacer, OrderSubmission},
    products::Product,
    storage::{CartStorage, VisitorId},
};

/// The authoritative cart for one visitor.
///
/// Owns the in-memory [`Cart`] and writes it to storage after every mutation.
/// Failed writes are logged and never undo the in-memory change.
#[derive(Debug)]
pub struct CartStore<S> {
    cart: Cart,
    persistence: CartPersistence<S>,
}

impl<S: CartStorage> CartStore<S> {
    /// Resolve the visitor in `storage` and rehydrate their cart.
    pub fn load(storage: S, currency: &'static Currency) -> Self {
        let persistence = CartPersistence::new(storage);
        let cart = persistence.load(currency);

        debug!(visitor = %persistence.visitor_id(), lines = cart.len(), "cart store ready");

        Self { cart, persistence }
    }

    /// Current cart state.
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// The visitor who owns this cart.
    pub fn visitor_id(&self) -> VisitorId {
        self.persistence.visitor_id()
    }

    /// The underlying storage.
    pub fn storage(&self) -> &S {
        self.persistence.storage()
    }

    /// Add one unit of a product variant. See [`Cart::add`].
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CurrencyMismatch`] if the product is priced in another currency.
    pub fn add(
        &mut self,
        product: &Product,
        color: Option<&str>,
        size: Option<&str>,
    ) -> Result<NonZeroU32, CartError> {
        let quantity = self.cart.add(product, color, size)?;

        self.persist();

        Ok(quantity)
    }

    /// Remove the line at a rendered position. See [`Cart::remove`].
    ///
    /// Nothing is written when the index is out of range.
    pub fn remove(&mut self, index: usize) -> Option<CartLine> {
        let removed = self.cart.remove(index);

        if removed.is_some() {
            self.persist();
        }

        removed
    }

    /// Remove the line holding a variant. See [`Cart::remove_by_key`].
    ///
    /// Nothing is written when no line holds the variant.
    pub fn remove_by_key(&mut self, key: &VariantKey) -> Option<CartLine> {
        let removed = self.cart.remove_by_key(key);

        if removed.is_some() {
            self.persist();
        }

        removed
    }

    /// Replace a variant's quantity. See [`Cart::update_quantity`].
    ///
    /// Nothing is written when no line holds the variant.
    pub fn update_quantity(&mut self, key: &VariantKey, quantity: i64) -> bool {
        let updated = self.cart.update_quantity(key, quantity);

        if updated {
            self.persist();
        }

        updated
    }

    /// Empty the cart and drop any discount. See [`Cart::clear`].
    pub fn clear(&mut self) {
        self.cart.clear();

        self.persist();
    }

    /// Flip the drawer flag.
    pub fn toggle_open(&mut self) {
        self.cart.toggle_open();
    }

    /// Open the drawer.
    pub fn open(&mut self) {
        self.cart.open();
    }

    /// Close the drawer.
    pub fn close(&mut self) {
        self.cart.close();
    }

    /// Apply an already validated discount. See [`Cart::apply_discount`].
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the amount is negative or in another currency.
    pub fn apply_discount(
        &mut self,
        discount: DiscountCode,
        amount: Money<'static, Currency>,
    ) -> Result<(), CartError> {
        self.cart.apply_discount(discount, amount)?;

        self.persist();

        Ok(())
    }

    /// Drop the applied discount.
    pub fn remove_discount(&mut self) {
        self.cart.remove_discount();

        self.persist();
    }

    /// Validate `code` with an evaluator and apply it with the amount it computes.
    ///
    /// Returns the applied discount amount.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::DiscountRejected`] if the evaluator refuses the code,
    /// or another [`CartError`] if the amount cannot be computed or applied.
    pub fn apply_code<E: DiscountEvaluator + ?Sized>(
        &mut self,
        code: &str,
        evaluator: &E,
    ) -> Result<Money<'static, Currency>, CartError> {
        let subtotal = self.cart.subtotal()?;
        let discount = evaluator.validate(code, &subtotal, self.cart.lines())?;
        let amount = evaluator.compute_amount(&discount, &subtotal, self.cart.lines())?;

        info!(code = %discount.code, %amount, "discount applied");

        self.apply_discount(discount, amount)?;

        Ok(amount)
    }

    /// Re-run the evaluator for the applied discount against the current lines.
    ///
    /// Refreshes the stored amount while the code is still valid and drops the
    /// discount once it is not. Nothing calls this implicitly; until it is
    /// called the amount stays as it was when applied.
    ///
    /// Returns the new amount, or `None` if no discount remains applied.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the subtotal or discount amount cannot be computed.
    pub fn revalidate_discount<E: DiscountEvaluator + ?Sized>(
        &mut self,
        evaluator: &E,
    ) -> Result<Option<Money<'static, Currency>>, CartError> {
        let Some(applied) = self.cart.applied_discount().cloned() else {
            return Ok(None);
        };

        let subtotal = self.cart.subtotal()?;

        match evaluator.validate(&applied.code, &subtotal, self.cart.lines()) {
            Ok(discount) => {
                let amount = evaluator.compute_amount(&discount, &subtotal, self.cart.lines())?;

                self.apply_discount(discount, amount)?;

                Ok(Some(amount))
            }
            Err(rejection) => {
                info!(code = %applied.code, reason = %rejection, "discount no longer applies");

                self.remove_discount();

                Ok(None)
            }
        }
    }

    /// Submit the cart as an order, clearing it once the order is placed.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::EmptyCart`] for an empty cart, or the placer's
    /// error. The cart is left untouched on error.
    pub fn checkout<P: OrderPlacer + ?Sized>(
        &mut self,
        placer: &P,
    ) -> Result<OrderConfirmation, OrderError> {
        let submission = OrderSubmission::from_cart(self.visitor_id(), &self.cart)?;
        let confirmation = placer.place_order(&submission)?;

        self.clear();

        Ok(confirmation)
    }

    fn persist(&mut self) {
        self.persistence.save(&self.cart);
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, io};

    use rust_decimal::Decimal;
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use crate::{
        discounts::{CodeBook, DiscountKind, DiscountRejection, DiscountRule},
        products::ProductId,
        storage::{MemoryStorage, MockCartStorage, StorageError},
    };

    use super::*;

    fn product(id: &str, minor: i64) -> Product {
        Product::new(ProductId::new(id), id, Money::from_minor(minor, GBP))
    }

    fn key(id: &str) -> VariantKey {
        VariantKey::new(ProductId::new(id), None, None)
    }

    fn code_book() -> CodeBook {
        let mut big_spender = DiscountRule::new(DiscountCode {
            id: "d-big".to_string(),
            code: "BIG20".to_string(),
            kind: DiscountKind::Percentage { value: Decimal::new(20, 0) },
        });
        big_spender.minimum_subtotal = Some(Money::from_minor(5000, GBP));

        [
            DiscountRule::new(DiscountCode {
                id: "d-10".to_string(),
                code: "SAVE10".to_string(),
                kind: DiscountKind::Percentage { value: Decimal::new(10, 0) },
            }),
            big_spender,
        ]
        .into_iter()
        .collect()
    }

    #[derive(Debug, Default)]
    struct RecordingPlacer {
        orders: RefCell<Vec<OrderSubmission>>,
    }

    impl OrderPlacer for RecordingPlacer {
        fn place_order(&self, order: &OrderSubmission) -> Result<OrderConfirmation, OrderError> {
            self.orders.borrow_mut().push(order.clone());

            Ok(OrderConfirmation {
                order_id: uuid::Uuid::now_v7(),
                total: order.total,
            })
        }
    }

    #[derive(Debug)]
    struct RejectingPlacer;

    impl OrderPlacer for RejectingPlacer {
        fn place_order(&self, _order: &OrderSubmission) -> Result<OrderConfirmation, OrderError> {
            Err(OrderError::Rejected("out of service".to_string()))
        }
    }

    #[test]
    fn mutations_are_written_through() -> TestResult {
        let mut storage = MemoryStorage::new();

        {
            let mut store = CartStore::load(&mut storage, GBP);

            store.add(&product("a", 100), None, None)?;
            store.add(&product("a", 100), None, None)?;
            store.add(&product("b", 250), Some("Red"), None)?;
        }

        let store = CartStore::load(&mut storage, GBP);

        assert_eq!(store.cart().len(), 2);
        assert_eq!(store.cart().total_item_count(), 3);

        Ok(())
    }

    #[test]
    fn drawer_state_is_not_restored() {
        let mut storage = MemoryStorage::new();

        {
            let mut store = CartStore::load(&mut storage, GBP);
            store.open();
            store.clear();
        }

        assert!(!CartStore::load(&mut storage, GBP).cart().is_open());
    }

    #[test]
    fn failed_writes_keep_in_memory_state() -> TestResult {
        let mut storage = MockCartStorage::new();

        storage
            .expect_get()
            .returning(|_| Ok(Some(VisitorId::generate().to_string())));
        storage
            .expect_set()
            .returning(|_, _| Err(StorageError::Io(io::Error::other("read-only"))));

        let mut store = CartStore::load(storage, GBP);

        store.add(&product("a", 100), None, None)?;
        store.add(&product("b", 100), None, None)?;

        assert!(store.remove(0).is_some());
        assert_eq!(store.cart().len(), 1);

        Ok(())
    }

    #[test]
    fn noop_mutations_are_not_written() -> TestResult {
        let mut storage = MockCartStorage::new();

        storage
            .expect_get()
            .returning(|_| Ok(Some(VisitorId::generate().to_string())));
        storage.expect_set().times(1).returning(|_, _| Ok(()));

        let mut store = CartStore::load(storage, GBP);

        store.add(&product("a", 100), None, None)?;

        assert!(store.remove(5).is_none());
        assert!(store.remove_by_key(&key("missing")).is_none());
        assert!(!store.update_quantity(&key("missing"), 3));
        assert!(!store.update_quantity(&key("missing"), 0));
        assert_eq!(store.cart().len(), 1);

        Ok(())
    }

    #[test]
    fn apply_code_stores_evaluated_amount() -> TestResult {
        let mut store = CartStore::load(MemoryStorage::new(), GBP);

        store.add(&product("a", 2550), None, None)?;

        let amount = store.apply_code("save10", &code_book())?;

        assert_eq!(amount, Money::from_minor(255, GBP));
        assert_eq!(
            store.cart().applied_discount().map(|d| d.code.as_str()),
            Some("SAVE10")
        );
        assert_eq!(store.cart().final_total()?, Money::from_minor(2295, GBP));

        Ok(())
    }

    #[test]
    fn apply_code_rejection_leaves_cart_unchanged() -> TestResult {
        let mut store = CartStore::load(MemoryStorage::new(), GBP);

        store.add(&product("a", 1000), None, None)?;

        let result = store.apply_code("BIG20", &code_book());

        assert_eq!(
            result,
            Err(CartError::DiscountRejected(DiscountRejection::BelowMinimum(
                "BIG20".to_string(),
                "50.00 GBP".to_string()
            )))
        );
        assert!(store.cart().applied_discount().is_none());

        Ok(())
    }

    #[test]
    fn discount_amount_is_frozen_until_revalidated() -> TestResult {
        let mut store = CartStore::load(MemoryStorage::new(), GBP);

        store.add(&product("a", 1000), None, None)?;
        store.apply_code("SAVE10", &code_book())?;
        store.update_quantity(&key("a"), 3);

        assert_eq!(store.cart().discount_amount(), Money::from_minor(100, GBP));

        let refreshed = store.revalidate_discount(&code_book())?;

        assert_eq!(refreshed, Some(Money::from_minor(300, GBP)));
        assert_eq!(store.cart().final_total()?, Money::from_minor(2700, GBP));

        Ok(())
    }

    #[test]
    fn revalidate_drops_discount_that_no_longer_applies() -> TestResult {
        let mut store = CartStore::load(MemoryStorage::new(), GBP);

        store.add(&product("a", 6000), None, None)?;
        store.add(&product("b", 1000), None, None)?;
        store.apply_code("BIG20", &code_book())?;
        store.remove_by_key(&key("a"));

        assert_eq!(store.revalidate_discount(&code_book())?, None);
        assert!(store.cart().applied_discount().is_none());
        assert_eq!(store.cart().final_total()?, Money::from_minor(1000, GBP));

        Ok(())
    }

    #[test]
    fn revalidate_without_discount_is_noop() -> TestResult {
        let mut store = CartStore::load(MemoryStorage::new(), GBP);

        assert_eq!(store.revalidate_discount(&code_book())?, None);

        Ok(())
    }

    #[test]
    fn checkout_submits_and_clears() -> TestResult {
        let mut storage = MemoryStorage::new();
        let placer = RecordingPlacer::default();

        {
            let mut store = CartStore::load(&mut storage, GBP);

            store.add(&product("a", 1000), None, None)?;
            store.apply_discount(
                DiscountCode {
                    id: "d-5".to_string(),
                    code: "FIVER".to_string(),
                    kind: DiscountKind::FixedAmount { value: Money::from_minor(500, GBP) },
                },
                Money::from_minor(500, GBP),
            )?;

            let confirmation = store.checkout(&placer)?;

            assert_eq!(confirmation.total, Money::from_minor(500, GBP));
            assert!(store.cart().is_empty());
            assert!(store.cart().applied_discount().is_none());
        }

        let orders = placer.orders.borrow();

        assert_eq!(orders.len(), 1);
        assert_eq!(
            orders.first().map(|order| order.subtotal),
            Some(Money::from_minor(1000, GBP))
        );
        assert!(CartStore::load(&mut storage, GBP).cart().is_empty());

        Ok(())
    }

    #[test]
    fn checkout_failure_keeps_cart() -> TestResult {
        let mut store = CartStore::load(MemoryStorage::new(), GBP);

        store.add(&product("a", 1000), None, None)?;

        let result = store.checkout(&RejectingPlacer);

        assert!(matches!(result, Err(OrderError::Rejected(_))));
        assert_eq!(store.cart().len(), 1);

        Ok(())
    }

    #[test]
    fn checkout_of_empty_cart_fails() {
        let mut store = CartStore::load(MemoryStorage::new(), GBP);

        let result = store.checkout(&RecordingPlacer::default());

        assert!(matches!(result, Err(OrderError::EmptyCart)));
    }
}
