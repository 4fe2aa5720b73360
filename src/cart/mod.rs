//! Cart
//!
//! [`Cart`] is a flat reducer over line items, the drawer flag and an applied
//! discount. It performs no I/O; [`CartStore`] wraps it with persistence.
//!
//! Two discount mechanisms apply independently: a product's own sale price
//! feeds the [subtotal](Cart::subtotal), and a cart-level [`DiscountCode`]
//! is taken off the subtotal in the [final total](Cart::final_total). The
//! cart-level amount is frozen when applied and only clamped at use.

use std::num::NonZeroU32;

use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    discounts::{DiscountCode, DiscountError, DiscountRejection},
    pricing::{TotalPriceError, total_price, zero},
    products::{Product, ProductId},
};

pub mod lines;
pub mod persistence;
mod store;

pub use lines::{CartLine, VariantKey};
pub use store::CartStore;

/// Errors related to cart mutations or totals.
#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    /// A price is in a different currency from the cart (price currency, cart currency).
    #[error("Price has currency {0}, but cart has currency {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// A discount amount below zero was supplied.
    #[error("Discount amount cannot be negative")]
    NegativeDiscount,

    /// Two lines share the same variant key.
    #[error("Product {0} appears in more than one line for the same variant")]
    DuplicateLine(ProductId),

    /// Error calculating the total price of the lines.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),

    /// A discount code was refused by the evaluator.
    #[error(transparent)]
    DiscountRejected(#[from] DiscountRejection),

    /// A discount amount could not be computed.
    #[error(transparent)]
    Discount(#[from] DiscountError),
}

/// Cart state
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    lines: Vec<CartLine>,
    currency: &'static Currency,
    open: bool,
    applied_discount: Option<DiscountCode>,
    discount_amount: Money<'static, Currency>,
}

impl Cart {
    /// Create an empty, closed cart in the given currency.
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            lines: Vec::new(),
            currency,
            open: false,
            applied_discount: None,
            discount_amount: zero(currency),
        }
    }

    /// Rebuild a cart from previously saved parts.
    ///
    /// The drawer is always closed on a restored cart.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if a line or the discount amount is priced in another
    /// currency, if two lines share a variant key, or if the discount amount is negative.
    pub fn restore(
        currency: &'static Currency,
        lines: Vec<CartLine>,
        applied_discount: Option<DiscountCode>,
        discount_amount: Money<'static, Currency>,
    ) -> Result<Self, CartError> {
        let mut cart = Cart::new(currency);

        for line in lines {
            let line = line.normalised();

            cart.ensure_currency(&line.product().price)?;
            cart.ensure_currency(&line.unit_price())?;

            if cart.find(&line.key()).is_some() {
                return Err(CartError::DuplicateLine(line.product().id.clone()));
            }

            cart.lines.push(line);
        }

        match applied_discount {
            Some(discount) => cart.apply_discount(discount, discount_amount)?,
            None => cart.ensure_currency(&discount_amount)?,
        }

        Ok(cart)
    }

    /// Add one unit of a product variant.
    ///
    /// Increments the matching line if the variant is already in the cart,
    /// otherwise appends a new line. Stock is not checked here.
    ///
    /// Returns the variant's quantity after the add.
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
        self.ensure_currency(&product.price)?;
        self.ensure_currency(&product.unit_price())?;

        let key = VariantKey::new(product.id.clone(), color, size);

        if let Some(line) = self.lines.iter_mut().find(|line| line.matches(&key)) {
            line.increment();

            return Ok(line.quantity());
        }

        let line = CartLine::new(product.clone(), key.color(), key.size());
        let quantity = line.quantity();

        self.lines.push(line);

        Ok(quantity)
    }

    /// Remove the line at `index`, as rendered from [`lines`](Cart::lines).
    ///
    /// The index is resolved to the line's variant key before removal. Out of range
    /// indexes are ignored.
    pub fn remove(&mut self, index: usize) -> Option<CartLine> {
        let key = self.lines.get(index)?.key();

        self.remove_by_key(&key)
    }

    /// Remove the line holding the given variant, if any.
    pub fn remove_by_key(&mut self, key: &VariantKey) -> Option<CartLine> {
        let position = self.find(key)?;

        Some(self.lines.remove(position))
    }

    /// Replace the quantity of a variant.
    ///
    /// A quantity of zero or less removes the line. Quantities above `u32::MAX`
    /// saturate. Returns `false` if no line holds the variant.
    pub fn update_quantity(&mut self, key: &VariantKey, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove_by_key(key).is_some();
        }

        let quantity = u32::try_from(quantity)
            .ok()
            .and_then(NonZeroU32::new)
            .unwrap_or(NonZeroU32::MAX);

        match self.lines.iter_mut().find(|line| line.matches(key)) {
            Some(line) => {
                line.set_quantity(quantity);
                true
            }
            None => false,
        }
    }

    /// Remove every line and any applied discount. The drawer flag is left as is.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.remove_discount();
    }

    /// Flip the drawer flag.
    pub fn toggle_open(&mut self) {
        self.open = !self.open;
    }

    /// Open the drawer.
    pub fn open(&mut self) {
        self.open = true;
    }

    /// Close the drawer.
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Whether the drawer is open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Apply a validated discount and its precomputed amount, replacing any previous discount.
    ///
    /// Both are stored verbatim; the amount is not checked against the subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the amount is negative or in another currency.
    pub fn apply_discount(
        &mut self,
        discount: DiscountCode,
        amount: Money<'static, Currency>,
    ) -> Result<(), CartError> {
        self.ensure_currency(&amount)?;

        if amount.to_minor_units() < 0 {
            return Err(CartError::NegativeDiscount);
        }

        self.applied_discount = Some(discount);
        self.discount_amount = amount;

        Ok(())
    }

    /// Drop the applied discount and reset the discount amount to zero.
    pub fn remove_discount(&mut self) {
        self.applied_discount = None;
        self.discount_amount = zero(self.currency);
    }

    /// The applied discount, if any.
    pub fn applied_discount(&self) -> Option<&DiscountCode> {
        self.applied_discount.as_ref()
    }

    /// The discount amount stored when the discount was applied.
    pub fn discount_amount(&self) -> Money<'static, Currency> {
        self.discount_amount
    }

    /// Sum of quantities across all lines.
    pub fn total_item_count(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| u64::from(line.quantity().get()))
            .sum()
    }

    /// Sum of unit price times quantity over all lines.
    ///
    /// Uses each product's sale price when it has one; the cart-level discount is not applied.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError::TotalPrice`] if the total overflows.
    pub fn subtotal(&self) -> Result<Money<'static, Currency>, CartError> {
        Ok(total_price(&self.lines, self.currency)?)
    }

    /// The subtotal less the discount amount, never below zero.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError::TotalPrice`] if the subtotal overflows.
    pub fn final_total(&self) -> Result<Money<'static, Currency>, CartError> {
        let subtotal = self.subtotal()?.to_minor_units();
        let total = subtotal
            .saturating_sub(self.discount_amount.to_minor_units())
            .max(0);

        Ok(Money::from_minor(total, self.currency))
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Iterate over the lines in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter()
    }

    /// Get the line holding a variant.
    pub fn get(&self, key: &VariantKey) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.matches(key))
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Currency of the cart.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    fn find(&self, key: &VariantKey) -> Option<usize> {
        self.lines.iter().position(|line| line.matches(key))
    }

    fn ensure_currency(&self, money: &Money<'static, Currency>) -> Result<(), CartError> {
        let currency = money.currency();

        if currency == self.currency {
            Ok(())
        } else {
            Err(CartError::CurrencyMismatch(
                currency.iso_alpha_code,
                self.currency.iso_alpha_code,
            ))
        }
    }
}
