//! Products

use std::fmt;

use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::{format_price, money_serde};

/// Errors describing an inconsistent product.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductError {
    /// The discounted price is above the base price (product, discounted price, base price).
    #[error("Product {0} has discounted price {1} above its base price {2}")]
    DiscountAboveBase(ProductId, String, String),

    /// The discounted price uses another currency (product, discounted currency, base currency).
    #[error("Product {0} has discounted currency {1}, but base currency {2}")]
    CurrencyMismatch(ProductId, &'static str, &'static str),

    /// A price is negative.
    #[error("Product {0} has a negative price")]
    NegativePrice(ProductId),
}

/// Product identifier, as issued by the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a product identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Product
///
/// Read-only from the cart's point of view. Cart lines keep a snapshot of the
/// product as it was when added.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier
    pub id: ProductId,

    /// Product name
    pub name: String,

    /// Base price
    #[serde(with = "money_serde")]
    pub price: Money<'static, Currency>,

    /// Sale price, never above the base price
    #[serde(
        default,
        with = "money_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_price: Option<Money<'static, Currency>>,

    /// Available colours
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,

    /// Available sizes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sizes: Vec<String>,

    /// Units in stock
    #[serde(default)]
    pub stock: u32,
}

impl Product {
    /// Create a product with a base price and no variants or stock.
    pub fn new(id: ProductId, name: impl Into<String>, price: Money<'static, Currency>) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            discount_price: None,
            colors: Vec::new(),
            sizes: Vec::new(),
            stock: 0,
        }
    }

    /// Set the sale price.
    #[must_use]
    pub fn with_discount_price(mut self, discount_price: Money<'static, Currency>) -> Self {
        self.discount_price = Some(discount_price);
        self
    }

    /// Set the available colours.
    #[must_use]
    pub fn with_colors<I, S>(mut self, colors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.colors = colors.into_iter().map(Into::into).collect();
        self
    }

    /// Set the available sizes.
    #[must_use]
    pub fn with_sizes<I, S>(mut self, sizes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sizes = sizes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the stock count.
    #[must_use]
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }

    /// The price a shopper pays per unit: the sale price when present, otherwise the base price.
    pub fn unit_price(&self) -> Money<'static, Currency> {
        self.discount_price.unwrap_or(self.price)
    }

    /// Whether `quantity` units can be fulfilled from stock.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }

    /// Check the product's pricing invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductError`] if a price is negative, or if the sale price
    /// is in another currency or above the base price.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.price.to_minor_units() < 0 {
            return Err(ProductError::NegativePrice(self.id.clone()));
        }

        let Some(discount_price) = self.discount_price else {
            return Ok(());
        };

        if discount_price.currency() != self.price.currency() {
            return Err(ProductError::CurrencyMismatch(
                self.id.clone(),
                discount_price.currency().iso_alpha_code,
                self.price.currency().iso_alpha_code,
            ));
        }

        if discount_price.to_minor_units() < 0 {
            return Err(ProductError::NegativePrice(self.id.clone()));
        }

        if discount_price.to_minor_units() > self.price.to_minor_units() {
            return Err(ProductError::DiscountAboveBase(
                self.id.clone(),
                format_price(&discount_price),
                format_price(&self.price),
            ));
        }

        Ok(())
    }
}
