//! Cart lines

use std::num::NonZeroU32;

use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};

use crate::{
    pricing::{TotalPriceError, line_minor_units},
    products::{Product, ProductId},
};

/// Identity of a cart line: a product plus its optional colour and size.
///
/// Blank selectors are treated as absent, so `Some("")` and `None` name the same variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VariantKey {
    product: ProductId,
    color: Option<String>,
    size: Option<String>,
}

impl VariantKey {
    /// Create a variant key.
    pub fn new(product: ProductId, color: Option<&str>, size: Option<&str>) -> Self {
        Self {
            product,
            color: selector(color),
            size: selector(size),
        }
    }

    /// Product identifier
    pub fn product(&self) -> &ProductId {
        &self.product
    }

    /// Selected colour
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Selected size
    pub fn size(&self) -> Option<&str> {
        self.size.as_deref()
    }
}

fn selector(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// A product variant in the cart with a positive quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    product: Product,
    quantity: NonZeroU32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<String>,
}

impl CartLine {
    /// Creates a line holding a single unit of the given variant.
    pub(crate) fn new(product: Product, color: Option<&str>, size: Option<&str>) -> Self {
        Self {
            product,
            quantity: NonZeroU32::MIN,
            color: selector(color),
            size: selector(size),
        }
    }

    /// Re-apply selector normalisation to a line read back from storage.
    pub(crate) fn normalised(self) -> Self {
        Self {
            color: selector(self.color.as_deref()),
            size: selector(self.size.as_deref()),
            ..self
        }
    }

    /// The product snapshot taken when the line was created.
    pub fn product(&self) -> &Product {
        &self.product
    }

    /// Number of units
    pub fn quantity(&self) -> NonZeroU32 {
        self.quantity
    }

    /// Selected colour
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Selected size
    pub fn size(&self) -> Option<&str> {
        self.size.as_deref()
    }

    /// The identity key of this line.
    pub fn key(&self) -> VariantKey {
        VariantKey {
            product: self.product.id.clone(),
            color: self.color.clone(),
            size: self.size.clone(),
        }
    }

    /// Whether this line holds the given variant.
    pub fn matches(&self, key: &VariantKey) -> bool {
        self.product.id == key.product && self.color == key.color && self.size == key.size
    }

    /// Price per unit, honouring the product's own sale price.
    pub fn unit_price(&self) -> Money<'static, Currency> {
        self.product.unit_price()
    }

    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns [`TotalPriceError::Overflow`] if the total does not fit in minor units.
    pub fn line_total(&self) -> Result<Money<'static, Currency>, TotalPriceError> {
        let unit_price = self.unit_price();

        line_minor_units(unit_price, self.quantity.get())
            .map(|minor| Money::from_minor(minor, unit_price.currency()))
            .ok_or(TotalPriceError::Overflow)
    }

    pub(crate) fn increment(&mut self) {
        self.quantity = self.quantity.saturating_add(1);
    }

    pub(crate) fn set_quantity(&mut self, quantity: NonZeroU32) {
        self.quantity = quantity;
    }
}
