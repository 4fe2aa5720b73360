//! Orders
//!
//! Checkout reads the cart once into an [`OrderSubmission`] and hands it to an
//! [`OrderPlacer`]. The cart is cleared only after the placer succeeds.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rusty_money::{Money, iso::Currency};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::{
    cart::{Cart, CartError, CartLine},
    discounts::DiscountCode,
    pricing::money_serde,
    storage::VisitorId,
};

/// Errors raised while placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// There is nothing to order.
    #[error("Cannot place an order for an empty cart")]
    EmptyCart,

    /// The cart totals could not be calculated.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The order was refused by the placer.
    #[error("Order rejected: {0}")]
    Rejected(String),

    /// IO error writing the order.
    #[error("Failed to write order: {0}")]
    Io(#[from] io::Error),

    /// The order could not be serialized.
    #[error("Failed to serialize order: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Everything submitted for a new order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSubmission {
    /// The visitor placing the order
    pub visitor: VisitorId,

    /// Ordered lines
    pub lines: Vec<CartLine>,

    /// Total before the cart-level discount
    #[serde(with = "money_serde")]
    pub subtotal: Money<'static, Currency>,

    /// The applied discount code
    pub discount: Option<DiscountCode>,

    /// Amount taken off by the discount code
    #[serde(with = "money_serde")]
    pub discount_amount: Money<'static, Currency>,

    /// Amount to pay
    #[serde(with = "money_serde")]
    pub total: Money<'static, Currency>,
}

impl OrderSubmission {
    /// Read a cart into a submission.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::EmptyCart`] for a cart with no lines, or a
    /// [`CartError`] if the totals cannot be calculated.
    pub fn from_cart(visitor: VisitorId, cart: &Cart) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        Ok(Self {
            visitor,
            lines: cart.lines().to_vec(),
            subtotal: cart.subtotal()?,
            discount: cart.applied_discount().cloned(),
            discount_amount: cart.discount_amount(),
            total: cart.final_total()?,
        })
    }
}

/// Receipt for a placed order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderConfirmation {
    /// Identifier assigned to the order
    pub order_id: Uuid,

    /// Amount charged
    pub total: Money<'static, Currency>,
}

/// Creates orders from submissions.
pub trait OrderPlacer {
    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderError`] if the order could not be created.
    fn place_order(&self, order: &OrderSubmission) -> Result<OrderConfirmation, OrderError>;
}

/// Places orders by writing each one as a JSON file into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileOrderPlacer {
    dir: PathBuf,
}

#[derive(Serialize)]
struct OrderRecord<'a> {
    order_id: Uuid,
    #[serde(flatten)]
    order: &'a OrderSubmission,
}

impl JsonFileOrderPlacer {
    /// Write orders into `dir`, creating it when needed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The order directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl OrderPlacer for JsonFileOrderPlacer {
    fn place_order(&self, order: &OrderSubmission) -> Result<OrderConfirmation, OrderError> {
        let order_id = Uuid::now_v7();
        let json = serde_json::to_string_pretty(&OrderRecord { order_id, order })?;

        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(format!("{}.json", order_id.simple())), json)?;

        info!(%order_id, visitor = %order.visitor, lines = order.lines.len(), "order placed");

        Ok(OrderConfirmation {
            order_id,
            total: order.total,
        })
    }
}
