//! Discounts
//!
//! Cart-level discount codes and the evaluator seam used to validate them.
//! The cart only stores the outcome of an evaluation, never the rules.

use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{cart::lines::CartLine, pricing::money_serde};

pub mod codebook;

pub use codebook::{CodeBook, DiscountRule};

/// Errors specific to discount calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// A fixed amount is in a different currency from the subtotal (discount currency, subtotal currency).
    #[error("Discount has currency {0}, but subtotal has currency {1}")]
    CurrencyMismatch(&'static str, &'static str),
}

/// Reasons a discount code is refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscountRejection {
    /// No code with this name exists.
    #[error("Discount code {0} does not exist")]
    UnknownCode(String),

    /// The code exists but is switched off.
    #[error("Discount code {0} is not active")]
    Inactive(String),

    /// The code has been used as many times as allowed.
    #[error("Discount code {0} has reached its usage limit")]
    UsageLimitReached(String),

    /// The subtotal is below the code's minimum (code, minimum subtotal).
    #[error("Discount code {0} requires a subtotal of at least {1}")]
    BelowMinimum(String, String),

    /// There is nothing in the cart to discount.
    #[error("Discount codes cannot be applied to an empty cart")]
    EmptyCart,
}

/// How a discount code reduces the subtotal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountKind {
    /// Percent points off the subtotal (e.g., `10` for 10% off)
    Percentage {
        /// Percent points
        value: Decimal,
    },

    /// A fixed amount off the subtotal (e.g., "£5 off")
    FixedAmount {
        /// Amount taken off
        #[serde(with = "money_serde")]
        value: Money<'static, Currency>,
    },
}

/// A promotional code, as issued by a discount evaluator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscountCode {
    /// Discount identifier
    pub id: String,

    /// The code a shopper types in
    pub code: String,

    /// Discount kind and value
    pub kind: DiscountKind,
}

/// Validates discount codes and computes their amounts.
///
/// The cart store consumes an evaluator's results; it never inspects discount rules itself.
pub trait DiscountEvaluator {
    /// Validate `code` against the current subtotal and lines.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscountRejection`] describing why the code cannot be used.
    fn validate(
        &self,
        code: &str,
        subtotal: &Money<'static, Currency>,
        lines: &[CartLine],
    ) -> Result<DiscountCode, DiscountRejection>;

    /// Compute how much `discount` takes off the subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscountError`] if the amount cannot be represented.
    fn compute_amount(
        &self,
        discount: &DiscountCode,
        subtotal: &Money<'static, Currency>,
        lines: &[CartLine],
    ) -> Result<Money<'static, Currency>, DiscountError>;
}

/// Amount a discount kind takes off a subtotal, capped to `[0, subtotal]`.
///
/// # Errors
///
/// Returns an error if a percentage cannot be converted to minor units, or if
/// a fixed amount is in another currency.
pub fn discount_amount(
    kind: &DiscountKind,
    subtotal: &Money<'static, Currency>,
) -> Result<Money<'static, Currency>, DiscountError> {
    let currency = subtotal.currency();
    let subtotal_minor = subtotal.to_minor_units().max(0);

    let minor = match kind {
        DiscountKind::Percentage { value: percent } => {
            percent_of_minor(*percent, subtotal_minor)?
        }
        DiscountKind::FixedAmount { value: amount } => {
            if amount.currency() != currency {
                return Err(DiscountError::CurrencyMismatch(
                    amount.currency().iso_alpha_code,
                    currency.iso_alpha_code,
                ));
            }

            amount.to_minor_units()
        }
    };

    Ok(Money::from_minor(minor.clamp(0, subtotal_minor), currency))
}

/// Calculate `percent` points of a minor unit amount, rounding half away from zero.
///
/// # Errors
///
/// Returns [`DiscountError::PercentConversion`] if the calculation overflows.
pub fn percent_of_minor(percent: Decimal, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    percent
        .checked_mul(minor)
        .and_then(|applied| applied.checked_div(Decimal::ONE_HUNDRED))
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}
