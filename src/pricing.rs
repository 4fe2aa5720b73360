//! Pricing

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, USD},
};
use thiserror::Error;

use crate::cart::lines::CartLine;

/// Errors raised while parsing or formatting prices.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    /// The price was not in the `AMOUNT CURRENCY` format.
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// The currency code is not one we trade in.
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),
}

/// Errors that can occur while calculating a total price.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotalPriceError {
    /// A line is priced in a different currency (line index, line currency, expected currency).
    #[error("Line {0} has currency {1}, but expected {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),

    /// The total does not fit in minor units.
    #[error("total price overflowed")]
    Overflow,
}

/// Look up a supported currency by its ISO alpha code.
///
/// # Errors
///
/// Returns [`PriceError::UnknownCurrency`] for any code other than GBP, USD or EUR.
pub fn currency_from_code(code: &str) -> Result<&'static Currency, PriceError> {
    match code.trim().to_ascii_uppercase().as_str() {
        "GBP" => Ok(GBP),
        "USD" => Ok(USD),
        "EUR" => Ok(EUR),
        _ => Err(PriceError::UnknownCurrency(code.to_string())),
    }
}

/// Parse a price string (e.g., "2.99 GBP") into money.
///
/// Amounts with more precision than the currency's minor unit are rounded
/// half away from zero.
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount is not a decimal number, or if the currency code is not
/// recognised.
pub fn parse_price(s: &str) -> Result<Money<'static, Currency>, PriceError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(PriceError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| PriceError::InvalidPrice(s.to_string()))?;

    let currency = currency_from_code(code)?;

    let minor_units = amount
        .checked_mul(minor_unit_scale(currency))
        .and_then(|value| {
            value
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
        })
        .ok_or_else(|| PriceError::InvalidPrice(s.to_string()))?;

    Ok(Money::from_minor(minor_units, currency))
}

/// Format money the way [`parse_price`] reads it, e.g. "2.99 GBP".
pub fn format_price(money: &Money<'_, Currency>) -> String {
    let currency = money.currency();
    let amount = Decimal::new(money.to_minor_units(), currency.exponent);

    format!("{amount} {}", currency.iso_alpha_code)
}

/// Zero in the given currency.
pub fn zero(currency: &'static Currency) -> Money<'static, Currency> {
    Money::from_minor(0, currency)
}

/// Calculates the total price of a set of cart lines.
///
/// Each line contributes its unit price multiplied by its quantity.
///
/// # Errors
///
/// - [`TotalPriceError::CurrencyMismatch`]: a line is priced in another currency.
/// - [`TotalPriceError::Overflow`]: the total does not fit in minor units.
pub fn total_price(
    lines: &[CartLine],
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, TotalPriceError> {
    let total = lines
        .iter()
        .enumerate()
        .try_fold(0_i64, |acc, (idx, line)| {
            let unit_price = line.unit_price();
            let line_currency = unit_price.currency();

            if line_currency != currency {
                return Err(TotalPriceError::CurrencyMismatch(
                    idx,
                    line_currency.iso_alpha_code,
                    currency.iso_alpha_code,
                ));
            }

            line_minor_units(unit_price, line.quantity().get())
                .and_then(|line_total| acc.checked_add(line_total))
                .ok_or(TotalPriceError::Overflow)
        })?;

    Ok(Money::from_minor(total, currency))
}

/// Unit price times quantity in minor units, or `None` on overflow.
pub(crate) fn line_minor_units(unit_price: Money<'_, Currency>, quantity: u32) -> Option<i64> {
    unit_price
        .to_minor_units()
        .checked_mul(i64::from(quantity))
}

fn minor_unit_scale(currency: &Currency) -> Decimal {
    (0..currency.exponent).fold(Decimal::ONE, |scale, _| scale * Decimal::TEN)
}

/// Serde helpers storing money as its "AMOUNT CURRENCY" string.
pub mod money_serde {
    use rusty_money::{Money, iso::Currency};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    use super::{format_price, parse_price};

    /// Serialize money as a price string.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if the string cannot be written.
    pub fn serialize<S: Serializer>(
        money: &Money<'_, Currency>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_price(money))
    }

    /// Deserialize money from a price string.
    ///
    /// # Errors
    ///
    /// Returns a custom deserializer error if the price cannot be parsed.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Money<'static, Currency>, D::Error> {
        let raw = String::deserialize(deserializer)?;

        parse_price(&raw).map_err(D::Error::custom)
    }

    /// Optional money fields.
    pub mod option {
        use rusty_money::{Money, iso::Currency};
        use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

        use crate::pricing::{format_price, parse_price};

        /// Serialize optional money as an optional price string.
        ///
        /// # Errors
        ///
        /// Returns the serializer's error if the value cannot be written.
        pub fn serialize<S: Serializer>(
            money: &Option<Money<'_, Currency>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match money {
                Some(money) => serializer.serialize_some(&format_price(money)),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize optional money from an optional price string.
        ///
        /// # Errors
        ///
        /// Returns a custom deserializer error if the price cannot be parsed.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Money<'static, Currency>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| parse_price(&raw).map_err(D::Error::custom))
                .transpose()
        }
    }
}
