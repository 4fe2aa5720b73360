//! Cart summary table

use std::io;

use tabled::{
    builder::Builder,
    settings::{
        Alignment, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    cart::{Cart, CartError},
    pricing::{TotalPriceError, format_price},
};

/// Errors that can occur when writing a summary.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// Error calculating the cart totals.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Error calculating a line total.
    #[error(transparent)]
    TotalPrice(#[from] TotalPriceError),

    /// IO error writing the summary.
    #[error("Failed to write summary: {0}")]
    Io(#[from] io::Error),
}

/// Write the cart as a table of lines followed by its totals.
///
/// # Errors
///
/// Returns an error if the totals cannot be calculated or the output cannot be written.
pub fn write_summary(mut out: impl io::Write, cart: &Cart) -> Result<(), SummaryError> {
    if cart.is_empty() {
        writeln!(out, "Your cart is empty")?;
        return Ok(());
    }

    let mut builder = Builder::default();

    builder.push_record(["#", "Item", "Variant", "Qty", "Unit Price", "Line Total"]);

    for (index, line) in cart.iter().enumerate() {
        let variant = [line.color(), line.size()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" / ");

        builder.push_record([
            index.to_string(),
            line.product().name.clone(),
            variant,
            line.quantity().to_string(),
            format_price(&line.unit_price()),
            format_price(&line.line_total()?),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Alignment::center());
    table.modify(Columns::new(3..6), Alignment::right());

    writeln!(out, "{table}")?;
    writeln!(out, "Items:    {}", cart.total_item_count())?;
    writeln!(out, "Subtotal: {}", format_price(&cart.subtotal()?))?;

    if let Some(discount) = cart.applied_discount() {
        writeln!(
            out,
            "Discount: -{} ({})",
            format_price(&cart.discount_amount()),
            discount.code
        )?;
    }

    writeln!(out, "Total:    {}", format_price(&cart.final_total()?))?;

    Ok(())
}
