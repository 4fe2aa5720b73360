use std::io::Write;

use anyhow::bail;
use clap::Args;
use trolley::{
    cart::VariantKey,
    pricing::format_price,
    products::{Product, ProductId},
};

use super::Session;

#[derive(Debug, Args)]
pub(crate) struct AddArgs {
    /// Catalog product identifier
    product: String,

    /// Colour variant
    #[arg(long)]
    color: Option<String>,

    /// Size variant
    #[arg(long)]
    size: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct RemoveArgs {
    /// Line position, starting at 0
    index: usize,
}

#[derive(Debug, Args)]
#[command(allow_negative_numbers = true)]
pub(crate) struct UpdateArgs {
    /// Catalog product identifier
    product: String,

    /// New quantity; zero or less removes the line
    quantity: i64,

    /// Colour variant
    #[arg(long)]
    color: Option<String>,

    /// Size variant
    #[arg(long)]
    size: Option<String>,
}

pub(crate) fn list_products(session: &Session, out: &mut impl Write) -> anyhow::Result<()> {
    for product in session.catalog.products() {
        write!(
            out,
            "{:<12} {:<24} {:>12}",
            product.id.as_str(),
            product.name,
            format_price(&product.unit_price())
        )?;

        if product.discount_price.is_some() {
            write!(out, " (was {})", format_price(&product.price))?;
        }

        writeln!(out, "  stock: {}", product.stock)?;
    }

    Ok(())
}

pub(crate) fn add(
    session: &mut Session,
    args: &AddArgs,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let product = session.catalog.product(&args.product)?.clone();
    let key = VariantKey::new(
        product.id.clone(),
        args.color.as_deref(),
        args.size.as_deref(),
    );

    let in_cart = session
        .store
        .cart()
        .get(&key)
        .map_or(0, |line| line.quantity().get());

    check_stock(&product, in_cart)?;

    session.store.add(&product, key.color(), key.size())?;

    session.show(out)
}

/// Refuse one more unit of `product` when `in_cart` units already use up its stock.
fn check_stock(product: &Product, in_cart: u32) -> anyhow::Result<()> {
    if !product.has_stock_for(in_cart.saturating_add(1)) {
        bail!("{} is out of stock", product.name);
    }

    Ok(())
}

pub(crate) fn remove(
    session: &mut Session,
    args: &RemoveArgs,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if session.store.remove(args.index).is_none() {
        bail!("there is no line {}", args.index);
    }

    session.show(out)
}

pub(crate) fn update(
    session: &mut Session,
    args: UpdateArgs,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let key = VariantKey::new(
        ProductId::new(args.product),
        args.color.as_deref(),
        args.size.as_deref(),
    );

    if !session.store.update_quantity(&key, args.quantity) {
        bail!("{} is not in the cart", key.product());
    }

    session.show(out)
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::GBP};
    use testresult::TestResult;

    use super::*;

    fn mug(stock: u32) -> Product {
        Product::new(ProductId::new("mug"), "Mug", Money::from_minor(800, GBP)).with_stock(stock)
    }

    #[test]
    fn check_stock_refuses_out_of_stock_products() {
        assert!(check_stock(&mug(0), 0).is_err());
    }

    #[test]
    fn check_stock_refuses_add_beyond_stock() {
        let result = check_stock(&mug(3), 3);

        assert!(result.is_err());
        assert_eq!(
            result.map_err(|err| err.to_string()),
            Err("Mug is out of stock".to_string())
        );
    }

    #[test]
    fn check_stock_accepts_last_unit() -> TestResult {
        check_stock(&mug(3), 2)?;
        check_stock(&mug(1), 0)?;

        Ok(())
    }

    #[test]
    fn check_stock_saturates_quantity_in_cart() {
        assert!(check_stock(&mug(u32::MAX), u32::MAX).is_err());
    }
}
