use std::io::Write;

use clap::Args;
use trolley::pricing::format_price;

use super::Session;

#[derive(Debug, Args)]
pub(crate) struct ApplyCodeArgs {
    /// Discount code
    code: String,
}

pub(crate) fn apply_code(
    session: &mut Session,
    args: &ApplyCodeArgs,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let amount = session
        .store
        .apply_code(&args.code, session.catalog.codes())?;

    writeln!(out, "Applied {}: -{}", args.code.trim(), format_price(&amount))?;

    session.show(out)
}

pub(crate) fn refresh(session: &mut Session, out: &mut impl Write) -> anyhow::Result<()> {
    match session.store.revalidate_discount(session.catalog.codes())? {
        Some(amount) => writeln!(out, "Discount is now -{}", format_price(&amount))?,
        None => writeln!(out, "No discount applied")?,
    }

    session.show(out)
}
