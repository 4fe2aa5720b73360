use std::io::Write;

use trolley::{orders::JsonFileOrderPlacer, pricing::format_price};

use super::Session;

pub(crate) fn checkout(session: &mut Session, out: &mut impl Write) -> anyhow::Result<()> {
    let placer = JsonFileOrderPlacer::new(session.config.orders_dir());
    let confirmation = session.store.checkout(&placer)?;

    writeln!(out, "order_id: {}", confirmation.order_id)?;
    writeln!(out, "total: {}", format_price(&confirmation.total))?;
    writeln!(
        out,
        "order: {}",
        placer
            .dir()
            .join(format!("{}.json", confirmation.order_id.simple()))
            .display()
    )?;

    Ok(())
}
