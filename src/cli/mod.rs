use std::io::{self, Write};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use trolley::{
    cart::CartStore,
    catalog::Catalog,
    config::{CartConfig, LoggingConfig},
    storage::FileStorage,
    summary::write_summary,
};

mod checkout;
mod discounts;
mod items;

#[derive(Debug, Parser)]
#[command(name = "trolley", about = "Trolley shopping cart", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Cart storage and catalog settings.
    #[command(flatten)]
    cart: CartConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub(crate) logging: LoggingConfig,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the cart
    Show,

    /// List catalog products
    Products,

    /// Add one unit of a product
    Add(items::AddArgs),

    /// Remove the line at a position shown by `show`
    Remove(items::RemoveArgs),

    /// Set the quantity of a product variant
    Update(items::UpdateArgs),

    /// Remove every line and any discount
    Clear,

    /// Apply a discount code
    ApplyCode(discounts::ApplyCodeArgs),

    /// Remove the applied discount code
    RemoveDiscount,

    /// Recalculate the applied discount against the current cart
    RefreshDiscount,

    /// Place an order for the cart
    Checkout,

    /// Print the visitor identifier
    Visitor,
}

/// A loaded cart together with the catalog it is priced from.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) store: CartStore<FileStorage>,
    pub(crate) catalog: Catalog,
    pub(crate) config: CartConfig,
}

impl Session {
    fn open(config: CartConfig) -> anyhow::Result<Self> {
        let currency = config.currency()?;
        let catalog = Catalog::from_file(config.catalog_path(), currency).with_context(|| {
            format!("failed to load catalog {}", config.catalog_path().display())
        })?;
        let store = CartStore::load(FileStorage::new(config.storage_dir()), currency);

        Ok(Self {
            store,
            catalog,
            config,
        })
    }

    pub(crate) fn show(&self, out: &mut impl Write) -> anyhow::Result<()> {
        write_summary(out, self.store.cart())?;

        Ok(())
    }
}

impl Cli {
    pub(crate) fn run(self) -> anyhow::Result<()> {
        let mut session = Session::open(self.cart)?;
        let mut out = io::stdout().lock();

        match self.command {
            Commands::Show => session.show(&mut out),
            Commands::Products => items::list_products(&session, &mut out),
            Commands::Add(args) => items::add(&mut session, &args, &mut out),
            Commands::Remove(args) => items::remove(&mut session, &args, &mut out),
            Commands::Update(args) => items::update(&mut session, args, &mut out),
            Commands::Clear => {
                session.store.clear();
                session.show(&mut out)
            }
            Commands::ApplyCode(args) => discounts::apply_code(&mut session, &args, &mut out),
            Commands::RemoveDiscount => {
                session.store.remove_discount();
                session.show(&mut out)
            }
            Commands::RefreshDiscount => discounts::refresh(&mut session, &mut out),
            Commands::Checkout => checkout::checkout(&mut session, &mut out),
            Commands::Visitor => {
                writeln!(out, "{}", session.store.visitor_id())?;
                Ok(())
            }
        }
    }
}
