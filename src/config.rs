//! Configuration

use std::path::{Path, PathBuf};

use clap::Args;
use rusty_money::iso::Currency;

use crate::pricing::{PriceError, currency_from_code};

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(
        long,
        env = "LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Compact,
        global = true
    )]
    pub log_format: LogFormat,
}

/// Where carts, orders and the catalog live.
#[derive(Debug, Clone, Args)]
pub struct CartConfig {
    /// Directory holding the visitor id, cart slots and placed orders
    #[arg(long, env = "CART_DATA_DIR", default_value = ".trolley", global = true)]
    pub data_dir: PathBuf,

    /// Catalog YAML file
    #[arg(
        long,
        env = "CART_CATALOG",
        default_value = "fixtures/catalog.yml",
        global = true
    )]
    pub catalog: PathBuf,

    /// ISO code of the store currency
    #[arg(long, env = "CART_CURRENCY", default_value = "GBP", global = true)]
    pub currency: String,
}

impl CartConfig {
    /// Resolve the configured currency.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::UnknownCurrency`] for an unsupported code.
    pub fn currency(&self) -> Result<&'static Currency, PriceError> {
        currency_from_code(&self.currency)
    }

    /// Directory storage slots are written to.
    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join("storage")
    }

    /// Directory placed orders are written to.
    pub fn orders_dir(&self) -> PathBuf {
        self.data_dir.join("orders")
    }

    /// Catalog file path.
    pub fn catalog_path(&self) -> &Path {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use rusty_money::iso::{EUR, GBP};
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        cart: CartConfig,

        #[command(flatten)]
        logging: LoggingConfig,
    }

    #[test]
    fn flags_override_defaults() -> TestResult {
        let cli = TestCli::try_parse_from([
            "trolley",
            "--data-dir",
            "/tmp/carts",
            "--currency",
            "eur",
            "--log-format",
            "json",
        ])?;

        assert_eq!(cli.cart.currency()?, EUR);
        assert_eq!(cli.cart.storage_dir(), PathBuf::from("/tmp/carts/storage"));
        assert_eq!(cli.cart.orders_dir(), PathBuf::from("/tmp/carts/orders"));
        assert_eq!(cli.logging.log_format, LogFormat::Json);

        Ok(())
    }

    #[test]
    fn defaults_resolve() -> TestResult {
        let cli = TestCli::try_parse_from(["trolley", "--currency", "GBP"])?;

        assert_eq!(cli.cart.currency()?, GBP);

        Ok(())
    }

    #[test]
    fn unknown_currency_is_rejected() -> TestResult {
        let cli = TestCli::try_parse_from(["trolley", "--currency", "XYZ"])?;

        assert!(cli.cart.currency().is_err());

        Ok(())
    }
}
