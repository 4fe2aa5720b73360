//! Catalog
//!
//! Products and discount codes loaded from a YAML file:
//!
//! ```yaml
//! products:
//!   tee:
//!     name: Logo Tee
//!     price: 20.00 GBP
//!     discount_price: 15.00 GBP
//!     colors: [Red, Blue]
//!     sizes: [S, M, L]
//!     stock: 10
//!
//! discounts:
//!   - code: SAVE10
//!     discount:
//!       type: percentage
//!       value: 10%
//!     minimum_subtotal: 30.00 GBP
//! ```

use std::{collections::BTreeMap, fs, path::Path, str::FromStr};

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    discounts::{CodeBook, DiscountCode, DiscountKind, DiscountRule},
    pricing::{PriceError, parse_price},
    products::{Product, ProductError, ProductId},
};

/// Catalog loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error reading the catalog file
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price
    #[error(transparent)]
    Price(#[from] PriceError),

    /// A product breaks a pricing rule
    #[error(transparent)]
    Product(#[from] ProductError),

    /// A price is not in the catalog currency (expected, found)
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// The same code is listed twice
    #[error("Duplicate discount code: {0}")]
    DuplicateCode(String),

    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFixture {
    #[serde(default)]
    products: BTreeMap<String, ProductFixture>,

    #[serde(default)]
    discounts: Vec<DiscountFixture>,
}

#[derive(Debug, Deserialize)]
struct ProductFixture {
    name: String,
    price: String,
    #[serde(default)]
    discount_price: Option<String>,
    #[serde(default)]
    colors: Vec<String>,
    #[serde(default)]
    sizes: Vec<String>,
    #[serde(default)]
    stock: u32,
}

#[derive(Debug, Deserialize)]
struct DiscountFixture {
    #[serde(default)]
    id: Option<String>,
    code: String,
    discount: DiscountKindFixture,
    #[serde(default = "active_by_default")]
    active: bool,
    #[serde(default)]
    minimum_subtotal: Option<String>,
    #[serde(default)]
    usage_limit: Option<u32>,
    #[serde(default)]
    times_used: u32,
}

/// Discount value from YAML
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DiscountKindFixture {
    /// Percent points, with or without a trailing `%` (e.g., "10%")
    Percentage { value: String },

    /// Fixed amount off (e.g., "5.00 GBP")
    FixedAmount { value: String },
}

fn active_by_default() -> bool {
    true
}

/// Products and discount rules in a single currency.
#[derive(Debug, Clone)]
pub struct Catalog {
    currency: &'static Currency,
    products: BTreeMap<ProductId, Product>,
    codes: CodeBook,
}

impl Catalog {
    /// An empty catalog.
    pub fn new(currency: &'static Currency) -> Self {
        Self {
            currency,
            products: BTreeMap::new(),
            codes: CodeBook::new(),
        }
    }

    /// Load a catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents are invalid.
    pub fn from_file(
        path: impl AsRef<Path>,
        currency: &'static Currency,
    ) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let catalog = Self::from_yaml_str(&contents, currency)?;

        debug!(
            path = %path.display(),
            products = catalog.products.len(),
            codes = catalog.codes.len(),
            "loaded catalog"
        );

        Ok(catalog)
    }

    /// Parse a catalog from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed, a price or percentage cannot be
    /// parsed, a price is in another currency, a product's sale price is above its
    /// base price, or a discount code is listed twice.
    pub fn from_yaml_str(
        contents: &str,
        currency: &'static Currency,
    ) -> Result<Self, CatalogError> {
        let fixture: CatalogFixture = serde_norway::from_str(contents)?;
        let mut catalog = Self::new(currency);

        for (key, product_fixture) in fixture.products {
            let product = catalog.product_from_fixture(ProductId::new(key), product_fixture)?;

            catalog.products.insert(product.id.clone(), product);
        }

        for discount_fixture in fixture.discounts {
            let rule = catalog.rule_from_fixture(discount_fixture)?;
            let code = rule.discount.code.clone();

            if catalog.codes.insert(rule).is_some() {
                return Err(CatalogError::DuplicateCode(code));
            }
        }

        Ok(catalog)
    }

    /// Get a product by its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::ProductNotFound`] if there is no such product.
    pub fn product(&self, id: &str) -> Result<&Product, CatalogError> {
        self.products
            .get(&ProductId::new(id))
            .ok_or_else(|| CatalogError::ProductNotFound(id.to_string()))
    }

    /// Iterate over products ordered by identifier.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Discount rules.
    pub fn codes(&self) -> &CodeBook {
        &self.codes
    }

    /// Currency of every price in the catalog.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    fn product_from_fixture(
        &self,
        id: ProductId,
        fixture: ProductFixture,
    ) -> Result<Product, CatalogError> {
        let mut product = Product::new(id, fixture.name, self.price(&fixture.price)?)
            .with_colors(fixture.colors)
            .with_sizes(fixture.sizes)
            .with_stock(fixture.stock);

        if let Some(discount_price) = fixture.discount_price {
            product = product.with_discount_price(self.price(&discount_price)?);
        }

        product.validate()?;

        Ok(product)
    }

    fn rule_from_fixture(&self, fixture: DiscountFixture) -> Result<DiscountRule, CatalogError> {
        let kind = match fixture.discount {
            DiscountKindFixture::Percentage { value } => {
                DiscountKind::Percentage { value: parse_percentage(&value)? }
            }
            DiscountKindFixture::FixedAmount { value } => {
                DiscountKind::FixedAmount { value: self.price(&value)? }
            }
        };

        let code = fixture.code.trim().to_string();

        let mut rule = DiscountRule::new(DiscountCode {
            id: fixture.id.unwrap_or_else(|| code.to_lowercase()),
            code,
            kind,
        });

        rule.active = fixture.active;
        rule.usage_limit = fixture.usage_limit;
        rule.times_used = fixture.times_used;
        rule.minimum_subtotal = fixture
            .minimum_subtotal
            .as_deref()
            .map(|minimum| self.price(minimum))
            .transpose()?;

        Ok(rule)
    }

    fn price(&self, s: &str) -> Result<Money<'static, Currency>, CatalogError> {
        let price = parse_price(s)?;

        if price.currency() != self.currency {
            return Err(CatalogError::CurrencyMismatch(
                self.currency.iso_alpha_code,
                price.currency().iso_alpha_code,
            ));
        }

        Ok(price)
    }
}

/// Parse percent points such as "10%" or "12.5" into a decimal between 0 and 100.
fn parse_percentage(s: &str) -> Result<Decimal, CatalogError> {
    let trimmed = s.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();

    let percent =
        Decimal::from_str(number).map_err(|_err| CatalogError::InvalidPercentage(s.to_string()))?;

    if percent.is_sign_negative() || percent > Decimal::ONE_HUNDRED {
        return Err(CatalogError::InvalidPercentage(s.to_string()));
    }

    Ok(percent)
}
