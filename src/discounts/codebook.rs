//! Code book
//!
//! A [`DiscountEvaluator`] backed by a fixed set of rules, typically loaded from the catalog.

use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};

use crate::{
    cart::lines::CartLine,
    discounts::{
        DiscountCode, DiscountError, DiscountEvaluator, DiscountRejection, discount_amount,
    },
    pricing::format_price,
};

/// Eligibility rules for one discount code.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountRule {
    /// The code handed out when the rule passes
    pub discount: DiscountCode,

    /// Whether the code can currently be redeemed
    pub active: bool,

    /// Smallest subtotal the code applies to
    pub minimum_subtotal: Option<Money<'static, Currency>>,

    /// Maximum number of redemptions
    pub usage_limit: Option<u32>,

    /// Redemptions recorded in the catalog when it was loaded.
    ///
    /// This is a snapshot: validating a code or checking out never increments it.
    pub times_used: u32,
}

impl DiscountRule {
    /// An active rule with no minimum and no usage limit.
    pub fn new(discount: DiscountCode) -> Self {
        Self {
            discount,
            active: true,
            minimum_subtotal: None,
            usage_limit: None,
            times_used: 0,
        }
    }

    fn check(&self, subtotal: &Money<'static, Currency>) -> Result<(), DiscountRejection> {
        let code = &self.discount.code;

        if !self.active {
            return Err(DiscountRejection::Inactive(code.clone()));
        }

        if self
            .usage_limit
            .is_some_and(|limit| self.times_used >= limit)
        {
            return Err(DiscountRejection::UsageLimitReached(code.clone()));
        }

        if let Some(minimum) = self.minimum_subtotal
            && subtotal.to_minor_units() < minimum.to_minor_units()
        {
            return Err(DiscountRejection::BelowMinimum(
                code.clone(),
                format_price(&minimum),
            ));
        }

        Ok(())
    }
}

/// Discount rules keyed by their normalised code.
///
/// Codes are matched case-insensitively and ignoring surrounding whitespace.
#[derive(Debug, Clone, Default)]
pub struct CodeBook {
    rules: FxHashMap<String, DiscountRule>,
}

impl CodeBook {
    /// Create an empty code book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, returning any rule previously registered under the same code.
    pub fn insert(&mut self, rule: DiscountRule) -> Option<DiscountRule> {
        self.rules.insert(normalise(&rule.discount.code), rule)
    }

    /// Look up the rule for a code.
    pub fn get(&self, code: &str) -> Option<&DiscountRule> {
        self.rules.get(&normalise(code))
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<DiscountRule> for CodeBook {
    fn from_iter<I: IntoIterator<Item = DiscountRule>>(iter: I) -> Self {
        let mut book = Self::new();

        for rule in iter {
            book.insert(rule);
        }

        book
    }
}

impl DiscountEvaluator for CodeBook {
    fn validate(
        &self,
        code: &str,
        subtotal: &Money<'static, Currency>,
        lines: &[CartLine],
    ) -> Result<DiscountCode, DiscountRejection> {
        if lines.is_empty() {
            return Err(DiscountRejection::EmptyCart);
        }

        let rule = self
            .get(code)
            .ok_or_else(|| DiscountRejection::UnknownCode(code.trim().to_string()))?;

        rule.check(subtotal)?;

        Ok(rule.discount.clone())
    }

    fn compute_amount(
        &self,
        discount: &DiscountCode,
        subtotal: &Money<'static, Currency>,
        _lines: &[CartLine],
    ) -> Result<Money<'static, Currency>, DiscountError> {
        discount_amount(&discount.kind, subtotal)
    }
}

fn normalise(code: &str) -> String {
    code.trim().to_uppercase()
}
