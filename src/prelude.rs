//! Trolley prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError, CartLine, CartStore, VariantKey, persistence::CartPersistence},
    catalog::{Catalog, CatalogError},
    discounts::{
        CodeBook, DiscountCode, DiscountError, DiscountEvaluator, DiscountKind, DiscountRejection,
        DiscountRule,
    },
    orders::{
        JsonFileOrderPlacer, OrderConfirmation, OrderError, OrderPlacer, OrderSubmission,
    },
    pricing::{PriceError, TotalPriceError, format_price, parse_price},
    products::{Product, ProductError, ProductId},
    storage::{CartStorage, FileStorage, MemoryStorage, StorageError, VisitorId},
    summary::{SummaryError, write_summary},
};
