//! Visitor identity
//!
//! A random identifier generated once per storage location, standing in for a
//! signed-in user. It never expires.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::CartStorage;

/// Storage key holding the visitor identifier.
pub const VISITOR_ID_KEY: &str = "visitor_id";

/// Visitor identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(Uuid);

impl VisitorId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for VisitorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Return the stored visitor identifier, creating and storing one on first use.
///
/// A usable identifier is always returned. If the new identifier cannot be
/// stored, the failure is logged and the identifier lasts for this session only.
pub fn ensure_visitor_id<S: CartStorage + ?Sized>(storage: &mut S) -> VisitorId {
    match storage.get(VISITOR_ID_KEY) {
        Ok(Some(raw)) => match raw.parse::<VisitorId>() {
            Ok(visitor) => return visitor,
            Err(err) => warn!(error = %err, "stored visitor id is malformed, issuing a new one"),
        },
        Ok(None) => debug!("no visitor id stored, issuing a new one"),
        Err(err) => warn!(error = %err, "failed to read visitor id, issuing a new one"),
    }

    let visitor = VisitorId::generate();

    if let Err(err) = storage.set(VISITOR_ID_KEY, &visitor.to_string()) {
        warn!(error = %err, %visitor, "failed to store visitor id");
    }

    visitor
}

#[cfg(test)]
mod tests {
    use std::io;

    use testresult::TestResult;

    use crate::storage::{MemoryStorage, MockCartStorage, StorageError};

    use super::*;

    #[test]
    fn first_call_creates_and_stores_id() -> TestResult {
        let mut storage = MemoryStorage::new();

        let visitor = ensure_visitor_id(&mut storage);

        assert_eq!(storage.get(VISITOR_ID_KEY)?, Some(visitor.to_string()));

        Ok(())
    }

    #[test]
    fn later_calls_return_the_same_id() {
        let mut storage = MemoryStorage::new();

        let first = ensure_visitor_id(&mut storage);
        let second = ensure_visitor_id(&mut storage);

        assert_eq!(first, second);
    }

    #[test]
    fn malformed_id_is_replaced() -> TestResult {
        let mut storage = MemoryStorage::new();
        storage.set(VISITOR_ID_KEY, "not-a-uuid")?;

        let visitor = ensure_visitor_id(&mut storage);

        assert_eq!(storage.get(VISITOR_ID_KEY)?, Some(visitor.to_string()));

        Ok(())
    }

    #[test]
    fn unwritable_storage_still_yields_an_id() {
        let mut storage = MockCartStorage::new();

        storage.expect_get().returning(|_| Ok(None));
        storage
            .expect_set()
            .times(1)
            .returning(|_, _| Err(StorageError::Io(io::Error::other("read-only"))));

        let visitor = ensure_visitor_id(&mut storage);

        assert_ne!(visitor.as_uuid(), Uuid::nil());
    }

    #[test]
    fn display_round_trips_through_from_str() -> TestResult {
        let visitor = VisitorId::generate();

        assert_eq!(visitor.to_string().parse::<VisitorId>()?, visitor);

        Ok(())
    }
}
