//! Write-side orchestration for floor staff and admins.
//!
//! ## Engines
//!
//! ```text
//! floor client ──► RequestEngine ──┐
//!                                  ├──► LinenStore (catalog, stock, movements, change feed)
//! admin client ──► FulfillmentEngine ┘
//! ```
//!
//! Engines validate what needs no stored state, hand the write to the store as
//! one unit of work, and log the outcome. Rules that depend on stored state
//! (catalog availability) are checked by the store inside its transaction.
//!
//! ## Error Mapping
//!
//! Domain and store failures are folded into [`EngineError`]; a domain error
//! raised inside the store (`StoreError::Rejected`) surfaces as the same
//! variant it would have produced outside it.

mod fulfillment;
mod request;

pub use fulfillment::{ClearReceipt, FulfillmentEngine, SupplyReceipt};
pub use request::{RequestEngine, RequestReceipt};

use thiserror::Error;

use linenroom_core::DomainError;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input; `field` names the offending input.
    #[error("validation failed on `{field}`: {message}")]
    Validation { field: String, message: String },

    /// A requested item is marked unavailable.
    #[error("item unavailable: {0}")]
    UnavailableItem(String),

    /// Unknown floor or catalog item.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    /// The backend failed; nothing was written.
    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl EngineError {
    /// The input field to point at in an error response.
    pub fn field(&self) -> Option<&str> {
        match self {
            EngineError::Validation { field, .. } => Some(field),
            EngineError::UnavailableItem(_) => Some("items"),
            _ => None,
        }
    }
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation { field, message } => EngineError::Validation { field, message },
            DomainError::UnavailableItem(item) => EngineError::UnavailableItem(item),
            DomainError::NotFound(what) => EngineError::NotFound(what),
            DomainError::InvariantViolation(msg) => EngineError::Invariant(msg),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Rejected(domain) => domain.into(),
            other => EngineError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_store_writes_keep_their_domain_meaning() {
        let err: EngineError = StoreError::Rejected(DomainError::unavailable("Tapete")).into();
        assert!(matches!(err, EngineError::UnavailableItem(ref item) if item == "Tapete"));
        assert_eq!(err.field(), Some("items"));

        let err: EngineError = StoreError::Poisoned.into();
        assert!(matches!(err, EngineError::Storage(_)));
        assert_eq!(err.field(), None);
    }

    #[test]
    fn validation_keeps_the_field() {
        let err: EngineError = DomainError::validation("items[2].quantity", "must be positive").into();
        assert_eq!(err.field(), Some("items[2].quantity"));
    }
}
