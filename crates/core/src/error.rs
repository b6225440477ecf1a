//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// availability, invariants). Storage failures belong to the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A request field failed validation. `field` names the offending input.
    #[error("validation failed on `{field}`: {message}")]
    Validation { field: String, message: String },

    /// A catalog item is manually marked unavailable; carries the item name.
    #[error("item unavailable: {0}")]
    UnavailableItem(String),

    /// A floor or item outside the configured set was referenced.
    #[error("not found: {0}")]
    NotFound(String),

    /// A domain invariant was violated (e.g. a backward status transition).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(item: impl Into<String>) -> Self {
        Self::UnavailableItem(item.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// The input field this error refers to, when there is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::UnavailableItem(_) => Some("items"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_the_field() {
        let err = DomainError::validation("items[0].quantity", "must be positive");
        assert_eq!(err.field(), Some("items[0].quantity"));
        assert_eq!(
            err.to_string(),
            "validation failed on `items[0].quantity`: must be positive"
        );
    }

    #[test]
    fn unavailable_error_names_the_item() {
        let err = DomainError::unavailable("Tapete");
        assert_eq!(err.to_string(), "item unavailable: Tapete");
    }
}
