//! Catalog error types.
//!
//! `CatalogError` is the single error surface of the engine. Raw store
//! codes never escape: every persistence-level rejection is mapped here at
//! the store boundary, and every variant answers for its `ErrorKind`
//! exhaustively.

use thiserror::Error;

use crate::report::{ErrorKind, ErrorTree};
use crate::schema::SchemaError;
use crate::store::StoreError;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors surfaced by the catalog engine.
#[derive(Debug, PartialEq, Error)]
pub enum CatalogError {
    /// A product or photo the operation depends on does not exist.
    /// Terminal for the calling operation.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The submitted data is invalid; `report` carries the field-level
    /// tree when one could be produced.
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        report: Option<ErrorTree>,
    },

    /// A malformed identifier argument. Terminal, never retried.
    #[error("invalid criterion: {0}")]
    InvalidCriterion(String),

    /// The store rejected data that passes domain validation: the domain
    /// model and the storage schema have drifted. Surfaced to operators,
    /// never silently retried.
    #[error("validation conflict: {0}")]
    ValidationConflict(String),

    /// The transaction overlapped a concurrent commit. Transient; the
    /// caller may retry the whole operation from scratch. The engine
    /// issues no implicit retries.
    #[error("transaction aborted by a concurrent commit")]
    WriteConflict,

    /// A broken internal invariant, e.g. a document read inside a
    /// transaction that vanished before the paired write.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl CatalogError {
    /// A validation failure without a field-level report
    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation {
            message: message.into(),
            report: None,
        }
    }

    /// A validation failure with a field-level report
    pub fn validation_report(message: impl Into<String>, report: ErrorTree) -> Self {
        CatalogError::Validation {
            message: message.into(),
            report: Some(report),
        }
    }

    /// The wire-level kind of this error, for variants surfaced to
    /// callers as report descriptors. `WriteConflict` and `Internal` are
    /// operational conditions without a descriptor kind.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CatalogError::NotFound(_) => Some(ErrorKind::ResourceNotFound),
            CatalogError::Validation { .. } => Some(ErrorKind::ValidationError),
            CatalogError::InvalidCriterion(_) => Some(ErrorKind::InvalidCriterion),
            CatalogError::ValidationConflict(_) => Some(ErrorKind::ValidationConflict),
            CatalogError::WriteConflict => None,
            CatalogError::Internal(_) => None,
        }
    }

    /// Whether the caller may safely retry the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::WriteConflict)
    }

    /// The field-level report, when one exists
    pub fn report(&self) -> Option<&ErrorTree> {
        match self {
            CatalogError::Validation { report, .. } => report.as_ref(),
            _ => None,
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::WriteConflict => CatalogError::WriteConflict,
            // A bare rejection reaching this conversion had no second
            // validation pass to refine it.
            StoreError::SchemaRejected { .. } => CatalogError::validation("data validation failed"),
            StoreError::DuplicateKey { collection, id } => CatalogError::ValidationConflict(
                format!("duplicate key '{id}' in collection '{collection}'"),
            ),
            StoreError::UnknownCollection(_)
            | StoreError::CollectionExists(_)
            | StoreError::MalformedDocument(_) => CatalogError::Internal(e.to_string()),
        }
    }
}

impl From<SchemaError> for CatalogError {
    fn from(e: SchemaError) -> Self {
        CatalogError::Internal(e.to_string())
    }
}

impl From<crate::report::ReportError> for CatalogError {
    fn from(e: crate::report::ReportError) -> Self {
        CatalogError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_exhaustive_over_surfaced_variants() {
        assert_eq!(
            CatalogError::NotFound("x".into()).kind(),
            Some(ErrorKind::ResourceNotFound)
        );
        assert_eq!(
            CatalogError::validation("x").kind(),
            Some(ErrorKind::ValidationError)
        );
        assert_eq!(
            CatalogError::InvalidCriterion("x".into()).kind(),
            Some(ErrorKind::InvalidCriterion)
        );
        assert_eq!(
            CatalogError::ValidationConflict("x".into()).kind(),
            Some(ErrorKind::ValidationConflict)
        );
        assert_eq!(CatalogError::WriteConflict.kind(), None);
    }

    #[test]
    fn test_only_write_conflict_is_retryable() {
        assert!(CatalogError::WriteConflict.is_retryable());
        assert!(!CatalogError::NotFound("x".into()).is_retryable());
        assert!(!CatalogError::ValidationConflict("x".into()).is_retryable());
    }

    #[test]
    fn test_store_conflict_maps_to_write_conflict() {
        assert_eq!(
            CatalogError::from(StoreError::WriteConflict),
            CatalogError::WriteConflict
        );
    }
}
