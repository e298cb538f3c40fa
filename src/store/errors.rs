//! Store error types.
//!
//! The store's own constraint check is deliberately coarse: a rejected
//! document surfaces as `SchemaRejected` with no field-level detail, the
//! way a remote database reports a validator failure by code alone. The
//! catalog layer re-runs domain validation to produce a precise report.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The named collection was never created
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    /// The named collection already exists
    #[error("collection '{0}' already exists")]
    CollectionExists(String),

    /// A document failed the collection's registered schema.
    /// Carries no field detail; see the module docs.
    #[error("document rejected by the schema of collection '{collection}'")]
    SchemaRejected { collection: String },

    /// An insert collided with an existing document id
    #[error("duplicate key '{id}' in collection '{collection}'")]
    DuplicateKey { collection: String, id: String },

    /// The document is not an object with a string `_id`
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// The transaction overlapped a concurrent commit and was aborted.
    /// Transient: safe to retry the whole transaction from scratch.
    #[error("transaction aborted: overlapped a concurrent commit")]
    WriteConflict,
}

impl StoreError {
    /// Whether the caller may safely retry the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::WriteConflict)
    }
}
