//! Report error types.

use thiserror::Error;

/// Result type for report construction
pub type ReportResult<T> = Result<T, ReportError>;

/// Internal failures while building or transforming a report.
///
/// None of these are user-correctable; they indicate a defect either
/// upstream of the builder or in the schema definitions themselves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// An `additionalProperties` violation reached the builder. The
    /// validator intercepts undeclared fields before any report exists, so
    /// seeing one here means the interception was bypassed.
    #[error("document contains fields outside the modeled schema")]
    UndeclaredField,

    /// The violations contradict the shape the schema promises, e.g. a
    /// field addressed both as an object member and as an array element,
    /// or a union whose branches fail to disambiguate.
    #[error("schema-authoring defect: {0}")]
    SchemaDefect(String),
}
