//! Schema error types.
//!
//! Structural violations are data, not errors; `SchemaError` is reserved
//! for conditions that indicate a defect rather than bad user input.

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Hard failures raised during structural validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The document carries a field the modeled schema does not declare.
    ///
    /// The modeled schema is exhaustive by construction, so this is a
    /// pre-validation encoding bug upstream of the validator, never a
    /// user-correctable input error. It is unconditional: no branch of a
    /// union tolerates undeclared fields.
    #[error("document contains fields outside the modeled schema: '{field}'")]
    UndeclaredField { field: String },
}
