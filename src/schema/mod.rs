//! Versioned schema definitions and the structural validator.

mod errors;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaResult};
pub use types::{
    BranchPath, DocumentSchema, FieldPath, FieldType, Keyword, ObjectSchema, PathSegment,
    SchemaDef, UnionBranch, UnionSchema, Violation,
};
pub use validator::validate_document;
