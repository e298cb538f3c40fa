//! merchdb - a transactional e-commerce catalog engine
//!
//! Validates catalog documents against versioned discriminated-union
//! schemas, reports failures as field-addressed error trees, and runs
//! cross-document photo/product mutations inside snapshot transactions.

pub mod catalog;
pub mod config;
pub mod report;
pub mod schema;
pub mod store;
