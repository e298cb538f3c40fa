//! The catalog data-integrity engine.
//!
//! Ties the schema, report and store subsystems together: typed Product
//! and Photo records, the validation pipeline producing field-addressed
//! error trees, and the transactional operations guarding the
//! cross-document exposure invariants.

pub mod errors;
pub mod schemas;
pub mod store;
pub mod types;
pub mod validate;

pub use errors::{CatalogError, CatalogResult};
pub use schemas::CatalogSchemas;
pub use store::CatalogStore;
pub use types::{
    Photo, PhotoDraft, PhotoId, PhotoOrder, Product, ProductId, PublicityChange, SortDir,
    SortSpec, UpdateSpec,
};
pub use validate::{validate_photo_drafts, validate_product, validate_with};
