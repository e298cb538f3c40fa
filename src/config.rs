//! Catalog configuration.

use crate::catalog::schemas::CatalogSchemas;

/// What a catalog engine is wired with: the collections it owns and the
/// schema generation the store enforces.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    pub products_collection: String,
    pub photos_collection: String,
    pub schemas: CatalogSchemas,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            products_collection: "product".to_string(),
            photos_collection: "photo".to_string(),
            schemas: CatalogSchemas::latest(),
        }
    }
}
