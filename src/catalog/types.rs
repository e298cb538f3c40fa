//! Catalog record types and operation inputs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::errors::{CatalogError, CatalogResult};

/// Product identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(Uuid);

impl ProductId {
    pub fn generate() -> Self {
        ProductId(Uuid::new_v4())
    }

    /// Parses an identifier argument; malformed input is an
    /// `InvalidCriterion`, terminal for the calling operation.
    pub fn parse(s: &str) -> CatalogResult<Self> {
        Uuid::parse_str(s)
            .map(ProductId)
            .map_err(|_| CatalogError::InvalidCriterion(format!("malformed product id '{s}'")))
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Photo identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(Uuid);

impl PhotoId {
    pub fn generate() -> Self {
        PhotoId(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> CatalogResult<Self> {
        Uuid::parse_str(s)
            .map(PhotoId)
            .map_err(|_| CatalogError::InvalidCriterion(format!("malformed photo id '{s}'")))
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A product's stored scalar attributes. Photo links are derived from the
/// Photo collection's back-reference and are not part of this record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub expose: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_in_stock: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

/// A photo document. Always attached to a product; `order` exists exactly
/// while the photo is public.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(rename = "_id")]
    pub id: PhotoId,
    pub product_id: ProductId,
    pub path: String,
    pub public: bool,
    pub cover: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl Photo {
    /// A freshly attached photo: private, not the cover, unordered.
    pub fn attached(product_id: ProductId, path: impl Into<String>) -> Self {
        Self {
            id: PhotoId::generate(),
            product_id,
            path: path.into(),
            public: false,
            cover: false,
            order: None,
        }
    }
}

/// Caller input for attaching a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoDraft {
    pub path: String,
}

/// One entry of a full reorder of a product's public photos.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhotoOrder {
    pub id: String,
    pub order: i64,
}

/// One publicity change.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublicityChange {
    pub id: String,
    pub public: bool,
}

/// A partial product mutation: fields to set and fields to remove.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSpec {
    pub write: Option<Map<String, Value>>,
    pub remove: Option<Vec<String>>,
}

/// Sort direction for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

/// One sort criterion for product listings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub dir: SortDir,
}
