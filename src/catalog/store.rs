//! Transactional catalog operations.
//!
//! Every multi-document operation runs inside a single store transaction:
//! precondition reads, the writes they justify, and any forced
//! consequence (clearing `expose` when a product loses its last public
//! photo or its cover) commit together or not at all.
//!
//! Writes are optimistic. Domain validation runs first; if the store's
//! registered schema still rejects the final document, the document is
//! validated a second time against the stored schema. A second pass that
//! produces a report means the data really is invalid; a clean second
//! pass means the domain model and the storage schema have drifted, which
//! surfaces as `ValidationConflict` for operators.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::store::{Datastore, StoreError, Transaction};

use super::errors::{CatalogError, CatalogResult};
use super::types::{
    Photo, PhotoDraft, PhotoId, PhotoOrder, Product, ProductId, PublicityChange, SortDir,
    SortSpec, UpdateSpec,
};
use super::validate;

/// The catalog engine: a datastore handle plus the schema generation it
/// is wired with.
#[derive(Clone)]
pub struct CatalogStore {
    db: Datastore,
    config: CatalogConfig,
}

impl CatalogStore {
    /// Opens the catalog over a datastore, creating its collections with
    /// their registered schemas when absent.
    pub fn open(db: Datastore, config: CatalogConfig) -> CatalogResult<Self> {
        if !db.collection_exists(&config.products_collection) {
            db.create_collection(
                &config.products_collection,
                Some(config.schemas.product_stored.clone()),
            )?;
        }
        if !db.collection_exists(&config.photos_collection) {
            db.create_collection(
                &config.photos_collection,
                Some(config.schemas.photo_stored.clone()),
            )?;
        }
        Ok(Self { db, config })
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    /// Creates a product from caller-submitted fields.
    ///
    /// A new product has no photos yet, so `expose: true` can never
    /// satisfy the exposure preconditions and is refused outright.
    pub fn create(&self, fields: &Value) -> CatalogResult<ProductId> {
        if let Some(report) = validate::validate_product(&self.config.schemas, fields)? {
            return Err(CatalogError::validation_report(
                "data validation failed",
                report,
            ));
        }
        if fields.get("expose") == Some(&Value::Bool(true)) {
            return Err(CatalogError::validation(
                "can't expose the product: no public photos and no cover photo",
            ));
        }

        let id = ProductId::generate();
        let mut doc = match fields {
            Value::Object(map) => map.clone(),
            // validation guarantees an object here
            _ => return Err(CatalogError::Internal("validated input is not an object".into())),
        };
        // photo links are derived from the photo collection, never stored
        doc.remove("photos");
        doc.remove("photos_all");
        doc.remove("cover_photo");
        doc.insert("_id".to_string(), Value::String(id.to_string()));
        doc.entry("time".to_string())
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));

        let doc = Value::Object(doc);
        match self.db.insert(&self.config.products_collection, doc.clone()) {
            Ok(_) => {
                debug!(product = %id, "product created");
                Ok(id)
            }
            Err(StoreError::SchemaRejected { .. }) => Err(self.rejected_product_write(&doc)),
            Err(e) => Err(e.into()),
        }
    }

    /// Applies a partial mutation to a product. Returns whether the
    /// stored document actually changed.
    pub fn update(&self, id: &str, spec: &UpdateSpec) -> CatalogResult<bool> {
        let id = ProductId::parse(id)?;
        let set = spec.write.clone().unwrap_or_default();
        let unset = spec.remove.clone().unwrap_or_default();

        if set.contains_key("_id") || unset.iter().any(|f| f == "_id") {
            return Err(CatalogError::validation_report(
                "content contains an id",
                id_rewrite_report(),
            ));
        }

        self.db.with_transaction(|txn| {
            let doc = self
                .product_doc(txn, &id)?
                .ok_or_else(|| CatalogError::NotFound("given product doesn't exist".into()))?;

            if set.get("expose") == Some(&Value::Bool(true)) {
                self.check_exposable(txn, &id)?;
            }

            match txn.update(&self.config.products_collection, &id.to_string(), &set, &unset) {
                Ok(Some(modified)) => Ok(modified),
                Ok(None) => Err(CatalogError::Internal(
                    "product found during read but not matched during update".into(),
                )),
                Err(StoreError::SchemaRejected { .. }) => {
                    let merged = apply_mutation(doc, &set, &unset);
                    Err(self.rejected_product_write(&merged))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Deletes a product and every photo attached to it.
    pub fn delete(&self, id: &str) -> CatalogResult<()> {
        let id = ProductId::parse(id)?;
        self.db.with_transaction(|txn| {
            if !txn.delete(&self.config.products_collection, &id.to_string())? {
                return Err(CatalogError::InvalidCriterion(
                    "id must be of an existing document: no document found with given id".into(),
                ));
            }
            for photo in self.photos_of(txn, &id)? {
                txn.delete(&self.config.photos_collection, &photo.id.to_string())?;
            }
            debug!(product = %id, "product deleted");
            Ok(())
        })
    }

    /// Reads one product by id.
    pub fn get_by_id(&self, id: &str) -> CatalogResult<Option<Product>> {
        let id = ProductId::parse(id)?;
        match self.db.get(&self.config.products_collection, &id.to_string())? {
            Some(doc) => Ok(Some(decode(doc)?)),
            None => Ok(None),
        }
    }

    /// Lists products, optionally filtered by `expose` and `is_in_stock`,
    /// sorted by the given criteria in order of priority.
    pub fn get_many(
        &self,
        expose: Option<bool>,
        in_stock: Option<bool>,
        sort: &[SortSpec],
    ) -> CatalogResult<Vec<Product>> {
        let mut docs: Vec<Value> = self
            .db
            .scan(&self.config.products_collection)?
            .into_iter()
            .filter(|doc| {
                expose.map_or(true, |want| doc.get("expose") == Some(&Value::Bool(want)))
                    && in_stock
                        .map_or(true, |want| doc.get("is_in_stock") == Some(&Value::Bool(want)))
            })
            .collect();

        docs.sort_by(|a, b| {
            for spec in sort {
                let ord = cmp_values(a.get(&spec.field), b.get(&spec.field));
                let ord = match spec.dir {
                    SortDir::Asc => ord,
                    SortDir::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        docs.into_iter().map(decode).collect()
    }

    // ------------------------------------------------------------------
    // Photos
    // ------------------------------------------------------------------

    /// Attaches new photos to a product. Each arrives private, unordered
    /// and not the cover.
    pub fn add_photos(&self, product_id: &str, drafts: &[PhotoDraft]) -> CatalogResult<Vec<PhotoId>> {
        let product_id = ProductId::parse(product_id)?;
        if let Some(report) = validate::validate_photo_drafts(&self.config.schemas, drafts)? {
            return Err(CatalogError::validation_report(
                "data validation failed",
                report,
            ));
        }

        self.db.with_transaction(|txn| {
            self.require_product(txn, &product_id)?;
            if drafts.is_empty() {
                return Ok(Vec::new());
            }

            let photos: Vec<Photo> = drafts
                .iter()
                .map(|d| Photo::attached(product_id, d.path.clone()))
                .collect();
            let docs = photos.iter().map(encode).collect::<CatalogResult<Vec<_>>>()?;

            match txn.insert_many(&self.config.photos_collection, docs.clone()) {
                Ok(ids) if ids.len() == photos.len() => {
                    debug!(product = %product_id, count = photos.len(), "photos attached");
                    Ok(photos.into_iter().map(|p| p.id).collect())
                }
                Ok(ids) => Err(CatalogError::Internal(format!(
                    "inserted {} photos out of {}",
                    ids.len(),
                    photos.len()
                ))),
                Err(StoreError::SchemaRejected { .. }) => Err(self.rejected_photo_batch(&docs)),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Detaches photos from a product. Every given id must belong to the
    /// product; losing the last public photo or the cover clears
    /// `expose`.
    pub fn remove_photos(&self, product_id: &str, photo_ids: &[String]) -> CatalogResult<()> {
        let product_id = ProductId::parse(product_id)?;
        let photo_ids = photo_ids
            .iter()
            .map(|s| PhotoId::parse(s))
            .collect::<CatalogResult<BTreeSet<PhotoId>>>()?;

        self.db.with_transaction(|txn| {
            self.require_product(txn, &product_id)?;

            for photo_id in &photo_ids {
                match self.photo_doc(txn, photo_id)? {
                    Some(photo) if photo.product_id == product_id => {}
                    _ => {
                        return Err(CatalogError::NotFound(
                            "not all given photos belong to the given product".into(),
                        ))
                    }
                }
            }
            for photo_id in &photo_ids {
                txn.delete(&self.config.photos_collection, &photo_id.to_string())?;
            }

            if self.is_exposed(txn, &product_id)? {
                let publics = self.public_photos_of(txn, &product_id)?;
                let cover = self.cover_photo_of(txn, &product_id)?;
                if publics.is_empty() || cover.is_none() {
                    self.clear_expose(txn, &product_id)?;
                }
            }
            Ok(())
        })
    }

    /// Replaces the display order of a product's public photos. The
    /// request must cover exactly the product's public photos, each once.
    pub fn reorder_photos(&self, product_id: &str, orders: &[PhotoOrder]) -> CatalogResult<()> {
        let product_id = ProductId::parse(product_id)?;
        let mut parsed = Vec::with_capacity(orders.len());
        for entry in orders {
            parsed.push((PhotoId::parse(&entry.id)?, entry.order));
        }

        self.db.with_transaction(|txn| {
            self.require_product(txn, &product_id)?;

            let publics = self.public_photos_of(txn, &product_id)?;
            let distinct: BTreeSet<PhotoId> = parsed.iter().map(|(id, _)| *id).collect();
            // photo ids must be distinct; order value uniqueness is the
            // caller's to uphold
            if distinct.len() != parsed.len() || parsed.len() != publics.len() {
                return Err(CatalogError::validation(
                    "must pass all photos, relating to the given product and only the photos \
                     that relate to the given product",
                ));
            }

            for (photo_id, order) in &parsed {
                let owned_public = publics.iter().any(|p| p.id == *photo_id);
                if !owned_public {
                    return Err(CatalogError::NotFound(
                        "given photo doesn't belong to the given product or isn't public".into(),
                    ));
                }
                let mut set = Map::new();
                set.insert("order".to_string(), Value::from(*order));
                self.update_photo(txn, photo_id, &set, &[])?;
            }
            Ok(())
        })
    }

    /// Publishes or hides photos. A photo turning public is appended at
    /// the end of the display order; a photo turning private loses its
    /// order. Hiding the last public photo clears the product's `expose`.
    pub fn update_photos_publicity(
        &self,
        product_id: &str,
        changes: &[PublicityChange],
    ) -> CatalogResult<()> {
        let product_id = ProductId::parse(product_id)?;
        let mut parsed = Vec::with_capacity(changes.len());
        for change in changes {
            parsed.push((PhotoId::parse(&change.id)?, change.public));
        }

        self.db.with_transaction(|txn| {
            self.require_product(txn, &product_id)?;

            for (photo_id, public) in &parsed {
                let photo = match self.photo_doc(txn, photo_id)? {
                    Some(photo) if photo.product_id == product_id => photo,
                    _ => {
                        return Err(CatalogError::NotFound(
                            "a photo with given id, referencing the given product doesn't exist"
                                .into(),
                        ))
                    }
                };
                if photo.public == *public {
                    continue;
                }

                if *public {
                    // publics may have changed earlier in this batch
                    let order = self
                        .public_photos_of(txn, &product_id)?
                        .iter()
                        .filter_map(|p| p.order)
                        .max()
                        .map_or(0, |max| max + 1);
                    let mut set = Map::new();
                    set.insert("public".to_string(), Value::Bool(true));
                    set.insert("order".to_string(), Value::from(order));
                    self.update_photo(txn, photo_id, &set, &[])?;
                } else {
                    let mut set = Map::new();
                    set.insert("public".to_string(), Value::Bool(false));
                    self.update_photo(txn, photo_id, &set, &["order".to_string()])?;
                }
            }

            if self.is_exposed(txn, &product_id)?
                && self.public_photos_of(txn, &product_id)?.is_empty()
            {
                self.clear_expose(txn, &product_id)?;
            }
            Ok(())
        })
    }

    /// Marks a photo as the product's cover, or strips the mark. A
    /// product has at most one cover; losing it clears `expose`.
    pub fn set_cover_photo(&self, product_id: &str, photo_id: &str, cover: bool) -> CatalogResult<()> {
        let product_id = ProductId::parse(product_id)?;
        let photo_id = PhotoId::parse(photo_id)?;

        self.db.with_transaction(|txn| {
            self.require_product(txn, &product_id)?;

            let target = match self.photo_doc(txn, &photo_id)? {
                Some(photo) if photo.product_id == product_id => photo,
                _ => {
                    return Err(CatalogError::NotFound(
                        "given photo doesn't belong to the given product".into(),
                    ))
                }
            };

            let mut set_cover = |txn: &mut Transaction, id: &PhotoId, value: bool| {
                let mut set = Map::new();
                set.insert("cover".to_string(), Value::Bool(value));
                self.update_photo(txn, id, &set, &[])
            };

            if cover {
                if let Some(current) = self.cover_photo_of(txn, &product_id)? {
                    if current.id != photo_id {
                        set_cover(txn, &current.id, false)?;
                    }
                }
                if !target.cover {
                    set_cover(txn, &photo_id, true)?;
                }
            } else {
                if target.cover {
                    set_cover(txn, &photo_id, false)?;
                }
                if self.is_exposed(txn, &product_id)? {
                    self.clear_expose(txn, &product_id)?;
                }
            }
            Ok(())
        })
    }

    /// A product's photos: public ones first, in display order, then the
    /// private ones.
    pub fn photos(&self, product_id: &str) -> CatalogResult<Vec<Photo>> {
        let product_id = ProductId::parse(product_id)?;
        let mut photos: Vec<Photo> = self
            .db
            .scan(&self.config.photos_collection)?
            .into_iter()
            .map(decode::<Photo>)
            .collect::<CatalogResult<Vec<_>>>()?
            .into_iter()
            .filter(|p| p.product_id == product_id)
            .collect();

        photos.sort_by(|a, b| match (a.order, b.order) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        Ok(photos)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn product_doc(&self, txn: &Transaction, id: &ProductId) -> CatalogResult<Option<Value>> {
        Ok(txn
            .get(&self.config.products_collection, &id.to_string())?
            .cloned())
    }

    fn require_product(&self, txn: &Transaction, id: &ProductId) -> CatalogResult<()> {
        self.product_doc(txn, id)?
            .map(|_| ())
            .ok_or_else(|| CatalogError::NotFound("given product doesn't exist".into()))
    }

    fn is_exposed(&self, txn: &Transaction, id: &ProductId) -> CatalogResult<bool> {
        Ok(self
            .product_doc(txn, id)?
            .map_or(false, |doc| doc.get("expose") == Some(&Value::Bool(true))))
    }

    fn photo_doc(&self, txn: &Transaction, id: &PhotoId) -> CatalogResult<Option<Photo>> {
        match txn.get(&self.config.photos_collection, &id.to_string())? {
            Some(doc) => Ok(Some(decode(doc.clone())?)),
            None => Ok(None),
        }
    }

    fn photos_of(&self, txn: &Transaction, product_id: &ProductId) -> CatalogResult<Vec<Photo>> {
        txn.scan(&self.config.photos_collection)?
            .into_iter()
            .map(|doc| decode::<Photo>(doc.clone()))
            .filter(|p| p.as_ref().map_or(true, |p| p.product_id == *product_id))
            .collect()
    }

    fn public_photos_of(
        &self,
        txn: &Transaction,
        product_id: &ProductId,
    ) -> CatalogResult<Vec<Photo>> {
        Ok(self
            .photos_of(txn, product_id)?
            .into_iter()
            .filter(|p| p.public)
            .collect())
    }

    fn cover_photo_of(
        &self,
        txn: &Transaction,
        product_id: &ProductId,
    ) -> CatalogResult<Option<Photo>> {
        Ok(self
            .photos_of(txn, product_id)?
            .into_iter()
            .find(|p| p.cover))
    }

    /// Fails unless the product has at least one public photo and a
    /// cover photo.
    fn check_exposable(&self, txn: &Transaction, id: &ProductId) -> CatalogResult<()> {
        let publics = self.public_photos_of(txn, id)?;
        let cover = self.cover_photo_of(txn, id)?;
        if publics.is_empty() || cover.is_none() {
            return Err(CatalogError::validation(
                "can't set expose to true: product has no public photos and/or cover photo",
            ));
        }
        Ok(())
    }

    /// Forces `expose` back to false after a photo change invalidated the
    /// exposure preconditions. A rejection here is drift between the
    /// stored schema and the engine, not bad caller data.
    fn clear_expose(&self, txn: &mut Transaction, id: &ProductId) -> CatalogResult<()> {
        let mut set = Map::new();
        set.insert("expose".to_string(), Value::Bool(false));
        match txn.update(&self.config.products_collection, &id.to_string(), &set, &[]) {
            Ok(Some(_)) => {
                debug!(product = %id, "expose cleared");
                Ok(())
            }
            Ok(None) => Err(CatalogError::Internal(
                "product found during read but not matched during update".into(),
            )),
            Err(StoreError::SchemaRejected { .. }) => {
                warn!(product = %id, "stored schema rejected clearing expose");
                Err(CatalogError::ValidationConflict(
                    "store rejected a document that passes domain validation".into(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn update_photo(
        &self,
        txn: &mut Transaction,
        id: &PhotoId,
        set: &Map<String, Value>,
        unset: &[String],
    ) -> CatalogResult<()> {
        match txn.update(&self.config.photos_collection, &id.to_string(), set, unset) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(CatalogError::Internal(
                "photo found during read but not matched during update".into(),
            )),
            Err(StoreError::SchemaRejected { .. }) => {
                warn!(photo = %id, "stored schema rejected a photo mutation");
                Err(CatalogError::ValidationConflict(
                    "store rejected a document that passes domain validation".into(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Second validation pass after a store-level product rejection. A
    /// report means the data is genuinely invalid; a clean pass means
    /// schema drift.
    fn rejected_product_write(&self, doc: &Value) -> CatalogError {
        match validate::validate_stored_product(&self.config.schemas, doc) {
            Ok(Some(report)) => CatalogError::validation_report("data validation failed", report),
            Ok(None) => {
                warn!(
                    collection = %self.config.products_collection,
                    "store rejected a document the domain accepts"
                );
                CatalogError::ValidationConflict(
                    "store rejected a document that passes domain validation".into(),
                )
            }
            Err(e) => e,
        }
    }

    /// Second validation pass over a rejected photo batch; reports on the
    /// first document the stored schema faults.
    fn rejected_photo_batch(&self, docs: &[Value]) -> CatalogError {
        for doc in docs {
            match validate::validate_stored_photo(&self.config.schemas, doc) {
                Ok(Some(report)) => {
                    return CatalogError::validation_report("data validation failed", report)
                }
                Ok(None) => {}
                Err(e) => return e,
            }
        }
        warn!(
            collection = %self.config.photos_collection,
            "store rejected a batch the domain accepts"
        );
        CatalogError::ValidationConflict(
            "store rejected a document that passes domain validation".into(),
        )
    }
}

/// The report returned when an update tries to rewrite `_id`.
fn id_rewrite_report() -> crate::report::ErrorTree {
    use crate::report::{ErrorDescriptor, ErrorKind, ErrorTree, TreeNode};
    use std::collections::BTreeMap;

    let mut fields = BTreeMap::new();
    fields.insert(
        "_id".to_string(),
        ErrorTree {
            errors: vec![ErrorDescriptor::bare(
                ErrorKind::FieldUnknown,
                "changing a document's id isn't allowed",
            )],
            node: None,
        },
    );
    ErrorTree {
        errors: Vec::new(),
        node: Some(TreeNode::Fields(fields)),
    }
}

fn apply_mutation(doc: Value, set: &Map<String, Value>, unset: &[String]) -> Value {
    let mut map = match doc {
        Value::Object(map) => map,
        other => return other,
    };
    for (k, v) in set {
        map.insert(k.clone(), v.clone());
    }
    for k in unset {
        map.remove(k);
    }
    Value::Object(map)
}

fn encode<T: serde::Serialize>(value: &T) -> CatalogResult<Value> {
    serde_json::to_value(value).map_err(|e| CatalogError::Internal(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(doc: Value) -> CatalogResult<T> {
    serde_json::from_value(doc).map_err(|e| CatalogError::Internal(e.to_string()))
}

/// Total order over optional JSON values for listing sorts. Absent fields
/// sort first; mixed types order by type (null, bool, number, string).
fn cmp_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}
