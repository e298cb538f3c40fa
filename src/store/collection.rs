//! A named collection of JSON documents with an optional registered
//! schema enforced on every write.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::schema::{validate_document, SchemaDef};

use super::errors::{StoreError, StoreResult};

/// Documents are keyed by their `_id` string field.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    schema: Option<SchemaDef>,
    docs: BTreeMap<String, Value>,
}

impl Collection {
    pub(crate) fn new(name: impl Into<String>, schema: Option<SchemaDef>) -> Self {
        Self {
            name: name.into(),
            schema,
            docs: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.docs.get(id)
    }

    pub fn scan(&self) -> impl Iterator<Item = &Value> {
        self.docs.values()
    }

    /// Inserts a document, enforcing the registered schema.
    pub fn insert(&mut self, doc: Value) -> StoreResult<String> {
        let id = doc_id(&doc)?.to_string();
        if self.docs.contains_key(&id) {
            return Err(StoreError::DuplicateKey {
                collection: self.name.clone(),
                id,
            });
        }
        self.check(&doc)?;
        self.docs.insert(id.clone(), doc);
        Ok(id)
    }

    /// Applies a set/unset mutation to a document, enforcing the
    /// registered schema on the result.
    ///
    /// Returns `None` when no document matched, otherwise whether the
    /// document actually changed.
    pub fn update(
        &mut self,
        id: &str,
        set: &Map<String, Value>,
        unset: &[String],
    ) -> StoreResult<Option<bool>> {
        if set.get("_id").map_or(false, |v| v.as_str() != Some(id)) {
            return Err(StoreError::MalformedDocument(
                "a document's _id cannot be changed".to_string(),
            ));
        }
        if unset.iter().any(|field| field == "_id") {
            return Err(StoreError::MalformedDocument(
                "a document's _id cannot be removed".to_string(),
            ));
        }

        let current = match self.docs.get(id) {
            Some(doc) => doc,
            None => return Ok(None),
        };

        let mut next = current.clone();
        let obj = next
            .as_object_mut()
            .ok_or_else(|| StoreError::MalformedDocument("document is not an object".to_string()))?;
        for (field, value) in set {
            obj.insert(field.clone(), value.clone());
        }
        for field in unset {
            obj.remove(field);
        }

        self.check(&next)?;
        let modified = self.docs.get(id) != Some(&next);
        self.docs.insert(id.to_string(), next);
        Ok(Some(modified))
    }

    /// Removes a document. Returns whether one existed.
    pub fn delete(&mut self, id: &str) -> bool {
        self.docs.remove(id).is_some()
    }

    fn check(&self, doc: &Value) -> StoreResult<()> {
        let def = match &self.schema {
            Some(def) => def,
            None => return Ok(()),
        };
        let conforms = match validate_document(def, doc) {
            Ok(violations) => violations.is_empty(),
            Err(_) => false,
        };
        if conforms {
            Ok(())
        } else {
            Err(StoreError::SchemaRejected {
                collection: self.name.clone(),
            })
        }
    }
}

fn doc_id(doc: &Value) -> StoreResult<&str> {
    doc.get("_id")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::MalformedDocument("missing string '_id' field".to_string()))
}
