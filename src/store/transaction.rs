//! A transaction over the store's collections.
//!
//! A transaction owns a private copy of the committed state taken when it
//! began. Reads see that snapshot plus the transaction's own writes;
//! nothing is visible to other callers until commit. Mutations that fail
//! (schema rejection, duplicate key) leave the transaction's copy exactly
//! as it was before the statement, so an aborted transaction never leaks
//! partial writes.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::collection::Collection;
use super::errors::{StoreError, StoreResult};

pub struct Transaction {
    collections: BTreeMap<String, Collection>,
    dirty: bool,
}

impl Transaction {
    pub(crate) fn new(collections: BTreeMap<String, Collection>) -> Self {
        Self {
            collections,
            dirty: false,
        }
    }

    pub(crate) fn into_state(self) -> (BTreeMap<String, Collection>, bool) {
        (self.collections, self.dirty)
    }

    fn collection(&self, name: &str) -> StoreResult<&Collection> {
        self.collections
            .get(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    fn collection_mut(&mut self, name: &str) -> StoreResult<&mut Collection> {
        self.collections
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownCollection(name.to_string()))
    }

    /// Reads a document by id.
    pub fn get(&self, collection: &str, id: &str) -> StoreResult<Option<&Value>> {
        Ok(self.collection(collection)?.get(id))
    }

    /// All documents of a collection, in id order.
    pub fn scan(&self, collection: &str) -> StoreResult<Vec<&Value>> {
        Ok(self.collection(collection)?.scan().collect())
    }

    /// Inserts a document; the collection schema applies.
    pub fn insert(&mut self, collection: &str, doc: Value) -> StoreResult<String> {
        let id = self.collection_mut(collection)?.insert(doc)?;
        self.dirty = true;
        Ok(id)
    }

    /// Inserts several documents; the first rejection aborts the
    /// statement, and the transaction copy keeps none of the batch.
    pub fn insert_many(&mut self, collection: &str, docs: Vec<Value>) -> StoreResult<Vec<String>> {
        let target = self.collection_mut(collection)?;
        let rollback = target.clone();
        let mut ids = Vec::with_capacity(docs.len());
        for doc in docs {
            match target.insert(doc) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    *target = rollback;
                    return Err(e);
                }
            }
        }
        self.dirty = true;
        Ok(ids)
    }

    /// Applies a set/unset mutation; the collection schema applies to the
    /// resulting document. `None` means no document matched.
    pub fn update(
        &mut self,
        collection: &str,
        id: &str,
        set: &Map<String, Value>,
        unset: &[String],
    ) -> StoreResult<Option<bool>> {
        let result = self.collection_mut(collection)?.update(id, set, unset)?;
        if matches!(result, Some(true)) {
            self.dirty = true;
        }
        Ok(result)
    }

    /// Deletes a document. Returns whether one existed.
    pub fn delete(&mut self, collection: &str, id: &str) -> StoreResult<bool> {
        let deleted = self.collection_mut(collection)?.delete(id);
        if deleted {
            self.dirty = true;
        }
        Ok(deleted)
    }
}
