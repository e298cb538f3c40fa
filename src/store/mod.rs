//! Embedded transactional document store.
//!
//! Collections hold JSON documents keyed by `_id`; a collection may carry
//! a registered schema, enforced on every insert and update as the last
//! line of defense behind domain validation.
//!
//! Multi-document work runs through [`Datastore::with_transaction`]: the
//! closure gets a private snapshot of the committed state, and commit uses
//! first-committer-wins conflict detection. A transaction that overlapped
//! another commit aborts with [`StoreError::WriteConflict`] and the store
//! never retries it internally; callers treat the abort as transient and
//! retry from scratch at their own discretion. The combinator owns the
//! whole session, so every exit path (return, error, conflict) releases
//! it.
//!
//! Conflict detection is coarse: any interleaved commit conflicts, even a
//! disjoint one. That trades throughput for an easily audited
//! serializable model.

mod collection;
mod errors;
mod transaction;

pub use collection::Collection;
pub use errors::{StoreError, StoreResult};
pub use transaction::Transaction;

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::schema::SchemaDef;

struct Inner {
    collections: BTreeMap<String, Collection>,
    commit_seq: u64,
}

/// Handle to the store; clones share the same state.
#[derive(Clone)]
pub struct Datastore {
    inner: Arc<RwLock<Inner>>,
}

impl Datastore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                collections: BTreeMap::new(),
                commit_seq: 0,
            })),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a collection, optionally with a registered schema.
    pub fn create_collection(&self, name: &str, schema: Option<SchemaDef>) -> StoreResult<()> {
        let mut inner = self.write();
        if inner.collections.contains_key(name) {
            return Err(StoreError::CollectionExists(name.to_string()));
        }
        inner
            .collections
            .insert(name.to_string(), Collection::new(name, schema));
        Ok(())
    }

    pub fn collection_exists(&self, name: &str) -> bool {
        self.read().collections.contains_key(name)
    }

    /// The number of commits applied so far.
    pub fn commit_seq(&self) -> u64 {
        self.read().commit_seq
    }

    /// Runs `f` inside a transaction and commits its writes atomically.
    ///
    /// Preconditions that depend on current state must be checked by `f`
    /// itself, through the transaction's reads, never before calling this
    /// — reads outside the transaction race with concurrent writers.
    ///
    /// Any error from `f` aborts the transaction; no partial writes
    /// survive. A conflicting concurrent commit aborts with
    /// `StoreError::WriteConflict` converted into the caller's error type.
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Transaction) -> Result<T, E>,
    {
        let (snapshot, base_seq) = {
            let inner = self.read();
            (inner.collections.clone(), inner.commit_seq)
        };

        let mut txn = Transaction::new(snapshot);
        let out = f(&mut txn)?;
        let (collections, dirty) = txn.into_state();

        if !dirty {
            return Ok(out);
        }

        let mut inner = self.write();
        if inner.commit_seq != base_seq {
            warn!(base_seq, current_seq = inner.commit_seq, "transaction aborted: write conflict");
            return Err(E::from(StoreError::WriteConflict));
        }
        inner.collections = collections;
        inner.commit_seq += 1;
        debug!(commit_seq = inner.commit_seq, "transaction committed");
        Ok(out)
    }

    // Single-document operations ride the store's native atomicity and
    // need no explicit transaction at the call site.

    /// Inserts one document.
    pub fn insert(&self, collection: &str, doc: Value) -> StoreResult<String> {
        self.with_transaction(|txn| txn.insert(collection, doc))
    }

    /// Reads one document.
    pub fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let inner = self.read();
        let c = inner
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        Ok(c.get(id).cloned())
    }

    /// Applies a set/unset mutation to one document.
    pub fn update(
        &self,
        collection: &str,
        id: &str,
        set: &Map<String, Value>,
        unset: &[String],
    ) -> StoreResult<Option<bool>> {
        self.with_transaction(|txn| txn.update(collection, id, set, unset))
    }

    /// Deletes one document. Returns whether one existed.
    pub fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.with_transaction(|txn| txn.delete(collection, id))
    }

    /// All documents of a collection, in id order.
    pub fn scan(&self, collection: &str) -> StoreResult<Vec<Value>> {
        let inner = self.read();
        let c = inner
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;
        Ok(c.scan().cloned().collect())
    }
}

impl Default for Datastore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> Datastore {
        let db = Datastore::new();
        db.create_collection("docs", None).unwrap();
        db
    }

    #[test]
    fn test_create_collection_twice() {
        let db = store();
        assert_eq!(
            db.create_collection("docs", None).unwrap_err(),
            StoreError::CollectionExists("docs".to_string())
        );
    }

    #[test]
    fn test_unknown_collection() {
        let db = store();
        assert!(matches!(
            db.get("nope", "x").unwrap_err(),
            StoreError::UnknownCollection(_)
        ));
    }

    #[test]
    fn test_single_document_roundtrip() {
        let db = store();
        db.insert("docs", json!({"_id": "a", "n": 1})).unwrap();
        assert_eq!(db.get("docs", "a").unwrap().unwrap()["n"], 1);
        assert!(db.delete("docs", "a").unwrap());
        assert!(!db.delete("docs", "a").unwrap());
    }

    #[test]
    fn test_transaction_is_atomic_on_error() {
        let db = store();
        db.insert("docs", json!({"_id": "a", "n": 1})).unwrap();

        let result: Result<(), StoreError> = db.with_transaction(|txn| {
            txn.delete("docs", "a")?;
            txn.insert("docs", json!({"_id": "b", "n": 2}))?;
            Err(StoreError::MalformedDocument("boom".to_string()))
        });
        assert!(result.is_err());

        // nothing from the aborted transaction is visible
        assert!(db.get("docs", "a").unwrap().is_some());
        assert!(db.get("docs", "b").unwrap().is_none());
    }

    #[test]
    fn test_transaction_reads_its_own_writes() {
        let db = store();
        let count: Result<usize, StoreError> = db.with_transaction(|txn| {
            txn.insert("docs", json!({"_id": "a"}))?;
            Ok(txn.scan("docs")?.len())
        });
        assert_eq!(count.unwrap(), 1);
    }

    #[test]
    fn test_concurrent_commit_conflicts() {
        let db = store();
        let db2 = db.clone();

        let result: Result<(), StoreError> = db.with_transaction(|txn| {
            txn.insert("docs", json!({"_id": "a"}))?;
            // another writer commits while this transaction is open
            db2.insert("docs", json!({"_id": "b"}))?;
            Ok(())
        });
        assert_eq!(result.unwrap_err(), StoreError::WriteConflict);

        // the interleaved single-document write survives, ours does not
        assert!(db.get("docs", "b").unwrap().is_some());
        assert!(db.get("docs", "a").unwrap().is_none());
    }

    #[test]
    fn test_read_only_transaction_never_conflicts() {
        let db = store();
        db.insert("docs", json!({"_id": "a"})).unwrap();

        let n: Result<usize, StoreError> = db.with_transaction(|txn| {
            let n = txn.scan("docs")?.len();
            db.insert("docs", json!({"_id": "b"}))?;
            Ok(n)
        });
        assert_eq!(n.unwrap(), 1);
    }

    #[test]
    fn test_retry_after_conflict_succeeds() {
        let db = store();
        let mut attempts = 0;
        let result: Result<(), StoreError> = loop {
            attempts += 1;
            let out: Result<(), StoreError> = db.with_transaction(|txn| {
                txn.insert("docs", json!({"_id": format!("try-{attempts}")}))?;
                if attempts == 1 {
                    // simulate an interleaved writer on the first attempt
                    db.insert("docs", json!({"_id": "other"}))?;
                }
                Ok(())
            });
            match out {
                Err(StoreError::WriteConflict) => continue,
                other => break other,
            }
        };
        result.unwrap();
        assert_eq!(attempts, 2);
        assert!(db.get("docs", "try-2").unwrap().is_some());
        assert!(db.get("docs", "try-1").unwrap().is_none());
    }
}
