//! Waystone registry: the process-wide authoritative directory of
//! waystone records.
//!
//! ## Ownership discipline
//!
//! Records are exclusively owned by the registry. Readers get clone
//! snapshots; every field mutation goes through [`WaystoneRegistry::update`]
//! so it is mirrored to persistence. Presentation threads may read while
//! the simulation thread mutates: the map lives behind a `parking_lot`
//! `RwLock` and [`WaystoneRegistry::all`] copies on iterate.

use crate::persist::{PersistenceHandle, PersistenceStore};
use crate::record::WaystoneRecord;
use crate::types::WaystoneHash;
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;

pub struct WaystoneRegistry {
    records: RwLock<HashMap<WaystoneHash, WaystoneRecord>>,
    persistence: PersistenceHandle,
}

impl WaystoneRegistry {
    pub fn new(persistence: PersistenceHandle) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            persistence,
        }
    }

    // -----------------------------------------------------------------------
    // Hydration
    // -----------------------------------------------------------------------

    /// Load every blob from the store. Returns the number of records
    /// hydrated; hash collisions keep the first record (and warn), a
    /// failing store loads nothing but never panics.
    pub fn load_from(&self, store: &dyn PersistenceStore) -> usize {
        let blobs = match store.load_all() {
            Ok(blobs) => blobs,
            Err(e) => {
                warn!("Persistence load failed, starting empty: {}", e);
                return 0;
            }
        };

        let mut records = self.records.write();
        let mut loaded = 0;
        for blob in blobs {
            let record = WaystoneRecord::from_blob(blob);
            if records.contains_key(&record.hash) {
                warn!("Duplicate waystone hash {} in store, keeping first", record.hash);
                continue;
            }
            records.insert(record.hash.clone(), record);
            loaded += 1;
        }
        debug!("Hydrated {} waystone record(s)", loaded);
        loaded
    }

    /// Synchronously flush every record (autosave / shutdown path).
    pub fn save_all(&self, store: &dyn PersistenceStore) {
        for record in self.all() {
            if let Err(e) = store.save(&record.to_blob()) {
                warn!("Autosave of {} failed: {}", record.hash, e);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Insert a record unless its hash is already present.
    ///
    /// First-writer-wins: a concurrent discovery race inserts once and the
    /// loser's call is a no-op. Returns whether this call inserted.
    pub fn add(&self, record: WaystoneRecord) -> bool {
        let mut records = self.records.write();
        if records.contains_key(&record.hash) {
            return false;
        }
        self.persistence.save(record.to_blob());
        debug!("Registered waystone {} '{}' at {}", record.hash, record.name, record.position);
        records.insert(record.hash.clone(), record);
        true
    }

    /// Remove a record. Absent hashes are a silent no-op because break and
    /// state-replacement teardown paths can both reach here for the same
    /// structure.
    pub fn remove(&self, hash: &str) -> Option<WaystoneRecord> {
        let removed = self.records.write().remove(hash);
        if let Some(record) = &removed {
            self.persistence.delete(record.hash.clone());
            debug!("Unregistered waystone {} '{}'", record.hash, record.name);
        }
        removed
    }

    /// Apply `f` to a record and mirror the result to persistence.
    /// Returns `false` (and runs nothing) when the hash is unknown.
    pub fn update<F>(&self, hash: &str, f: F) -> bool
    where
        F: FnOnce(&mut WaystoneRecord),
    {
        let mut records = self.records.write();
        let Some(record) = records.get_mut(hash) else {
            return false;
        };
        f(record);
        self.persistence.save(record.to_blob());
        true
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Snapshot of one record. Absence is a normal outcome; waystones can
    /// be destroyed between discovery and a later travel attempt.
    pub fn get(&self, hash: &str) -> Option<WaystoneRecord> {
        self.records.read().get(hash).cloned()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.records.read().contains_key(hash)
    }

    /// Snapshot of every record, for listings and reconciliation scans.
    pub fn all(&self) -> Vec<WaystoneRecord> {
        self.records.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
