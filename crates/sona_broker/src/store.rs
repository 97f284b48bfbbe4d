//! Versioned, write-through configuration store.

use crate::durable::DurableStore;
use crate::error::{StoreError, StoreResult};
use crate::record::{ConfigEntry, ConfigSnapshot, RecordStatus, ServiceDocument, ServiceRecord};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// How an admitted `add_config` reaches the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddKind {
    /// Key was absent; a placeholder now occupies the slot.
    Create,
    /// Key was soft-deleted; the existing record is marked `Editing`.
    Recreate,
}

/// In-memory map from service key to versioned configuration, written
/// through to a [`DurableStore`].
///
/// Every mutation runs in three steps:
/// 1. admit under the write lock, marking the record `Editing`
/// 2. write to the durable store with no lock held
/// 3. commit or roll back under the write lock, returning the record to `Idle`
///
/// Readers and writers of other keys are never blocked by step 2.
///
/// [`ConfigStore::reset`] never swaps the map under an in-flight mutation, so a
/// commit or rollback always lands on the record it admitted.
pub struct ConfigStore<D: DurableStore> {
    durable: D,
    records: RwLock<HashMap<String, ServiceRecord>>,
    /// Mutations admitted so far. Only changed under the write lock.
    admissions: AtomicU64,
}

impl<D: DurableStore> ConfigStore<D> {
    /// Creates an empty store. Call [`ConfigStore::reset`] to load persisted state.
    pub fn new(durable: D) -> Self {
        Self {
            durable,
            records: RwLock::new(HashMap::new()),
            admissions: AtomicU64::new(0),
        }
    }

    /// Creates a store and loads it from the durable store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] if the reload fails.
    pub fn open(durable: D) -> StoreResult<Self> {
        let store = Self::new(durable);
        store.reset()?;
        Ok(store)
    }

    /// Returns the durable store.
    pub fn durable(&self) -> &D {
        &self.durable
    }

    /// Replaces the whole map with a fresh reload from the durable store.
    ///
    /// Returns the number of records loaded. On failure the current map is
    /// left untouched.
    ///
    /// The swap only happens if no mutation was in flight when the reload
    /// started and none was admitted before the swap. Otherwise the reload
    /// could miss a durable write, or a pending commit could land on a
    /// reloaded record.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ReloadConflict`] if a mutation overlapped the reload
    /// - [`StoreError::Persistence`] if the reload fails
    pub fn reset(&self) -> StoreResult<usize> {
        let admitted = {
            let records = self.records.read();
            let editing = count_editing(&records);
            if editing > 0 {
                warn!(editing, "reset refused, mutations in flight");
                return Err(StoreError::ReloadConflict { editing });
            }
            self.admissions.load(Ordering::Relaxed)
        };

        let documents = self.durable.reload_all().map_err(|e| {
            warn!(error = %e, "config reload failed, keeping current records");
            StoreError::Persistence(e)
        })?;

        let mut fresh = HashMap::with_capacity(documents.len());
        for doc in documents {
            let key = doc.service_key.clone();
            if fresh.insert(key, ServiceRecord::from_document(doc)).is_some() {
                debug!("durable store returned a duplicate key, keeping the last one");
            }
        }

        let count = fresh.len();
        let mut records = self.records.write();
        let editing = count_editing(&records);
        if editing > 0 || self.admissions.load(Ordering::Relaxed) != admitted {
            warn!(editing, "reset refused, a mutation overlapped the reload");
            return Err(StoreError::ReloadConflict { editing });
        }
        *records = fresh;
        drop(records);
        info!(records = count, "config store reloaded");
        Ok(count)
    }

    /// Creates a configuration, or recreates a soft-deleted one.
    ///
    /// A brand-new key is inserted at version 0. A soft-deleted key is
    /// rewritten at its current version, which is not bumped. Returns the
    /// version the content was written at.
    ///
    /// # Errors
    ///
    /// - [`StoreError::AlreadyExists`] if the key has live configuration
    /// - [`StoreError::AlreadyEditing`] if another mutation of the key is in flight
    /// - [`StoreError::Persistence`] if the durable write fails; a new key is
    ///   removed again, a recreated key keeps its empty content
    pub fn add_config(
        &self,
        service_key: &str,
        keys: Vec<String>,
        values: Vec<String>,
    ) -> StoreResult<u64> {
        let entries = pair_entries(keys, values)?;
        let (kind, version) = self.admit_add(service_key)?;

        let document = ServiceDocument::new(service_key, version, entries);
        let written = match kind {
            AddKind::Create => self.durable.insert(&document),
            AddKind::Recreate => self.durable.update(&document),
        };

        let mut records = self.records.write();
        match written {
            Ok(()) => {
                if let Some(record) = records.get_mut(service_key) {
                    record.entries = document.entries;
                    record.status = RecordStatus::Idle;
                }
                debug!(service_key, version, ?kind, "config added");
                Ok(version)
            }
            Err(e) => {
                match kind {
                    AddKind::Create => {
                        records.remove(service_key);
                    }
                    AddKind::Recreate => mark_idle(&mut records, service_key),
                }
                warn!(service_key, version, ?kind, error = %e, "add rolled back");
                Err(StoreError::Persistence(e))
            }
        }
    }

    /// Replaces a configuration if its version still equals `expected_version`.
    ///
    /// On success the record is at `expected_version + 1`, which is returned.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if the key is absent
    /// - [`StoreError::VersionMismatch`] if the committed version differs
    /// - [`StoreError::VersionExhausted`] if the version is already `u64::MAX`
    /// - [`StoreError::AlreadyEditing`] if another mutation of the key is in flight
    /// - [`StoreError::Persistence`] if the durable write fails; the record
    ///   keeps its content and version
    pub fn update_data(
        &self,
        service_key: &str,
        expected_version: u64,
        keys: Vec<String>,
        values: Vec<String>,
    ) -> StoreResult<u64> {
        let entries = pair_entries(keys, values)?;
        self.compare_and_write(service_key, expected_version, entries)
    }

    /// Soft-deletes a configuration if its version still equals
    /// `expected_version`.
    ///
    /// Same as [`ConfigStore::update_data`] with empty content.
    ///
    /// # Errors
    ///
    /// See [`ConfigStore::update_data`].
    pub fn delete_data(&self, service_key: &str, expected_version: u64) -> StoreResult<u64> {
        self.compare_and_write(service_key, expected_version, Vec::new())
    }

    /// Returns the last committed content of a key.
    ///
    /// Never waits for an in-flight mutation.
    pub fn get_data(&self, service_key: &str) -> Option<ConfigSnapshot> {
        self.records.read().get(service_key).map(ServiceRecord::snapshot)
    }

    /// Like [`ConfigStore::get_data`], returning an empty snapshot at version 0
    /// for an absent key.
    pub fn get_data_or_default(&self, service_key: &str) -> ConfigSnapshot {
        self.get_data(service_key).unwrap_or_default()
    }

    /// Returns the edit state of a key.
    pub fn status(&self, service_key: &str) -> Option<RecordStatus> {
        self.records.read().get(service_key).map(|r| r.status)
    }

    /// Returns all known service keys, soft-deleted ones included, sorted.
    pub fn service_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.records.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the number of records, soft-deleted ones included.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn admit_add(&self, service_key: &str) -> StoreResult<(AddKind, u64)> {
        let mut records = self.records.write();
        match records.get_mut(service_key) {
            None => {
                records.insert(service_key.to_string(), ServiceRecord::placeholder());
                self.admissions.fetch_add(1, Ordering::Relaxed);
                Ok((AddKind::Create, 0))
            }
            Some(record) if !record.is_deleted() => Err(StoreError::AlreadyExists {
                service_key: service_key.to_string(),
            }),
            Some(record) if record.status == RecordStatus::Editing => {
                Err(StoreError::AlreadyEditing {
                    service_key: service_key.to_string(),
                })
            }
            Some(record) => {
                record.status = RecordStatus::Editing;
                self.admissions.fetch_add(1, Ordering::Relaxed);
                Ok((AddKind::Recreate, record.version))
            }
        }
    }

    fn admit_cas(&self, service_key: &str, expected_version: u64) -> StoreResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(service_key)
            .ok_or_else(|| StoreError::NotFound {
                service_key: service_key.to_string(),
            })?;

        if record.version != expected_version {
            return Err(StoreError::VersionMismatch {
                service_key: service_key.to_string(),
                expected: expected_version,
                actual: record.version,
            });
        }
        if record.status == RecordStatus::Editing {
            return Err(StoreError::AlreadyEditing {
                service_key: service_key.to_string(),
            });
        }

        record.status = RecordStatus::Editing;
        self.admissions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn compare_and_write(
        &self,
        service_key: &str,
        expected_version: u64,
        entries: Vec<ConfigEntry>,
    ) -> StoreResult<u64> {
        self.admit_cas(service_key, expected_version)?;

        let Some(next_version) = expected_version.checked_add(1) else {
            mark_idle(&mut self.records.write(), service_key);
            return Err(StoreError::VersionExhausted {
                service_key: service_key.to_string(),
            });
        };
        let document = ServiceDocument::new(service_key, next_version, entries);
        let written = self.durable.update(&document);

        let mut records = self.records.write();
        match written {
            Ok(()) => {
                if let Some(record) = records.get_mut(service_key) {
                    record.entries = document.entries;
                    record.version = next_version;
                    record.status = RecordStatus::Idle;
                }
                debug!(service_key, version = next_version, "config committed");
                Ok(next_version)
            }
            Err(e) => {
                mark_idle(&mut records, service_key);
                warn!(service_key, expected_version, error = %e, "update rolled back");
                Err(StoreError::Persistence(e))
            }
        }
    }
}

fn count_editing(records: &HashMap<String, ServiceRecord>) -> usize {
    records
        .values()
        .filter(|r| r.status == RecordStatus::Editing)
        .count()
}

fn mark_idle(records: &mut HashMap<String, ServiceRecord>, service_key: &str) {
    if let Some(record) = records.get_mut(service_key) {
        record.status = RecordStatus::Idle;
    }
}

fn pair_entries(keys: Vec<String>, values: Vec<String>) -> StoreResult<Vec<ConfigEntry>> {
    if keys.len() != values.len() {
        return Err(StoreError::InvalidEntries {
            keys: keys.len(),
            values: values.len(),
        });
    }
    Ok(keys
        .into_iter()
        .zip(values)
        .map(|(key, value)| ConfigEntry { key, value })
        .collect())
}
