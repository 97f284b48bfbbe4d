//! Service configuration records.

use serde::{Deserialize, Serialize};

/// A single configuration key/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Configuration key.
    pub key: String,
    /// Configuration value.
    pub value: String,
}

impl ConfigEntry {
    /// Creates a new entry.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Edit state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordStatus {
    /// No mutation in flight.
    #[default]
    Idle,
    /// A content-changing operation holds the record across its durable write.
    Editing,
}

/// Broker-owned configuration of one service, keyed by service key in the
/// store's map.
///
/// An empty entry list marks the record as soft-deleted: the key keeps its
/// slot and version lineage but carries no configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServiceRecord {
    pub(crate) version: u64,
    pub(crate) status: RecordStatus,
    pub(crate) entries: Vec<ConfigEntry>,
}

impl ServiceRecord {
    /// Placeholder for a brand-new key, held while its first write is in flight.
    pub(crate) fn placeholder() -> Self {
        Self {
            version: 0,
            status: RecordStatus::Editing,
            entries: Vec::new(),
        }
    }

    pub(crate) fn from_document(doc: ServiceDocument) -> Self {
        Self {
            version: doc.version,
            status: RecordStatus::Idle,
            entries: doc.entries,
        }
    }

    pub(crate) fn is_deleted(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies out the committed content.
    pub(crate) fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            entries: self.entries.clone(),
            version: self.version,
        }
    }
}

/// The last committed content of a record, as seen by readers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigSnapshot {
    /// Committed entries, in insertion order.
    pub entries: Vec<ConfigEntry>,
    /// Committed version.
    pub version: u64,
}

impl ConfigSnapshot {
    /// Returns the configuration keys in order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    /// Returns the configuration values in order.
    pub fn values(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.value.as_str()).collect()
    }

    /// Returns true if the snapshot carries no configuration.
    pub fn is_deleted(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A service configuration as persisted by a [`crate::DurableStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDocument {
    /// Service key.
    pub service_key: String,
    /// Version the document was written at.
    pub version: u64,
    /// Configuration entries.
    #[serde(default)]
    pub entries: Vec<ConfigEntry>,
}

impl ServiceDocument {
    /// Creates a new document.
    pub fn new(service_key: impl Into<String>, version: u64, entries: Vec<ConfigEntry>) -> Self {
        Self {
            service_key: service_key.into(),
            version,
            entries,
        }
    }
}
