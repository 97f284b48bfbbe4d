//! Error types for the broker store.

use thiserror::Error;

/// Result type for config store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for durable store operations.
pub type DurableResult<T> = Result<T, DurableError>;

/// Errors returned by [`crate::ConfigStore`] mutations and reloads.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Add on a key that still carries live configuration.
    #[error("service configuration already exists: {service_key}")]
    AlreadyExists {
        /// Service key.
        service_key: String,
    },

    /// Another mutation of the same key is in flight.
    #[error("service configuration is being edited: {service_key}")]
    AlreadyEditing {
        /// Service key.
        service_key: String,
    },

    /// CAS precondition failed.
    #[error("version mismatch for {service_key}: expected {expected}, current {actual}")]
    VersionMismatch {
        /// Service key.
        service_key: String,
        /// Version supplied by the caller.
        expected: u64,
        /// Version currently committed.
        actual: u64,
    },

    /// Update or delete on a key the store has never seen.
    #[error("service configuration not found: {service_key}")]
    NotFound {
        /// Service key.
        service_key: String,
    },

    /// The durable store rejected or failed the write. In-memory state was rolled back.
    #[error("persistence failure: {0}")]
    Persistence(#[from] DurableError),

    /// The record's version cannot be bumped any further.
    #[error("version space exhausted for {service_key}")]
    VersionExhausted {
        /// Service key.
        service_key: String,
    },

    /// A mutation was in flight, or committed, while a reset was reloading.
    /// The map was left untouched.
    #[error("reload raced with {editing} in-flight mutation(s), nothing replaced")]
    ReloadConflict {
        /// Records that were `Editing` when the reload was about to swap in.
        editing: usize,
    },

    /// Configuration keys and values do not pair up.
    #[error("mismatched entries: {keys} keys, {values} values")]
    InvalidEntries {
        /// Number of keys supplied.
        keys: usize,
        /// Number of values supplied.
        values: usize,
    },
}

impl StoreError {
    /// Returns true if the caller lost a race or holds a stale view.
    ///
    /// Re-reading the record and retrying may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::AlreadyEditing { .. }
                | StoreError::VersionMismatch { .. }
                | StoreError::ReloadConflict { .. }
        )
    }

    /// Returns true if the durable store failed.
    pub fn is_persistence(&self) -> bool {
        matches!(self, StoreError::Persistence(_))
    }
}

/// Errors raised by a [`crate::DurableStore`] implementation.
#[derive(Error, Debug)]
pub enum DurableError {
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Documents could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Insert of a document that is already stored.
    #[error("document already stored: {service_key}")]
    DuplicateDocument {
        /// Service key.
        service_key: String,
    },

    /// Update of a document that is not stored.
    #[error("document not stored: {service_key}")]
    MissingDocument {
        /// Service key.
        service_key: String,
    },

    /// Update that would move a stored document back to an older version.
    #[error("stale document for {service_key}: stored version {stored}, written {written}")]
    StaleDocument {
        /// Service key.
        service_key: String,
        /// Version currently stored.
        stored: u64,
        /// Version of the rejected document.
        written: u64,
    },

    /// Another process holds the store's lock file.
    #[error("store is locked by another process: {path}")]
    Locked {
        /// Path of the lock file.
        path: String,
    },

    /// The backing store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for DurableError {
    fn from(err: serde_json::Error) -> Self {
        DurableError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        let mismatch = StoreError::VersionMismatch {
            service_key: "svcA".into(),
            expected: 0,
            actual: 1,
        };
        assert!(mismatch.is_conflict());
        assert!(!mismatch.is_persistence());

        let editing = StoreError::AlreadyEditing {
            service_key: "svcA".into(),
        };
        assert!(editing.is_conflict());

        let persistence = StoreError::from(DurableError::Unavailable("down".into()));
        assert!(persistence.is_persistence());
        assert!(!persistence.is_conflict());

        assert!(StoreError::ReloadConflict { editing: 1 }.is_conflict());
        assert!(!StoreError::VersionExhausted {
            service_key: "svcA".into()
        }
        .is_conflict());

        assert!(!StoreError::NotFound {
            service_key: "svcA".into()
        }
        .is_conflict());
    }

    #[test]
    fn error_display() {
        let err = StoreError::VersionMismatch {
            service_key: "svcA".into(),
            expected: 3,
            actual: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("svcA"));
        assert!(msg.contains('3'));
        assert!(msg.contains('5'));
    }
}
