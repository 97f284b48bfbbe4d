//! In-memory durable store for testing.

use crate::durable::DurableStore;
use crate::error::{DurableError, DurableResult};
use crate::record::ServiceDocument;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Kind of write recorded by [`MemoryDurableStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// `DurableStore::insert`.
    Insert,
    /// `DurableStore::update`.
    Update,
}

/// A successful write, in the order it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurableWrite {
    /// Which method applied it.
    pub kind: WriteKind,
    /// The document as written.
    pub document: ServiceDocument,
}

/// An in-memory durable store.
///
/// Suitable for unit tests and ephemeral brokers. Failures can be injected to
/// exercise rollback paths.
///
/// # Example
///
/// ```rust
/// use sona_broker::{DurableStore, MemoryDurableStore, ServiceDocument};
///
/// let store = MemoryDurableStore::new();
/// store.insert(&ServiceDocument::new("svcA", 0, vec![])).unwrap();
///
/// store.fail_next_writes(1);
/// assert!(store.update(&ServiceDocument::new("svcA", 1, vec![])).is_err());
/// assert_eq!(store.document("svcA").unwrap().version, 0);
/// ```
#[derive(Debug, Default)]
pub struct MemoryDurableStore {
    documents: RwLock<HashMap<String, ServiceDocument>>,
    writes: RwLock<Vec<DurableWrite>>,
    fail_writes: AtomicU32,
    fail_reload: AtomicBool,
}

impl MemoryDurableStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given documents.
    #[must_use]
    pub fn with_documents(documents: impl IntoIterator<Item = ServiceDocument>) -> Self {
        let store = Self::new();
        {
            let mut map = store.documents.write();
            for doc in documents {
                map.insert(doc.service_key.clone(), doc);
            }
        }
        store
    }

    /// Makes the next `count` insert/update calls fail.
    pub fn fail_next_writes(&self, count: u32) {
        self.fail_writes.store(count, Ordering::SeqCst);
    }

    /// Makes `reload_all` fail until cleared.
    pub fn set_fail_reload(&self, fail: bool) {
        self.fail_reload.store(fail, Ordering::SeqCst);
    }

    /// Returns the stored document for a key.
    pub fn document(&self, service_key: &str) -> Option<ServiceDocument> {
        self.documents.read().get(service_key).cloned()
    }

    /// Returns every successful write so far.
    pub fn writes(&self) -> Vec<DurableWrite> {
        self.writes.read().clone()
    }

    /// Returns the number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    fn take_injected_failure(&self) -> DurableResult<()> {
        let injected = self
            .fail_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(DurableError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }

    fn record_write(&self, kind: WriteKind, document: &ServiceDocument) {
        self.writes.write().push(DurableWrite {
            kind,
            document: document.clone(),
        });
    }
}

impl DurableStore for MemoryDurableStore {
    fn reload_all(&self) -> DurableResult<Vec<ServiceDocument>> {
        if self.fail_reload.load(Ordering::SeqCst) {
            return Err(DurableError::Unavailable("injected reload failure".into()));
        }
        Ok(self.documents.read().values().cloned().collect())
    }

    fn insert(&self, document: &ServiceDocument) -> DurableResult<()> {
        self.take_injected_failure()?;

        let mut documents = self.documents.write();
        if documents.contains_key(&document.service_key) {
            return Err(DurableError::DuplicateDocument {
                service_key: document.service_key.clone(),
            });
        }
        documents.insert(document.service_key.clone(), document.clone());
        drop(documents);

        self.record_write(WriteKind::Insert, document);
        Ok(())
    }

    fn update(&self, document: &ServiceDocument) -> DurableResult<()> {
        self.take_injected_failure()?;

        let mut documents = self.documents.write();
        match documents.get_mut(&document.service_key) {
            Some(stored) if document.version < stored.version => {
                return Err(DurableError::StaleDocument {
                    service_key: document.service_key.clone(),
                    stored: stored.version,
                    written: document.version,
                })
            }
            Some(stored) => *stored = document.clone(),
            None => {
                return Err(DurableError::MissingDocument {
                    service_key: document.service_key.clone(),
                })
            }
        }
        drop(documents);

        self.record_write(WriteKind::Update, document);
        Ok(())
    }
}
