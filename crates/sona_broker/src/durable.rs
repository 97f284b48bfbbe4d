//! Durable store trait definition.

use crate::error::DurableResult;
use crate::record::ServiceDocument;
use std::sync::Arc;

/// Backing store that service configuration is written through to.
///
/// [`crate::ConfigStore`] calls these methods without holding its lock, so
/// implementations may be slow and may fail. A call that never returns leaves
/// the affected key in the `Editing` state.
///
/// # Invariants
///
/// - `reload_all` returns every stored document, each key at most once
/// - `insert` stores a document for a key that has none
/// - `update` replaces the document of a key that already has one, and never
///   with a lower version than the stored one
/// - Implementations must be `Send + Sync` for concurrent access
pub trait DurableStore: Send + Sync {
    /// Loads every stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn reload_all(&self) -> DurableResult<Vec<ServiceDocument>>;

    /// Stores a document for a new key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is already stored or the write fails.
    fn insert(&self, document: &ServiceDocument) -> DurableResult<()>;

    /// Replaces the stored document of an existing key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not stored, the stored version is
    /// higher than the document's, or the write fails.
    fn update(&self, document: &ServiceDocument) -> DurableResult<()>;
}

impl<T: DurableStore + ?Sized> DurableStore for Arc<T> {
    fn reload_all(&self) -> DurableResult<Vec<ServiceDocument>> {
        (**self).reload_all()
    }

    fn insert(&self, document: &ServiceDocument) -> DurableResult<()> {
        (**self).insert(document)
    }

    fn update(&self, document: &ServiceDocument) -> DurableResult<()> {
        (**self).update(document)
    }
}
