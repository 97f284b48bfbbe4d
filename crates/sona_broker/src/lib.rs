//! # Sona Broker
//!
//! The broker side of Sona: an in-memory, versioned configuration store with
//! compare-and-swap mutations that are durable before they become visible.
//!
//! This crate provides:
//! - [`ConfigStore`], the map from service key to versioned configuration
//! - The [`DurableStore`] trait the store writes through to
//! - [`MemoryDurableStore`] for tests and [`FileDurableStore`] for a JSON file
//!
//! # Locking
//!
//! A single readers-writer lock guards the map and every record's fields. It
//! is held only for in-memory transitions, never across a [`DurableStore`]
//! call. Writers of the same key are serialized by the record's
//! [`RecordStatus::Editing`] flag, which is checked and set under that lock.
//! Readers always see the last committed snapshot.
//!
//! ```
//! use sona_broker::{ConfigStore, MemoryDurableStore};
//!
//! let store = ConfigStore::new(MemoryDurableStore::new());
//! let v0 = store.add_config("svcA", vec!["x".into()], vec!["1".into()]).unwrap();
//! assert_eq!(v0, 0);
//!
//! let v1 = store.update_data("svcA", v0, vec!["x".into()], vec!["2".into()]).unwrap();
//! assert_eq!(v1, 1);
//! assert_eq!(store.get_data("svcA").unwrap().values(), vec!["2"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod durable;
mod error;
mod file;
mod memory;
mod record;
mod store;

pub use durable::DurableStore;
pub use error::{DurableError, DurableResult, StoreError, StoreResult};
pub use file::{FileDurableStore, FileStoreConfig};
pub use memory::{DurableWrite, MemoryDurableStore, WriteKind};
pub use record::{ConfigEntry, ConfigSnapshot, RecordStatus, ServiceDocument};
pub use store::ConfigStore;
