//! JSON file durable store.

use crate::durable::DurableStore;
use crate::error::{DurableError, DurableResult};
use crate::record::ServiceDocument;
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Configuration for [`FileDurableStore`].
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Path of the JSON document file.
    pub path: PathBuf,
    /// Whether to create missing parent directories on open.
    pub create_dirs: bool,
    /// Whether to pretty-print the file.
    pub pretty: bool,
}

impl FileStoreConfig {
    /// Creates a new configuration for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_dirs: true,
            pretty: false,
        }
    }

    /// Sets whether parent directories are created on open.
    pub fn with_create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }

    /// Sets whether the file is pretty-printed.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FileImage {
    documents: Vec<ServiceDocument>,
}

/// A durable store backed by a single JSON file.
///
/// Every write rewrites the whole file: the new image goes to a sibling
/// `.tmp` file, is synced, then renamed over the original. A missing file
/// reads as an empty store.
///
/// An exclusive advisory lock on a sibling `<file>.lock` is held for the life
/// of the store, so only one process (and one instance) writes a given file.
///
/// # Example
///
/// ```no_run
/// use sona_broker::{ConfigStore, FileDurableStore, FileStoreConfig};
///
/// let durable = FileDurableStore::open(FileStoreConfig::new("data/services.json")).unwrap();
/// let store = ConfigStore::open(durable).unwrap();
/// ```
#[derive(Debug)]
pub struct FileDurableStore {
    config: FileStoreConfig,
    write_lock: Mutex<()>,
    /// Holds the exclusive lock; released on drop.
    _lock_file: File,
}

impl FileDurableStore {
    /// Opens a file store.
    ///
    /// The document file itself is not created until the first write.
    ///
    /// # Errors
    ///
    /// - [`DurableError::Locked`] if another store holds the file
    /// - [`DurableError::Io`] if parent directories or the lock file cannot
    ///   be created
    pub fn open(config: FileStoreConfig) -> DurableResult<Self> {
        if config.create_dirs {
            if let Some(parent) = config.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }

        let lock_path = lock_path(&config.path);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        // Non-blocking: a second writer fails fast instead of queueing.
        if lock_file.try_lock_exclusive().is_err() {
            return Err(DurableError::Locked {
                path: lock_path.display().to_string(),
            });
        }

        Ok(Self {
            config,
            write_lock: Mutex::new(()),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn read_image(&self) -> DurableResult<BTreeMap<String, ServiceDocument>> {
        let bytes = match fs::read(&self.config.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        let image: FileImage = serde_json::from_slice(&bytes)?;
        Ok(image
            .documents
            .into_iter()
            .map(|doc| (doc.service_key.clone(), doc))
            .collect())
    }

    fn write_image(&self, documents: BTreeMap<String, ServiceDocument>) -> DurableResult<()> {
        let image = FileImage {
            documents: documents.into_values().collect(),
        };
        let bytes = if self.config.pretty {
            serde_json::to_vec_pretty(&image)?
        } else {
            serde_json::to_vec(&image)?
        };

        let tmp_path = self.config.path.with_extension("tmp");
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(&bytes)?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, &self.config.path)?;
        Ok(())
    }
}

impl DurableStore for FileDurableStore {
    fn reload_all(&self) -> DurableResult<Vec<ServiceDocument>> {
        let _guard = self.write_lock.lock();
        Ok(self.read_image()?.into_values().collect())
    }

    fn insert(&self, document: &ServiceDocument) -> DurableResult<()> {
        let _guard = self.write_lock.lock();
        let mut documents = self.read_image()?;
        if documents.contains_key(&document.service_key) {
            return Err(DurableError::DuplicateDocument {
                service_key: document.service_key.clone(),
            });
        }
        documents.insert(document.service_key.clone(), document.clone());
        self.write_image(documents)
    }

    fn update(&self, document: &ServiceDocument) -> DurableResult<()> {
        let _guard = self.write_lock.lock();
        let mut documents = self.read_image()?;
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
        self.write_image(documents)
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}
