//! CLI command implementations.

pub mod add;
pub mod delete;
pub mod get;
pub mod list;
pub mod update;

use serde::Serialize;
use sona_broker::{ConfigStore, FileDurableStore, FileStoreConfig};
use std::path::Path;
use thiserror::Error;

/// Errors raised by argument handling, before the store is touched.
#[derive(Debug, Error)]
pub enum CliError {
    /// An entry was not of the form `key=value`.
    #[error("invalid entry {0:?}, expected key=value")]
    MalformedEntry(String),

    /// An entry had an empty key.
    #[error("entry {0:?} has an empty key")]
    EmptyKey(String),

    /// Unsupported `--format` value.
    #[error("unknown output format {0:?}, expected text or json")]
    UnknownFormat(String),
}

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a `--format` value.
    pub fn parse(format: &str) -> Result<Self, CliError> {
        match format {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CliError::UnknownFormat(other.to_string())),
        }
    }
}

/// Result of a mutating command.
#[derive(Debug, Serialize)]
pub struct MutationResult {
    /// Service key.
    pub service_key: String,
    /// Operation performed.
    pub operation: &'static str,
    /// Version after the operation.
    pub version: u64,
}

impl MutationResult {
    /// Prints the result in the requested format.
    pub fn print(&self, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(self)?),
            OutputFormat::Text => println!(
                "{} {}: version {}",
                self.operation, self.service_key, self.version
            ),
        }
        Ok(())
    }
}

/// Opens the document file and loads it into a fresh store.
pub fn open_store(path: &Path) -> Result<ConfigStore<FileDurableStore>, Box<dyn std::error::Error>> {
    let durable = FileDurableStore::open(FileStoreConfig::new(path).with_pretty(true))?;
    Ok(ConfigStore::open(durable)?)
}

/// Splits `key=value` arguments into parallel key and value lists.
///
/// Only the first `=` separates; values may contain more.
pub fn parse_entries(entries: &[String]) -> Result<(Vec<String>, Vec<String>), CliError> {
    let mut keys = Vec::with_capacity(entries.len());
    let mut values = Vec::with_capacity(entries.len());

    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| CliError::MalformedEntry(entry.clone()))?;
        if key.is_empty() {
            return Err(CliError::EmptyKey(entry.clone()));
        }
        keys.push(key.to_string());
        values.push(value.to_string());
    }

    Ok((keys, values))
}
