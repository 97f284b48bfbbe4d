//! Add command implementation.

use super::{open_store, parse_entries, MutationResult, OutputFormat};
use std::path::Path;
use tracing::debug;

/// Runs the add command.
pub fn run(
    path: &Path,
    service_key: &str,
    entries: &[String],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let (keys, values) = parse_entries(entries)?;
    let store = open_store(path)?;

    debug!(service_key, entries = keys.len(), "adding configuration");
    let version = store.add_config(service_key, keys, values)?;

    MutationResult {
        service_key: service_key.to_string(),
        operation: "added",
        version,
    }
    .print(format)
}
