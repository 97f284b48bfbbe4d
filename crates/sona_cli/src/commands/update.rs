//! Update command implementation.

use super::{open_store, parse_entries, MutationResult, OutputFormat};
use std::path::Path;

/// Runs the update command.
pub fn run(
    path: &Path,
    service_key: &str,
    expected_version: u64,
    entries: &[String],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let (keys, values) = parse_entries(entries)?;
    let store = open_store(path)?;
    let version = store.update_data(service_key, expected_version, keys, values)?;

    MutationResult {
        service_key: service_key.to_string(),
        operation: "updated",
        version,
    }
    .print(format)
}
