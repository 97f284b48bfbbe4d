//! Delete command implementation.

use super::{open_store, MutationResult, OutputFormat};
use std::path::Path;

/// Runs the delete command.
///
/// The record stays in the store with empty content and a bumped version, so
/// agents still holding the old version learn about the deletion.
pub fn run(
    path: &Path,
    service_key: &str,
    expected_version: u64,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let version = store.delete_data(service_key, expected_version)?;

    MutationResult {
        service_key: service_key.to_string(),
        operation: "deleted",
        version,
    }
    .print(format)
}
