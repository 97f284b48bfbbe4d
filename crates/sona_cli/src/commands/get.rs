//! Get command implementation.

use super::{open_store, OutputFormat};
use serde::Serialize;
use sona_broker::ConfigEntry;
use std::path::Path;

/// A service's committed configuration.
#[derive(Debug, Serialize)]
pub struct GetResult {
    /// Service key.
    pub service_key: String,
    /// Committed version.
    pub version: u64,
    /// True if the configuration was soft-deleted.
    pub deleted: bool,
    /// Committed entries.
    pub entries: Vec<ConfigEntry>,
}

/// Runs the get command.
pub fn run(
    path: &Path,
    service_key: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;
    let snapshot = store
        .get_data(service_key)
        .ok_or_else(|| format!("No configuration for service {:?}", service_key))?;

    let result = GetResult {
        service_key: service_key.to_string(),
        version: snapshot.version,
        deleted: snapshot.is_deleted(),
        entries: snapshot.entries,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            println!("{} (version {})", result.service_key, result.version);
            if result.deleted {
                println!("  <deleted>");
            }
            for entry in &result.entries {
                println!("  {} = {}", entry.key, entry.value);
            }
        }
    }

    Ok(())
}
