//! List command implementation.

use super::{open_store, OutputFormat};
use serde::Serialize;
use std::path::Path;

/// One line of the listing.
#[derive(Debug, Serialize)]
pub struct ServiceSummary {
    /// Service key.
    pub service_key: String,
    /// Committed version.
    pub version: u64,
    /// Number of entries.
    pub entry_count: usize,
    /// True if the configuration was soft-deleted.
    pub deleted: bool,
}

/// Runs the list command.
pub fn run(path: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path)?;

    let services: Vec<ServiceSummary> = store
        .service_keys()
        .into_iter()
        .filter_map(|service_key| {
            let snapshot = store.get_data(&service_key)?;
            Some(ServiceSummary {
                service_key,
                version: snapshot.version,
                entry_count: snapshot.entries.len(),
                deleted: snapshot.is_deleted(),
            })
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&services)?),
        OutputFormat::Text => {
            if services.is_empty() {
                println!("No services");
            }
            for service in &services {
                let state = if service.deleted { " (deleted)" } else { "" };
                println!(
                    "{:<32} v{:<6} {} entries{}",
                    service.service_key, service.version, service.entry_count, state
                );
            }
        }
    }

    Ok(())
}
