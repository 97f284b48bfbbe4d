//! Error types for the agent.

use thiserror::Error;

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that can occur while setting up agent background work.
///
/// Sending requests never fails from the driver's point of view; transports
/// log and drop what they cannot deliver.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The poller thread could not be started.
    #[error("failed to spawn poller thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The poller thread panicked.
    #[error("poller thread panicked")]
    PollerPanicked,
}
