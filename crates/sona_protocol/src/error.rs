//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Failed to encode a message body.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a message body.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// Frame is shorter than its header.
    #[error("truncated frame: {len} bytes")]
    TruncatedFrame {
        /// Length of the frame that was received.
        len: usize,
    },

    /// Frame carries a request type id this build does not know.
    #[error("unknown message type: {0:#06x}")]
    UnknownMessageType(u16),
}

impl ProtocolError {
    pub(crate) fn encoding(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    pub(crate) fn decoding(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }
}
