//! # Sona Protocol
//!
//! Message types exchanged between Sona agents and the broker.
//!
//! This crate provides:
//! - `PullServiceConfigRequest`, the agent's "pull this service at this known
//!   version" request
//! - `BrokerMessage`, the typed envelope carried by a transport
//! - A small frame codec: a big-endian request type id followed by a CBOR body
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod error;
mod messages;

pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    BrokerMessage, PullServiceConfigRequest, RequestTypeId, FRAME_HEADER_LEN,
    PULL_SERVICE_CONFIG_REQ_ID,
};
