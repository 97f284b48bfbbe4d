//! # Sona Agent
//!
//! Keeps an agent's subscriptions reflected to the broker.
//!
//! This crate provides:
//! - [`SyncDriver`], which announces every subscribed service key and its
//!   last known version to the broker
//! - The [`SubscriptionRegistry`] and [`BrokerClient`] seams it depends on
//! - [`Ticker`] implementations for real and simulated time
//!
//! ## Sync model
//!
//! The agent does not rely on pushes alone, since pushes sent while it was
//! disconnected are lost. Instead:
//! 1. On every successful (re)connect the driver resyncs: one pull request per
//!    subscribed key, carrying the version the agent already holds.
//! 2. A background loop repeats the same announcement on a fixed period.
//!    When nothing is subscribed it waits an extra idle delay.
//!
//! The broker answers stale versions with fresh configuration. Sends are
//! fire-and-forget, and the next cycle is the retry.
//!
//! ## Key Invariants
//!
//! - One request per subscribed key per pass, carrying the registry's version
//! - The driver never mutates the registry
//! - The poll loop stops only through its ticker's cancel handle

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod driver;
mod error;
mod registry;
mod ticker;
mod transport;

pub use config::{DriverConfig, DEFAULT_IDLE_DELAY, DEFAULT_POLL_INTERVAL};
pub use driver::{CycleOutcome, DriverStats, PollerHandle, SyncDriver};
pub use error::{AgentError, AgentResult};
pub use registry::{MemorySubscriptionRegistry, SubscriptionRegistry};
pub use ticker::{CancelHandle, IntervalTicker, ManualTicker, Tick, Ticker};
pub use transport::{BrokerClient, ChannelClient, ConnectionListener, RecordingClient};
