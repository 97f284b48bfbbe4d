//! Transport seams between the driver and the broker connection.

use parking_lot::Mutex;
use sona_protocol::{BrokerMessage, PullServiceConfigRequest};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::warn;

/// Fire-and-forget channel to the broker.
///
/// `send` returns nothing: delivery, buffering and reconnection belong to the
/// implementation. A request that cannot be delivered is dropped, and the next
/// poll cycle sends it again.
pub trait BrokerClient: Send + Sync {
    /// Queues a message for the broker.
    fn send(&self, message: BrokerMessage);
}

/// Receives connection lifecycle events from a transport.
pub trait ConnectionListener: Send + Sync {
    /// Called after every successful connect or reconnect.
    fn on_connected(&self);

    /// Called when the connection is lost.
    fn on_disconnected(&self) {}
}

/// A client that keeps every message it is given.
#[derive(Debug, Default)]
pub struct RecordingClient {
    sent: Mutex<Vec<BrokerMessage>>,
}

impl RecordingClient {
    /// Creates a new recording client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every message sent so far.
    pub fn sent(&self) -> Vec<BrokerMessage> {
        self.sent.lock().clone()
    }

    /// Returns the pull requests sent so far.
    pub fn pull_requests(&self) -> Vec<PullServiceConfigRequest> {
        self.sent
            .lock()
            .iter()
            .filter_map(|message| match message {
                BrokerMessage::PullServiceConfig(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of messages sent.
    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    /// Returns true if nothing was sent.
    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }

    /// Forgets everything sent so far.
    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl BrokerClient for RecordingClient {
    fn send(&self, message: BrokerMessage) {
        self.sent.lock().push(message);
    }
}

/// A client that encodes messages into frames and hands them to a channel,
/// typically drained by a connection writer thread.
#[derive(Debug)]
pub struct ChannelClient {
    frames: Sender<Vec<u8>>,
    dropped: AtomicU64,
}

impl ChannelClient {
    /// Creates a client feeding the given channel.
    pub fn new(frames: Sender<Vec<u8>>) -> Self {
        Self {
            frames,
            dropped: AtomicU64::new(0),
        }
    }

    /// Creates a client and the receiving end of its channel.
    pub fn pair() -> (Self, Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }

    /// Returns the number of messages that could not be delivered.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl BrokerClient for ChannelClient {
    fn send(&self, message: BrokerMessage) {
        let frame = match message.encode_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(service_key = message.service_key(), error = %e, "failed to encode request");
                return;
            }
        };

        if self.frames.send(frame).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                service_key = message.service_key(),
                "broker connection closed, dropping request"
            );
        }
    }
}
