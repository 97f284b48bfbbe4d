//! Protocol messages sent from agents to the broker.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// Identifier carried in front of every frame, naming the message type.
pub type RequestTypeId = u16;

/// Request type id for "pull configuration for this service at this known version".
pub const PULL_SERVICE_CONFIG_REQ_ID: RequestTypeId = 0x0101;

/// Size of the frame header (the big-endian request type id).
pub const FRAME_HEADER_LEN: usize = 2;

/// Pull request from an agent.
///
/// Tells the broker which version of a service's configuration the agent
/// already holds, so the broker can decide whether to push a newer one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullServiceConfigRequest {
    /// Service key the agent is subscribed to.
    pub service_key: String,
    /// Last version of the configuration known to the agent.
    pub version: u64,
}

impl PullServiceConfigRequest {
    /// Creates a new pull request.
    pub fn new(service_key: impl Into<String>, version: u64) -> Self {
        Self {
            service_key: service_key.into(),
            version,
        }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| ProtocolError::encoding(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| ProtocolError::decoding(e.to_string()))
    }
}

/// A message travelling from an agent to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BrokerMessage {
    /// Pull service configuration.
    PullServiceConfig(PullServiceConfigRequest),
}

impl BrokerMessage {
    /// Returns the request type id of this message.
    pub fn type_id(&self) -> RequestTypeId {
        match self {
            BrokerMessage::PullServiceConfig(_) => PULL_SERVICE_CONFIG_REQ_ID,
        }
    }

    /// Returns the service key the message refers to.
    pub fn service_key(&self) -> &str {
        match self {
            BrokerMessage::PullServiceConfig(req) => &req.service_key,
        }
    }

    /// Encodes the message as `[type id: u16 BE][CBOR body]`.
    pub fn encode_frame(&self) -> ProtocolResult<Vec<u8>> {
        let body = match self {
            BrokerMessage::PullServiceConfig(req) => req.encode()?,
        };

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
        frame.extend_from_slice(&self.type_id().to_be_bytes());
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Decodes a frame produced by [`BrokerMessage::encode_frame`].
    pub fn decode_frame(frame: &[u8]) -> ProtocolResult<Self> {
        if frame.len() < FRAME_HEADER_LEN {
            return Err(ProtocolError::TruncatedFrame { len: frame.len() });
        }

        let (header, body) = frame.split_at(FRAME_HEADER_LEN);
        let type_id = RequestTypeId::from_be_bytes([header[0], header[1]]);

        match type_id {
            PULL_SERVICE_CONFIG_REQ_ID => Ok(BrokerMessage::PullServiceConfig(
                PullServiceConfigRequest::decode(body)?,
            )),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

impl From<PullServiceConfigRequest> for BrokerMessage {
    fn from(req: PullServiceConfigRequest) -> Self {
        BrokerMessage::PullServiceConfig(req)
    }
}
