//! Wire envelopes
//!
//! Every datagram is the UTF-8 text of one JSON object tagged by `type`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::{RelayError, Result};

/// Envelopes sent by clients to the relay.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "sub")]
    Subscribe { topic: String },

    #[serde(rename = "unsub")]
    Unsubscribe { topic: String },

    #[serde(rename = "pub")]
    Publish {
        topic: String,
        #[serde(default)]
        data: Value,
    },

    /// Any other `type` string. The sender still counts as active.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Decode one inbound datagram.
    ///
    /// Invalid UTF-8, invalid JSON, a missing `type`, or a known type without
    /// a `topic` are all decode errors.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(RelayError::Decode)
    }
}

/// Envelopes sent by the relay to clients.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// A publish delivered to a subscriber.
    #[serde(rename = "pub")]
    Publish { topic: String, data: Value },

    /// Sent to every known client just before the relay exits on a fatal
    /// transport failure.
    #[serde(rename = "internal error")]
    InternalError,
}

impl ServerMessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(RelayError::Encode)
    }
}
