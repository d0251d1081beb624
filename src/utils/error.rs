//! The `error` module defines the error type used throughout the relay.
//!
//! None of these errors are ever reported to clients over the wire; the
//! protocol has no error response. They exist for the event loop and the
//! binary to decide between "log and carry on" and "shut down".

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration could not be loaded or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The listening socket failed while receiving. Always fatal.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// An inbound datagram was not a valid envelope.
    #[error("malformed datagram: {0}")]
    Decode(#[source] serde_json::Error),

    /// An outbound envelope could not be serialized.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
