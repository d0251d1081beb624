//! The `transport` module is the relay's boundary to the network.
//!
//! It defines the JSON envelopes exchanged with clients, the `Transport`
//! trait the broker sends through, and the UDP event loop that drives the
//! broker from datagrams, timers and send-failure reports.

pub mod message;
pub mod udp;

use crate::client::ClientKey;

/// Outbound half of the datagram transport.
///
/// `send_to` is fire-and-forget. A transport that later learns the send
/// failed reports it as a [`SendFailure`]; it never blocks the caller.
pub trait Transport {
    fn send_to(&self, to: &ClientKey, payload: &[u8]);
}

/// Completion signal for a send that did not make it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendFailure {
    pub key: ClientKey,
}
