//! Failure handling
//!
//! A send that fails marks one client unreachable and evicts it. A failure
//! of the listening socket is fatal: every known client is told with an
//! `internal error` envelope before the process exits.

use tracing::{debug, warn};

use super::engine::Broker;
use crate::transport::message::ServerMessage;
use crate::transport::{SendFailure, Transport};

impl<T: Transport> Broker<T> {
    /// Evict the client a failed send was addressed to.
    ///
    /// The report may arrive after the client was already evicted by the
    /// reaper or an earlier failure; that is a no-op.
    pub fn handle_send_failure(&mut self, failure: SendFailure) -> bool {
        let dropped = self.drop_client(&failure.key);
        if dropped {
            debug!("send to {} failed, client dropped", failure.key);
        }
        dropped
    }

    /// Best-effort `internal error` notice to every known client.
    ///
    /// Returns the number of datagrams handed to the transport.
    pub fn broadcast_internal_error(&self) -> usize {
        let payload = match ServerMessage::InternalError.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("{e}");
                return 0;
            }
        };

        let keys = self.clients.keys();
        for key in &keys {
            self.transport.send_to(key, &payload);
        }
        keys.len()
    }
}
