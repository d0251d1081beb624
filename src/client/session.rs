use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// Identifies a client by its network origin.
///
/// There is no handshake: two datagrams from the same address and port
/// belong to the same client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientKey(SocketAddr);

impl ClientKey {
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0.ip(), self.0.port())
    }
}

/// A client session known to the relay.
#[derive(Debug, Clone)]
pub struct Client {
    pub key: ClientKey,

    /// Topics this client is subscribed to. Mirrors the topic index.
    pub topics: HashSet<String>,

    /// Time the last decodable datagram arrived from this origin.
    pub last_seen: Instant,
}

impl Client {
    pub fn new(key: ClientKey, now: Instant) -> Self {
        Self {
            key,
            topics: HashSet::new(),
            last_seen: now,
        }
    }
}
