//! Client registry
//!
//! Owns every `Client` session, keyed by network origin. The registry knows
//! nothing about the topic index; callers that remove a client are expected
//! to unsubscribe it from its topics first.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use super::session::{Client, ClientKey};

#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientKey, Client>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Return the session for `addr`, creating it if unseen, with its
    /// activity timestamp set to now.
    pub fn touch(&mut self, addr: SocketAddr) -> &mut Client {
        self.touch_at(addr, Instant::now())
    }

    pub fn touch_at(&mut self, addr: SocketAddr, now: Instant) -> &mut Client {
        let key = ClientKey::new(addr);
        let client = self.clients.entry(key).or_insert_with(|| {
            tracing::debug!("new client {key}");
            Client::new(key, now)
        });
        client.last_seen = now;
        client
    }

    pub fn get(&self, key: &ClientKey) -> Option<&Client> {
        self.clients.get(key)
    }

    pub fn get_mut(&mut self, key: &ClientKey) -> Option<&mut Client> {
        self.clients.get_mut(key)
    }

    /// Delete the session. Absent keys are a no-op.
    pub fn remove(&mut self, key: &ClientKey) -> Option<Client> {
        self.clients.remove(key)
    }

    /// Point-in-time copy of every known key.
    ///
    /// Sweeps and broadcasts iterate this copy so that removals triggered
    /// while iterating never touch the map being walked.
    pub fn keys(&self) -> Vec<ClientKey> {
        self.clients.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
