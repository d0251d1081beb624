//! Broker engine
//!
//! The `Broker` owns the client registry and the topic index and keeps them
//! symmetric: a topic is in `client.topics` exactly when the client's key is
//! in that topic's subscriber set.
//!
//! Concurrency notes:
//! - The broker is driven by a single event loop (see `transport::udp`) and
//!   is never shared between tasks, so it needs no lock.
//! - Sends are fire-and-forget. A failed send comes back later as a
//!   `SendFailure`, possibly after the publish that caused it has returned,
//!   and is handled by `handle_send_failure`.

use std::net::SocketAddr;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use super::topic::TopicIndex;
use crate::client::{ClientKey, ClientRegistry};
use crate::transport::Transport;
use crate::transport::message::{ClientMessage, ServerMessage};

#[derive(Debug)]
pub struct Broker<T> {
    pub(crate) clients: ClientRegistry,
    pub(crate) topics: TopicIndex,
    pub(crate) transport: T,
}

impl<T: Transport> Broker<T> {
    pub fn new(transport: T) -> Self {
        Self {
            clients: ClientRegistry::new(),
            topics: TopicIndex::new(),
            transport,
        }
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn topics(&self) -> &TopicIndex {
        &self.topics
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Handle one inbound datagram received now.
    pub fn handle_datagram(&mut self, from: SocketAddr, payload: &[u8]) {
        self.handle_datagram_at(from, payload, Instant::now());
    }

    /// Handle one inbound datagram received at `now`.
    ///
    /// An undecodable datagram is dropped before the sender is registered or
    /// refreshed. Anything that decodes, including an unknown `type`, counts
    /// as activity.
    pub fn handle_datagram_at(&mut self, from: SocketAddr, payload: &[u8], now: Instant) {
        let key = ClientKey::new(from);

        let msg = match ClientMessage::decode(payload) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(">>> {key}: {e}");
                return;
            }
        };
        debug!(">>> {key}: {msg:?}");

        self.clients.touch_at(from, now);

        match msg {
            ClientMessage::Subscribe { topic } => self.subscribe(key, &topic),
            ClientMessage::Unsubscribe { topic } => self.unsubscribe(&key, &topic),
            ClientMessage::Publish { topic, data } => {
                self.publish(&key, &topic, data);
            }
            ClientMessage::Unknown => {}
        }
    }

    /// Subscribe a known client to `topic`. Unknown keys are ignored.
    pub fn subscribe(&mut self, key: ClientKey, topic: &str) {
        let Some(client) = self.clients.get_mut(&key) else {
            return;
        };
        debug!("subscribe: [{topic}]: {key}");

        client.topics.insert(topic.to_string());
        self.topics.subscribe(key, topic);
    }

    /// Unsubscribe from `topic`. Unsubscribing a non-member is a no-op.
    pub fn unsubscribe(&mut self, key: &ClientKey, topic: &str) {
        debug!("unsubscribe: [{topic}]: {key}");

        if let Some(client) = self.clients.get_mut(key) {
            client.topics.remove(topic);
        }
        self.topics.unsubscribe(key, topic);
    }

    /// Fan `data` out to every subscriber of `topic` except the publisher.
    ///
    /// Returns the number of datagrams handed to the transport.
    pub fn publish(&self, publisher: &ClientKey, topic: &str, data: Value) -> usize {
        debug!("publish: {publisher} => \"{topic}\": {data}");

        // Copy the subscriber set first; a send failure may evict a
        // subscriber before we reach it.
        let subscribers: Vec<ClientKey> = match self.topics.subscribers_of(topic) {
            Some(keys) => keys.iter().copied().collect(),
            None => {
                debug!("topic unknown \"{topic}\"");
                return 0;
            }
        };

        let envelope = ServerMessage::Publish {
            topic: topic.to_string(),
            data,
        };
        let payload = match envelope.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("{e}");
                return 0;
            }
        };

        let mut sent = 0;
        for key in subscribers.iter().filter(|k| *k != publisher) {
            let Some(client) = self.clients.get(key) else {
                debug!("no client found for {key}");
                continue;
            };
            debug!("<<< {}: \"{topic}\"", client.key);
            self.transport.send_to(&client.key, &payload);
            sent += 1;
        }

        debug!("publish: {publisher} => \"{topic}\": sent to {sent} clients");
        sent
    }

    /// Unsubscribe `key` from every topic it holds, then forget it.
    ///
    /// Returns `false` if the client was already gone.
    pub fn drop_client(&mut self, key: &ClientKey) -> bool {
        let Some(client) = self.clients.get_mut(key) else {
            return false;
        };
        debug!("dropping client: {key}");

        let topics = std::mem::take(&mut client.topics);
        for topic in &topics {
            self.topics.unsubscribe(key, topic);
        }
        self.clients.remove(key);
        true
    }
}
