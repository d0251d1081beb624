//! # pubsub-udp
//!
//! `pubsub-udp` is a connectionless publish/subscribe relay. Clients send JSON
//! datagrams to subscribe, unsubscribe or publish on named topics; the relay
//! forwards each publish to every other subscriber of the topic.
//!
//! Clients are identified by their address and port alone. A client exists
//! from its first valid datagram until it falls silent for longer than the
//! idle timeout or a send to it fails.
//!
//! ## Core Modules
//!
//! - `broker`: topic index, message routing, idle eviction and failure handling.
//! - `client`: per-origin sessions and the registry that owns them.
//! - `config`: loading settings from `config/default` and the environment.
//! - `transport`: wire envelopes, the `Transport` trait and the UDP event loop.
//! - `utils`: error type and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
