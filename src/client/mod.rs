//! The `client` module holds per-origin session state.
//!
//! A `Client` is created the first time a decodable datagram arrives from an
//! address/port pair and lives until it goes idle or a send to it fails.

pub mod registry;
pub mod session;

pub use registry::ClientRegistry;
pub use session::{Client, ClientKey};
