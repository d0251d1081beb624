//! Topic routing and client lifecycle for the relay.
//!
//! - `engine`: the `Broker`, which decodes datagrams and routes
//!   subscribe/unsubscribe/publish against the two registries
//! - `topic`: topic name to subscriber keys
//! - `reaper`: idle-client eviction
//! - `failure`: eviction on send failure and the shutdown broadcast

pub mod engine;
pub mod failure;
pub mod reaper;
pub mod topic;

pub use engine::Broker;
pub use reaper::IdleReaper;
pub use topic::TopicIndex;

#[cfg(test)]
mod tests;
