//! Topic index
//!
//! Maps each topic name to the keys of its subscribers. Keys are only
//! references into the client registry; resolving one may find the client
//! already gone. A topic exists exactly as long as it has a subscriber.

use std::collections::{HashMap, HashSet};

use crate::client::ClientKey;

#[derive(Debug, Default)]
pub struct TopicIndex {
    topics: HashMap<String, HashSet<ClientKey>>,
}

impl TopicIndex {
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
        }
    }

    /// Add `key` to `topic`, creating the topic if needed. Duplicate
    /// subscriptions are ignored.
    pub fn subscribe(&mut self, key: ClientKey, topic: &str) {
        self.topics.entry(topic.to_string()).or_default().insert(key);
    }

    /// Remove `key` from `topic`; the topic is dropped once empty.
    pub fn unsubscribe(&mut self, key: &ClientKey, topic: &str) {
        if let Some(subscribers) = self.topics.get_mut(topic) {
            subscribers.remove(key);
            if subscribers.is_empty() {
                self.topics.remove(topic);
                tracing::debug!("topic \"{topic}\" has no subscribers left");
            }
        }
    }

    pub fn subscribers_of(&self, topic: &str) -> Option<&HashSet<ClientKey>> {
        self.topics.get(topic)
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
