use super::{Broker, IdleReaper, TopicIndex};
use crate::client::ClientKey;
use crate::transport::message::ServerMessage;
use crate::transport::{SendFailure, Transport};
use serde_json::json;
use std::cell::RefCell;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Records every send instead of touching the network.
#[derive(Debug, Default)]
struct RecordingTransport {
    sent: RefCell<Vec<(ClientKey, ServerMessage)>>,
}

impl Transport for RecordingTransport {
    fn send_to(&self, to: &ClientKey, payload: &[u8]) {
        let msg: ServerMessage = serde_json::from_slice(payload).unwrap();
        self.sent.borrow_mut().push((*to, msg));
    }
}

impl RecordingTransport {
    fn sent_to(&self, key: ClientKey) -> Vec<ServerMessage> {
        self.sent
            .borrow()
            .iter()
            .filter(|(to, _)| *to == key)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    fn count(&self) -> usize {
        self.sent.borrow().len()
    }
}

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn key(port: u16) -> ClientKey {
    ClientKey::new(addr(port))
}

fn broker() -> Broker<RecordingTransport> {
    Broker::new(RecordingTransport::default())
}

fn send(broker: &mut Broker<RecordingTransport>, port: u16, msg: serde_json::Value) {
    broker.handle_datagram(addr(port), msg.to_string().as_bytes());
}

/// Both directions of the client/topic relation agree.
fn assert_symmetric(broker: &Broker<RecordingTransport>) {
    for client in broker.clients().iter() {
        for topic in &client.topics {
            let subs = broker.topics().subscribers_of(topic).unwrap();
            assert!(subs.contains(&client.key));
        }
    }
    for client in broker.clients().iter() {
        for topic in ["weather", "news", "sports"] {
            let listed = broker
                .topics()
                .subscribers_of(topic)
                .is_some_and(|s| s.contains(&client.key));
            assert_eq!(listed, client.topics.contains(topic));
        }
    }
}

#[test]
fn test_topic_index_subscribe_is_idempotent() {
    let mut index = TopicIndex::new();
    index.subscribe(key(1), "news");
    index.subscribe(key(1), "news");
    assert_eq!(index.subscribers_of("news").unwrap().len(), 1);
}

#[test]
fn test_topic_index_drops_empty_topic() {
    let mut index = TopicIndex::new();
    index.subscribe(key(1), "news");
    index.subscribe(key(2), "news");

    index.unsubscribe(&key(1), "news");
    assert!(index.contains("news"));

    index.unsubscribe(&key(2), "news");
    assert!(!index.contains("news"));
    assert!(index.is_empty());
}

#[test]
fn test_topic_index_unsubscribe_non_member_is_noop() {
    let mut index = TopicIndex::new();
    index.unsubscribe(&key(1), "nothing");
    index.subscribe(key(1), "news");
    index.unsubscribe(&key(2), "news");
    assert_eq!(index.subscribers_of("news").unwrap().len(), 1);
}

#[test]
fn test_subscribe_then_publish_delivers_to_subscriber_only() {
    let mut broker = broker();
    send(&mut broker, 1, json!({"type": "sub", "topic": "weather"}));
    send(
        &mut broker,
        2,
        json!({"type": "pub", "topic": "weather", "data": {"temp": 72}}),
    );

    let received = broker.transport().sent_to(key(1));
    assert_eq!(
        received,
        vec![ServerMessage::Publish {
            topic: "weather".to_string(),
            data: json!({"temp": 72}),
        }]
    );
    assert!(broker.transport().sent_to(key(2)).is_empty());
}

#[test]
fn test_publisher_never_receives_own_publish() {
    let mut broker = broker();
    send(&mut broker, 1, json!({"type": "sub", "topic": "news"}));
    send(&mut broker, 2, json!({"type": "sub", "topic": "news"}));
    send(&mut broker, 1, json!({"type": "pub", "topic": "news", "data": "hi"}));

    assert!(broker.transport().sent_to(key(1)).is_empty());
    assert_eq!(broker.transport().sent_to(key(2)).len(), 1);
}

#[test]
fn test_sole_subscriber_publishing_reaches_nobody() {
    let mut broker = broker();
    send(&mut broker, 1, json!({"type": "sub", "topic": "news"}));
    let sent = broker.publish(&key(1), "news", json!(1));
    assert_eq!(sent, 0);
    assert_eq!(broker.transport().count(), 0);
}

#[test]
fn test_unsubscribe_stops_delivery_and_removes_topic() {
    let mut broker = broker();
    send(&mut broker, 1, json!({"type": "sub", "topic": "news"}));
    send(&mut broker, 1, json!({"type": "unsub", "topic": "news"}));
    assert!(!broker.topics().contains("news"));
    assert!(broker.clients().get(&key(1)).unwrap().topics.is_empty());

    send(&mut broker, 2, json!({"type": "pub", "topic": "news", "data": 1}));
    assert_eq!(broker.transport().count(), 0);
}

#[test]
fn test_publish_to_unknown_topic_is_noop() {
    let mut broker = broker();
    send(&mut broker, 1, json!({"type": "pub", "topic": "ghost", "data": 1}));
    assert_eq!(broker.publish(&key(1), "ghost", json!(null)), 0);
    assert_eq!(broker.transport().count(), 0);
    // the publisher is still registered
    assert!(broker.clients().get(&key(1)).is_some());
}

#[test]
fn test_duplicate_subscribe_delivers_once() {
    let mut broker = broker();
    send(&mut broker, 1, json!({"type": "sub", "topic": "news"}));
    send(&mut broker, 1, json!({"type": "sub", "topic": "news"}));
    assert_eq!(broker.topics().subscribers_of("news").unwrap().len(), 1);
    assert_eq!(broker.clients().get(&key(1)).unwrap().topics.len(), 1);

    send(&mut broker, 2, json!({"type": "pub", "topic": "news", "data": 1}));
    assert_eq!(broker.transport().sent_to(key(1)).len(), 1);
}

#[test]
fn test_unsubscribe_non_member_is_noop() {
    let mut broker = broker();
    send(&mut broker, 1, json!({"type": "sub", "topic": "news"}));
    send(&mut broker, 2, json!({"type": "unsub", "topic": "news"}));
    send(&mut broker, 2, json!({"type": "unsub", "topic": "never"}));

    assert!(broker.topics().subscribers_of("news").unwrap().contains(&key(1)));
    assert!(!broker.topics().contains("never"));
    assert_symmetric(&broker);
}

#[test]
fn test_malformed_datagram_is_ignored() {
    let mut broker = broker();
    broker.handle_datagram(addr(1), b"not json at all");
    broker.handle_datagram(addr(1), &[0xff, 0xfe, 0x00]);
    broker.handle_datagram(addr(1), br#"{"topic": "news"}"#);
    broker.handle_datagram(addr(1), br#"{"type": "sub"}"#);
    broker.handle_datagram(addr(1), b"42");

    assert!(broker.clients().is_empty());
    assert!(broker.topics().is_empty());
    assert_eq!(broker.transport().count(), 0);
}

#[test]
fn test_malformed_datagram_does_not_refresh_client() {
    let mut broker = broker();
    let start = Instant::now();
    broker.handle_datagram_at(addr(1), br#"{"type": "sub", "topic": "news"}"#, start);
    broker.handle_datagram_at(addr(1), b"{garbage", start + Duration::from_secs(10));

    assert_eq!(broker.clients().get(&key(1)).unwrap().last_seen, start);
}

#[test]
fn test_unknown_type_registers_and_refreshes_client() {
    let mut broker = broker();
    let start = Instant::now();
    broker.handle_datagram_at(addr(1), br#"{"type": "ping"}"#, start);
    assert!(broker.clients().get(&key(1)).is_some());

    let later = start + Duration::from_secs(3);
    broker.handle_datagram_at(addr(1), br#"{"type": "hello", "x": 1}"#, later);
    assert_eq!(broker.clients().get(&key(1)).unwrap().last_seen, later);
    assert!(broker.topics().is_empty());
    assert_eq!(broker.transport().count(), 0);
}

#[test]
fn test_publish_without_data_delivers_null() {
    let mut broker = broker();
    send(&mut broker, 1, json!({"type": "sub", "topic": "news"}));
    send(&mut broker, 2, json!({"type": "pub", "topic": "news"}));
    assert_eq!(
        broker.transport().sent_to(key(1)),
        vec![ServerMessage::Publish {
            topic: "news".to_string(),
            data: serde_json::Value::Null,
        }]
    );
}

#[test]
fn test_publish_skips_stale_subscriber_key() {
    let mut broker = broker();
    send(&mut broker, 1, json!({"type": "sub", "topic": "news"}));
    send(&mut broker, 2, json!({"type": "sub", "topic": "news"}));

    // leave a dangling key in the index
    broker.clients.remove(&key(1));

    let sent = broker.publish(&key(3), "news", json!("x"));
    assert_eq!(sent, 1);
    assert_eq!(broker.transport().sent_to(key(2)).len(), 1);
}

#[test]
fn test_drop_client_cascades_and_is_idempotent() {
    let mut broker = broker();
    send(&mut broker, 1, json!({"type": "sub", "topic": "news"}));
    send(&mut broker, 1, json!({"type": "sub", "topic": "weather"}));
    send(&mut broker, 2, json!({"type": "sub", "topic": "weather"}));

    assert!(broker.drop_client(&key(1)));
    assert!(!broker.drop_client(&key(1)));

    assert!(broker.clients().get(&key(1)).is_none());
    assert!(!broker.topics().contains("news"));
    let weather = broker.topics().subscribers_of("weather").unwrap();
    assert!(!weather.contains(&key(1)));
    assert!(weather.contains(&key(2)));
    assert_symmetric(&broker);
}

#[test]
fn test_idle_reaper_evicts_silent_clients() {
    let mut broker = broker();
    let start = Instant::now();
    broker.handle_datagram_at(addr(1), br#"{"type":"sub","topic":"news"}"#, start);
    broker.handle_datagram_at(addr(2), br#"{"type":"sub","topic":"weather"}"#, start);
    broker.handle_datagram_at(addr(3), br#"{"type":"sub","topic":"weather"}"#, start);

    let reaper = IdleReaper::new(Duration::from_secs(30));
    // client 3 keeps talking
    broker.handle_datagram_at(
        addr(3),
        br#"{"type":"noop"}"#,
        start + Duration::from_secs(20),
    );

    assert_eq!(reaper.sweep(&mut broker, start + Duration::from_secs(30)), 0);

    let dropped = reaper.sweep(&mut broker, start + Duration::from_secs(31));
    assert_eq!(dropped, 2);
    assert!(broker.clients().get(&key(1)).is_none());
    assert!(broker.clients().get(&key(2)).is_none());
    assert!(broker.clients().get(&key(3)).is_some());
    assert!(!broker.topics().contains("news"));
    assert_eq!(
        broker.topics().subscribers_of("weather").unwrap().len(),
        1
    );
    assert_symmetric(&broker);
}

#[test]
fn test_idle_reaper_enforces_floor() {
    let reaper = IdleReaper::new(Duration::from_millis(10));
    assert_eq!(reaper.idle_timeout(), Duration::from_secs(1));

    let mut broker = broker();
    let start = Instant::now();
    broker.handle_datagram_at(addr(1), br#"{"type":"sub","topic":"news"}"#, start);
    assert_eq!(reaper.sweep(&mut broker, start + Duration::from_millis(500)), 0);
    assert_eq!(reaper.sweep(&mut broker, start + Duration::from_millis(1001)), 1);
    assert!(broker.topics().is_empty());
}

#[test]
fn test_send_failure_evicts_client() {
    let mut broker = broker();
    send(&mut broker, 1, json!({"type": "sub", "topic": "news"}));
    send(&mut broker, 2, json!({"type": "sub", "topic": "news"}));

    assert!(broker.handle_send_failure(SendFailure { key: key(1) }));
    assert!(broker.clients().get(&key(1)).is_none());
    assert!(!broker.topics().subscribers_of("news").unwrap().contains(&key(1)));

    // a late duplicate report is harmless
    assert!(!broker.handle_send_failure(SendFailure { key: key(1) }));
    assert_symmetric(&broker);
}

#[test]
fn test_send_failure_after_idle_eviction_is_noop() {
    let mut broker = broker();
    let start = Instant::now();
    broker.handle_datagram_at(addr(1), br#"{"type":"sub","topic":"news"}"#, start);
    IdleReaper::new(Duration::from_secs(1)).sweep(&mut broker, start + Duration::from_secs(5));

    assert!(!broker.handle_send_failure(SendFailure { key: key(1) }));
    assert!(broker.clients().is_empty());
    assert!(broker.topics().is_empty());
}

#[test]
fn test_broadcast_internal_error_reaches_every_client() {
    let mut broker = broker();
    send(&mut broker, 1, json!({"type": "sub", "topic": "news"}));
    send(&mut broker, 2, json!({"type": "ping"}));

    assert_eq!(broker.broadcast_internal_error(), 2);
    assert_eq!(
        broker.transport().sent_to(key(1)),
        vec![ServerMessage::InternalError]
    );
    assert_eq!(
        broker.transport().sent_to(key(2)),
        vec![ServerMessage::InternalError]
    );
}
