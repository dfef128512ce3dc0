//! Integration tests for the LND event source feeding the dispatcher.

use async_trait::async_trait;
use routewatch::core::EventKind;
use routewatch::dispatcher::{Dispatcher, FailurePolicy, Registry};
use routewatch::error::{DispatchError, SourceError};
use routewatch::formatting::{AmountUnit, Renderer};
use routewatch::lnd::{ChannelDirectory, EventTranslator, LndEventSource, Peer, WebSocketConnection};
use routewatch::notification::ChatNotifier;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::mock_sink::MockChatSink;

struct ReplayConnection {
    frames: VecDeque<Result<Message, WsError>>,
}

impl ReplayConnection {
    fn new(frames: &[&str]) -> Self {
        Self {
            frames: frames
                .iter()
                .map(|f| Ok(Message::Text((*f).into())))
                .collect(),
        }
    }
}

#[async_trait]
impl WebSocketConnection for ReplayConnection {
    async fn read_message(&mut self) -> Option<Result<Message, WsError>> {
        self.frames.pop_front()
    }
}

struct StaticDirectory;

#[async_trait]
impl ChannelDirectory for StaticDirectory {
    async fn local_node(&self) -> Result<Peer, SourceError> {
        Ok(Peer {
            pub_key: "02local".to_string(),
            alias: "my-node".to_string(),
        })
    }

    async fn channel_peer(&self, channel_id: u64) -> Result<Peer, SourceError> {
        let alias = match channel_id {
            100 => "Alice",
            200 => "Bob",
            _ => return Err(SourceError::Lookup(format!("no edge {}", channel_id))),
        };
        Ok(Peer {
            pub_key: format!("03{}", alias.to_lowercase()),
            alias: alias.to_string(),
        })
    }
}

const SUBSCRIBED: &str = r#"{"result": {"subscribed_event": {}}}"#;

const FORWARD: &str = r#"{"result": {
    "incoming_channel_id": "100", "outgoing_channel_id": "200",
    "incoming_htlc_id": "5", "outgoing_htlc_id": "9",
    "timestamp_ns": "1700000000000000000",
    "event_type": "FORWARD",
    "forward_event": {"info": {
        "incoming_timelock": 800100, "outgoing_timelock": 800060,
        "incoming_amt_msat": "5000", "outgoing_amt_msat": "4000"
    }}
}}"#;

const SETTLE: &str = r#"{"result": {
    "incoming_channel_id": "100", "outgoing_channel_id": "200",
    "incoming_htlc_id": "5", "outgoing_htlc_id": "9",
    "event_type": "FORWARD",
    "settle_event": {"preimage": "AAAA"}
}}"#;

const LINK_FAIL: &str = r#"{"result": {
    "incoming_channel_id": "100", "outgoing_channel_id": "300",
    "incoming_htlc_id": "6", "outgoing_htlc_id": "0",
    "event_type": "FORWARD",
    "link_fail_event": {
        "info": {"incoming_amt_msat": "1000", "outgoing_amt_msat": "900"},
        "wire_failure": "TEMPORARY_CHANNEL_FAILURE",
        "failure_detail": "INSUFFICIENT_BALANCE",
        "failure_string": "insufficient bandwidth to route htlc"
    }
}}"#;

fn source(frames: &[&str]) -> LndEventSource {
    LndEventSource::new(
        Box::new(ReplayConnection::new(frames)),
        EventTranslator::new(Arc::new(StaticDirectory)),
    )
}

#[tokio::test]
async fn test_forward_and_settle_are_delivered_with_aliases() {
    // Arrange
    let sink = MockChatSink::new();
    let mut registry = Registry::new();
    registry.register(Arc::new(ChatNotifier::new(
        "telegram",
        Renderer::new(12345, AmountUnit::Msat),
        Arc::new(sink.clone()),
    )));
    let dispatcher = Dispatcher::new(registry, FailurePolicy::Abort);
    let mut source = source(&[SUBSCRIBED, FORWARD, SETTLE]);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    // Act
    let result = dispatcher.run(&mut source, shutdown_rx).await;

    // Assert
    assert!(matches!(result, Err(DispatchError::SourceDisconnect)));
    let bodies = sink.bodies();
    assert_eq!(bodies.len(), 2);
    assert_eq!(
        bodies[0],
        "New <b>Forward</b>\n\
         <b>Alice</b> (5000 msat) ➜ <b>Bob</b> (4000 msat)\n\
         💲 Earned: 1000 msat"
    );
    assert_eq!(
        bodies[1],
        "New <b>Settle</b>\n<b>Alice</b> (5000 msat) ➜ <b>Bob</b> (4000 msat)"
    );
}

#[tokio::test]
async fn test_link_fail_with_unknown_peer_renders_fallback_alias() {
    let mut source = source(&[LINK_FAIL]);

    let event = routewatch::core::EventSource::next_event(&mut source)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(event.kind, EventKind::LinkFail);
    assert_eq!(event.from_alias, "Alice");
    assert_eq!(event.to_alias, "");
    assert_eq!(event.outgoing_channel_id, Some(300));
    assert_eq!(event.outgoing_htlc_id, Some(0));
    assert_eq!(
        event.failure.as_deref(),
        Some("insufficient bandwidth to route htlc")
    );

    let body = Renderer::new(1, AmountUnit::Msat).render(&event).body;
    assert_eq!(
        body,
        "New <b>LinkFail</b>\n\
         <b>Alice</b> ➜ <b>unknown</b>\n\
         Reason: insufficient bandwidth to route htlc"
    );
}

#[tokio::test]
async fn test_forward_carries_event_metadata() {
    let mut source = source(&[FORWARD]);

    let event = routewatch::core::EventSource::next_event(&mut source)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(event.from_pub_key, "03alice");
    assert_eq!(event.to_pub_key, "03bob");
    assert_eq!(event.incoming_channel_id, Some(100));
    assert_eq!(event.outgoing_htlc_id, Some(9));
    assert_eq!(event.fee_msat(), Some(1000));
    assert_eq!(
        event.timestamp.map(|t| t.timestamp()),
        Some(1_700_000_000)
    );
}
