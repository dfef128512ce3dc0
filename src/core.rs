//! Core domain types and service traits for routewatch
//!
//! This module defines the routing event model and the trait contracts that
//! connect the event source, the dispatcher's observers and the chat sink.

use crate::error::{DeliveryError, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

/// Identifier of a chat destination. Group chats use negative ids.
pub type ChatId = i64;

/// Identifier the chat transport assigns to a delivered message.
pub type MessageId = i64;

/// The kind of routing occurrence an event describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// An HTLC was routed through the node.
    Forward,
    /// An HTLC was settled.
    Settle,
    /// A forwarded HTLC failed downstream.
    ForwardFail,
    /// An HTLC failed on one of the node's links.
    LinkFail,
    /// Anything the event source does not classify further.
    Other(String),
}

impl EventKind {
    /// The literal type tag used in headers and logs.
    pub fn tag(&self) -> &str {
        match self {
            EventKind::Forward => "Forward",
            EventKind::Settle => "Settle",
            EventKind::ForwardFail => "ForwardFail",
            EventKind::LinkFail => "LinkFail",
            EventKind::Other(tag) => tag,
        }
    }

    /// Parses a type tag case-insensitively. Unknown tags become `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "forward" => EventKind::Forward,
            "settle" => EventKind::Settle,
            "forwardfail" | "forward_fail" => EventKind::ForwardFail,
            "linkfail" | "link_fail" => EventKind::LinkFail,
            _ => EventKind::Other(tag.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One routing-related occurrence on the node.
///
/// Built once by the event source and never mutated afterwards. Observers
/// receive it by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingEvent {
    pub kind: EventKind,
    /// Alias of the node the HTLC came from. May be empty.
    pub from_alias: String,
    /// Alias of the node the HTLC went to. May be empty.
    pub to_alias: String,
    pub from_pub_key: String,
    pub to_pub_key: String,
    pub incoming_channel_id: Option<u64>,
    pub outgoing_channel_id: Option<u64>,
    pub incoming_htlc_id: Option<u64>,
    pub outgoing_htlc_id: Option<u64>,
    /// Amount of the incoming leg. `None` when the source could not tell.
    pub incoming_msat: Option<u64>,
    /// Amount of the outgoing leg. `None` when the source could not tell.
    pub outgoing_msat: Option<u64>,
    /// Failure description, set for link failures.
    pub failure: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl RoutingEvent {
    /// Creates an event of the given kind with every other field empty.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            from_alias: String::new(),
            to_alias: String::new(),
            from_pub_key: String::new(),
            to_pub_key: String::new(),
            incoming_channel_id: None,
            outgoing_channel_id: None,
            incoming_htlc_id: None,
            outgoing_htlc_id: None,
            incoming_msat: None,
            outgoing_msat: None,
            failure: None,
            timestamp: None,
        }
    }

    /// Convenience constructor for a forward between two aliased peers.
    pub fn forward(from_alias: &str, to_alias: &str, incoming_msat: u64, outgoing_msat: u64) -> Self {
        Self {
            from_alias: from_alias.to_string(),
            to_alias: to_alias.to_string(),
            incoming_msat: Some(incoming_msat),
            outgoing_msat: Some(outgoing_msat),
            ..Self::new(EventKind::Forward)
        }
    }

    /// Both leg amounts, when the source knows them.
    pub fn amounts(&self) -> Option<(u64, u64)> {
        self.incoming_msat.zip(self.outgoing_msat)
    }

    /// Fee earned by the node in millisatoshi, signed so that an upstream
    /// violation (outgoing above incoming) still yields a value. `None` when
    /// either amount is unknown.
    pub fn fee_msat(&self) -> Option<i128> {
        self.amounts()
            .map(|(incoming, outgoing)| i128::from(incoming) - i128::from(outgoing))
    }
}

/// Markup dialect of a rendered message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Html,
}

impl ParseMode {
    /// The transport-facing name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Html => "HTML",
        }
    }
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub destination: ChatId,
    pub body: String,
    pub format: ParseMode,
}

// =============================================================================
// Service Traits
// =============================================================================

/// A named handler invoked once per dispatched event.
#[async_trait]
pub trait Observer: Send + Sync {
    /// A descriptive name for the observer, used in logs and metrics.
    fn name(&self) -> &str;

    /// Processes a single event.
    ///
    /// # Returns
    /// * `Ok(())` if the event was handled
    /// * `Err(DeliveryError)` if the notification could not be delivered
    async fn handle(&self, event: &RoutingEvent) -> Result<(), DeliveryError>;
}

/// Delivers rendered messages to a chat.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Sends a message to the destination it carries.
    ///
    /// # Returns
    /// * `Ok(MessageId)` assigned by the transport on success
    /// * `Err(DeliveryError)` for any non-success outcome
    async fn send(&self, message: &OutgoingMessage) -> Result<MessageId, DeliveryError>;
}

/// A lazy, non-restartable feed of routing events.
#[async_trait]
pub trait EventSource: Send {
    /// Waits for the next event.
    ///
    /// # Returns
    /// * `Some(Ok(event))` for each event in upstream order
    /// * `Some(Err(error))` if the stream failed
    /// * `None` once the upstream has disconnected
    async fn next_event(&mut self) -> Option<Result<RoutingEvent, SourceError>>;
}
