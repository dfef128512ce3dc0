//! WebSocket client for the node's HTLC event subscription.
//!
//! LND's REST proxy exposes server-streaming RPCs as WebSockets. The client
//! sends the (empty) request body once and then reads one JSON frame per event.

use crate::config::LndConfig;
use crate::core::{EventSource, RoutingEvent};
use crate::error::SourceError;
use crate::lnd::credentials::{LndCredentials, MACAROON_HEADER};
use crate::lnd::graph::LndGraphClient;
use crate::lnd::htlc::parse_frame;
use crate::lnd::translate::EventTranslator;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Trait for WebSocket connections to enable testing with fake implementations
#[async_trait]
pub trait WebSocketConnection: Send + Sync {
    /// Reads the next message from the WebSocket connection
    ///
    /// # Returns
    /// * `Some(Ok(Message))` if a message was successfully received
    /// * `Some(Err(error))` if there was an error reading the message
    /// * `None` if the connection has been closed
    async fn read_message(&mut self) -> Option<Result<Message, WsError>>;
}

/// A live connection to the node.
pub struct TungsteniteConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl WebSocketConnection for TungsteniteConnection {
    async fn read_message(&mut self) -> Option<Result<Message, WsError>> {
        self.stream.next().await
    }
}

/// The HTLC event stream of one LND node.
pub struct LndEventSource {
    connection: Box<dyn WebSocketConnection>,
    translator: EventTranslator,
}

impl LndEventSource {
    /// Builds a source over an existing connection (primarily for testing).
    pub fn new(connection: Box<dyn WebSocketConnection>, translator: EventTranslator) -> Self {
        Self {
            connection,
            translator,
        }
    }

    /// Loads credentials, opens the subscription and prepares alias lookups.
    pub async fn connect(config: &LndConfig) -> Result<Self, SourceError> {
        let credentials = LndCredentials::load(config)?;
        let graph = LndGraphClient::new(
            credentials.http_client()?,
            format!("https://{}", config.rpc_host),
        );

        let url = format!("wss://{}/v2/router/htlcevents?method=GET", config.rpc_host);
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| SourceError::Connect(e.to_string()))?;
        let mut macaroon = HeaderValue::from_str(credentials.macaroon_hex())
            .map_err(|e| SourceError::Connect(e.to_string()))?;
        macaroon.set_sensitive(true);
        request.headers_mut().insert(MACAROON_HEADER, macaroon);

        info!(url = %url, "Connecting to HTLC event stream");
        let connector = Connector::NativeTls(credentials.tls_connector()?);
        let (mut stream, _) =
            tokio_tungstenite::connect_async_tls_with_config(request, None, false, Some(connector))
                .await
                .map_err(|e| SourceError::Connect(format!("{}: {}", url, e)))?;

        // The subscription request has no fields.
        stream
            .send(Message::Text("{}".into()))
            .await
            .map_err(|e| SourceError::Connect(e.to_string()))?;
        info!(rpc_host = %config.rpc_host, "Subscribed to HTLC events");

        Ok(Self::new(
            Box::new(TungsteniteConnection { stream }),
            EventTranslator::new(Arc::new(graph)),
        ))
    }
}

#[async_trait]
impl EventSource for LndEventSource {
    async fn next_event(&mut self) -> Option<Result<RoutingEvent, SourceError>> {
        loop {
            match self.connection.read_message().await {
                Some(Ok(Message::Text(text))) => match parse_frame(text.as_str()) {
                    Ok(htlc) => {
                        if let Some(event) = self.translator.translate(&htlc).await {
                            return Some(Ok(event));
                        }
                    }
                    Err(SourceError::Decode(e)) => {
                        warn!("Failed to parse HTLC event frame: {}", e);
                        // Continue processing other messages
                    }
                    Err(e) => return Some(Err(e)),
                },
                Some(Ok(Message::Binary(_))) => {
                    debug!("Received binary message, ignoring");
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    debug!("Received keepalive message");
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "Received close message from node");
                    return None;
                }
                Some(Ok(Message::Frame(_))) => {
                    debug!("Received frame message, ignoring");
                }
                Some(Err(e)) => {
                    return Some(Err(SourceError::Transport(Box::new(e))));
                }
                None => {
                    info!("HTLC event stream closed");
                    return None;
                }
            }
        }
    }
}
