//! LND event source adapter.
//!
//! Subscribes to the node's HTLC event stream over the REST proxy's WebSocket
//! endpoint and yields `RoutingEvent`s with peer aliases resolved through the
//! channel graph.

pub mod credentials;
pub mod graph;
pub mod htlc;
pub mod stream;
pub mod translate;

pub use credentials::LndCredentials;
pub use graph::{ChannelDirectory, LndGraphClient, Peer};
pub use stream::{LndEventSource, WebSocketConnection};
pub use translate::EventTranslator;
