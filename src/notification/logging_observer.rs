//! A simple observer that logs received events.
//!
//! Useful to validate the pipeline without a chat destination and as an audit
//! trail next to the chat notifier.

use crate::core::{Observer, RoutingEvent};
use crate::error::DeliveryError;
use async_trait::async_trait;
use tracing::info;

pub struct LoggingObserver;

#[async_trait]
impl Observer for LoggingObserver {
    fn name(&self) -> &str {
        "log"
    }

    async fn handle(&self, event: &RoutingEvent) -> Result<(), DeliveryError> {
        info!(
            event = %event.kind,
            from_alias = %event.from_alias,
            from_pub_key = %event.from_pub_key,
            to_alias = %event.to_alias,
            to_pub_key = %event.to_pub_key,
            incoming_channel = ?event.incoming_channel_id,
            outgoing_channel = ?event.outgoing_channel_id,
            incoming_htlc = ?event.incoming_htlc_id,
            outgoing_htlc = ?event.outgoing_htlc_id,
            incoming_msat = ?event.incoming_msat,
            outgoing_msat = ?event.outgoing_msat,
            failure = ?event.failure,
            "Received routing event"
        );
        Ok(())
    }
}
