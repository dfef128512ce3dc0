//! The observer that turns routing events into chat notifications.

use crate::core::{ChatSink, Observer, RoutingEvent};
use crate::error::DeliveryError;
use crate::formatting::Renderer;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Renders each event and delivers it through a `ChatSink`.
pub struct ChatNotifier {
    name: String,
    renderer: Renderer,
    sink: Arc<dyn ChatSink>,
}

impl ChatNotifier {
    /// Creates a new `ChatNotifier`.
    pub fn new(name: impl Into<String>, renderer: Renderer, sink: Arc<dyn ChatSink>) -> Self {
        Self {
            name: name.into(),
            renderer,
            sink,
        }
    }
}

#[async_trait]
impl Observer for ChatNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &RoutingEvent) -> Result<(), DeliveryError> {
        let message = self.renderer.render(event);
        debug!(observer = %self.name, body = %message.body, "Rendered notification");

        let message_id = self.sink.send(&message).await?;
        info!(
            observer = %self.name,
            event = %event.kind,
            chat_id = message.destination,
            message_id,
            "Notification delivered"
        );
        Ok(())
    }
}
