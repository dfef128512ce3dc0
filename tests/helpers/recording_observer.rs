//! An observer that appends `name:kind` to a shared log.

use async_trait::async_trait;
use routewatch::core::{Observer, RoutingEvent};
use routewatch::error::DeliveryError;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Clone)]
pub struct RecordingObserver {
    pub name: String,
    pub log: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
    pub notifier: Arc<Notify>,
}

impl RecordingObserver {
    pub fn new(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            log,
            fail: false,
            notifier: Arc::new(Notify::new()),
        }
    }

    pub fn failing(name: &str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            fail: true,
            ..Self::new(name, log)
        }
    }
}

#[async_trait]
impl Observer for RecordingObserver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &RoutingEvent) -> Result<(), DeliveryError> {
        let label = if event.from_alias.is_empty() {
            event.kind.to_string()
        } else {
            event.from_alias.clone()
        };
        self.log.lock().unwrap().push(format!("{}:{}", self.name, label));
        self.notifier.notify_one();
        if self.fail {
            return Err(DeliveryError::InvalidResponse("simulated failure".to_string()));
        }
        Ok(())
    }
}
