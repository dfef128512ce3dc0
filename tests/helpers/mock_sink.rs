//! A mock chat sink for testing delivery without a network.

use async_trait::async_trait;
use routewatch::core::{ChatSink, MessageId, OutgoingMessage};
use routewatch::error::DeliveryError;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

#[derive(Clone, Debug, Default)]
pub struct MockChatSink {
    pub sent: Arc<Mutex<Vec<OutgoingMessage>>>,
    /// Zero-based indices of `send` calls that fail.
    pub fail_on: Arc<Mutex<Vec<usize>>>,
    calls: Arc<AtomicUsize>,
}

impl MockChatSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose calls at the given indices fail.
    pub fn failing_on(calls: &[usize]) -> Self {
        let sink = Self::default();
        *sink.fail_on.lock().unwrap() = calls.to_vec();
        sink
    }

    pub fn bodies(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.body.clone()).collect()
    }
}

#[async_trait]
impl ChatSink for MockChatSink {
    async fn send(&self, message: &OutgoingMessage) -> Result<MessageId, DeliveryError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on.lock().unwrap().contains(&call) {
            return Err(DeliveryError::Rejected {
                status: 502,
                description: "Bad Gateway".to_string(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(sent.len() as MessageId)
    }
}
