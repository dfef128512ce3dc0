//! Integration tests for graceful shutdown of the dispatch loop.

use async_trait::async_trait;
use routewatch::core::{Observer, RoutingEvent};
use routewatch::dispatcher::{Dispatcher, FailurePolicy, Registry};
use routewatch::error::{DeliveryError, DispatchError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing_test::traced_test;

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::recording_observer::RecordingObserver;
use helpers::scripted_source::{ChannelSource, ScriptedSource};

#[tokio::test]
async fn test_shutdown_while_waiting_returns_ok() {
    // Arrange
    let log = Arc::new(Mutex::new(Vec::new()));
    let observer = RecordingObserver::new("A", log.clone());
    let delivered = observer.notifier.clone();
    let mut registry = Registry::new();
    registry.register(Arc::new(observer));
    let dispatcher = Dispatcher::new(registry, FailurePolicy::Continue);

    let (events_tx, mut source) = ChannelSource::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move { dispatcher.run(&mut source, shutdown_rx).await });

    // Act
    events_tx
        .send(helpers::forward("Alice", "Bob", 3000, 2500))
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), delivered.notified())
        .await
        .expect("event was not delivered");
    shutdown_tx.send(true).unwrap();

    // Assert: the loop exits even though the source never ends.
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("dispatcher did not stop")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(*log.lock().unwrap(), vec!["A:Alice"]);
}

#[tokio::test]
async fn test_shutdown_before_start_pulls_nothing() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = Registry::new();
    registry.register(Arc::new(RecordingObserver::new("A", log.clone())));
    let dispatcher = Dispatcher::new(registry, FailurePolicy::Continue);

    let mut source = ScriptedSource::new(vec![helpers::forward("Alice", "Bob", 3000, 2500)]);
    let (_shutdown_tx, shutdown_rx) = watch::channel(true);

    let result = dispatcher.run(&mut source, shutdown_rx).await;

    assert!(result.is_ok());
    assert!(log.lock().unwrap().is_empty());
}

/// Blocks inside `handle` until released.
struct SlowObserver {
    started: Arc<Notify>,
    release: Arc<Notify>,
    finished: Arc<Mutex<bool>>,
}

#[async_trait]
impl Observer for SlowObserver {
    fn name(&self) -> &str {
        "slow"
    }

    async fn handle(&self, _event: &RoutingEvent) -> Result<(), DeliveryError> {
        self.started.notify_one();
        self.release.notified().await;
        *self.finished.lock().unwrap() = true;
        Ok(())
    }
}

#[tokio::test]
async fn test_in_flight_delivery_completes_before_exit() {
    // Arrange
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let finished = Arc::new(Mutex::new(false));
    let mut registry = Registry::new();
    registry.register(Arc::new(SlowObserver {
        started: started.clone(),
        release: release.clone(),
        finished: finished.clone(),
    }));
    let dispatcher = Dispatcher::new(registry, FailurePolicy::Continue);

    let (events_tx, mut source) = ChannelSource::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { dispatcher.run(&mut source, shutdown_rx).await });

    events_tx
        .send(helpers::forward("Alice", "Bob", 3000, 2500))
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), started.notified())
        .await
        .expect("delivery did not start");

    // Act: signal shutdown mid-delivery, then let the delivery finish.
    shutdown_tx.send(true).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());
    release.notify_one();

    // Assert
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("dispatcher did not stop")
        .unwrap();
    assert!(result.is_ok());
    assert!(*finished.lock().unwrap());
}

#[tokio::test]
#[traced_test]
async fn test_dropped_sender_is_not_a_shutdown() {
    // Arrange
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = Registry::new();
    registry.register(Arc::new(RecordingObserver::new("A", log.clone())));
    let dispatcher = Dispatcher::new(registry, FailurePolicy::Continue);

    let mut source = ScriptedSource::new(vec![
        helpers::forward("Alice", "Bob", 3000, 2500),
        helpers::forward("Carol", "Dave", 3000, 2500),
    ]);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    drop(shutdown_tx);

    // Act
    let result = dispatcher.run(&mut source, shutdown_rx).await;

    // Assert: every event is still delivered and the loop ends on disconnect.
    assert!(matches!(result, Err(DispatchError::SourceDisconnect)));
    assert_eq!(*log.lock().unwrap(), vec!["A:Alice", "A:Carol"]);
    assert!(logs_contain("Shutdown sender dropped"));
    assert!(!logs_contain("Dispatcher received shutdown signal"));
}
