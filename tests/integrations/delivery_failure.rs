//! Integration tests for the dispatcher's delivery failure policies.

use routewatch::dispatcher::{Dispatcher, FailurePolicy, Registry};
use routewatch::error::{DeliveryError, DispatchError};
use routewatch::formatting::{AmountUnit, Renderer};
use routewatch::notification::ChatNotifier;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing_test::traced_test;

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::mock_sink::MockChatSink;
use helpers::recording_observer::RecordingObserver;
use helpers::scripted_source::ScriptedSource;

fn registry_with(sink: &MockChatSink, log: &Arc<Mutex<Vec<String>>>) -> Registry {
    let mut registry = Registry::new();
    registry.register(Arc::new(ChatNotifier::new(
        "telegram",
        Renderer::new(12345, AmountUnit::Msat),
        Arc::new(sink.clone()),
    )));
    registry.register(Arc::new(RecordingObserver::new("audit", log.clone())));
    registry
}

#[tokio::test]
#[traced_test]
async fn test_continue_policy_logs_and_moves_on() {
    // Arrange: the first send fails.
    let sink = MockChatSink::failing_on(&[0]);
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::new(registry_with(&sink, &log), FailurePolicy::Continue);
    let mut source = ScriptedSource::new(vec![
        helpers::forward("Alice", "Bob", 3000, 2500),
        helpers::forward("Carol", "Dave", 9000, 8000),
    ]);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    // Act
    let result = dispatcher.run(&mut source, shutdown_rx).await;

    // Assert: the loop only ended because the source ran dry.
    assert!(matches!(result, Err(DispatchError::SourceDisconnect)));
    let bodies = sink.bodies();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("Carol"));
    // The later observer still saw the event whose delivery failed.
    assert_eq!(*log.lock().unwrap(), vec!["audit:Alice", "audit:Carol"]);
    assert!(logs_contain("Observer failed to handle event"));
    assert!(logs_contain("telegram"));
}

#[tokio::test]
async fn test_abort_policy_stops_on_first_failure() {
    let sink = MockChatSink::failing_on(&[0]);
    let log = Arc::new(Mutex::new(Vec::new()));
    let dispatcher = Dispatcher::new(registry_with(&sink, &log), FailurePolicy::Abort);
    let mut source = ScriptedSource::new(vec![
        helpers::forward("Alice", "Bob", 3000, 2500),
        helpers::forward("Carol", "Dave", 9000, 8000),
    ]);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let result = dispatcher.run(&mut source, shutdown_rx).await;

    match result {
        Err(DispatchError::Delivery {
            observer,
            event,
            source,
        }) => {
            assert_eq!(observer, "telegram");
            assert_eq!(event, "Forward");
            assert!(matches!(source, DeliveryError::Rejected { status: 502, .. }));
        }
        other => panic!("expected a delivery error, got {:?}", other),
    }
    assert!(sink.bodies().is_empty());
    assert!(log.lock().unwrap().is_empty());
}
