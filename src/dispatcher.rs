//! Observer registry and the sequential dispatch loop.
//!
//! Every event pulled from the source is offered to every registered observer
//! in registration order before the next event is pulled.

use crate::core::{EventKind, EventSource, Observer, RoutingEvent};
use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// What the dispatcher does when an observer fails to handle an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and keep delivering.
    #[default]
    Continue,
    /// Log the failure and stop the loop with an error.
    Abort,
}

/// Selects which event kinds an observer is handed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventFilter {
    #[default]
    All,
    Only(Vec<EventKind>),
}

impl EventFilter {
    /// Builds a filter from configured tags. `"*"` selects everything.
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        if tags.iter().any(|t| t.as_ref().trim() == "*") {
            return EventFilter::All;
        }
        EventFilter::Only(tags.iter().map(|t| EventKind::from_tag(t.as_ref().trim())).collect())
    }

    pub fn accepts(&self, kind: &EventKind) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Only(kinds) => kinds.iter().any(|k| {
                k == kind || k.tag().eq_ignore_ascii_case(kind.tag())
            }),
        }
    }
}

struct Registration {
    observer: Arc<dyn Observer>,
    filter: EventFilter,
}

/// Ordered set of observers. Built before the dispatcher runs.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an observer that receives every event.
    pub fn register(&mut self, observer: Arc<dyn Observer>) {
        self.register_for(observer, EventFilter::All);
    }

    /// Appends an observer that receives only events accepted by `filter`.
    pub fn register_for(&mut self, observer: Arc<dyn Observer>, filter: EventFilter) {
        if self.entries.iter().any(|e| e.observer.name() == observer.name()) {
            warn!(
                observer = observer.name(),
                "An observer with this name is already registered; both will receive events."
            );
        }
        debug!(observer = observer.name(), ?filter, "Registering observer");
        self.entries.push(Registration { observer, filter });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Observer names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.observer.name()).collect()
    }
}

/// Outcome of offering one event to the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Drives delivery of events from a source to the registered observers.
pub struct Dispatcher {
    registry: Registry,
    policy: FailurePolicy,
}

impl Dispatcher {
    pub fn new(registry: Registry, policy: FailurePolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Offers one event to every observer, in registration order.
    ///
    /// Under `FailurePolicy::Abort` the first failure is returned and the
    /// remaining observers do not see the event.
    pub async fn dispatch(&self, event: &RoutingEvent) -> Result<DispatchReport, DispatchError> {
        let mut report = DispatchReport::default();

        for entry in &self.registry.entries {
            let name = entry.observer.name();
            if !entry.filter.accepts(&event.kind) {
                report.skipped += 1;
                continue;
            }

            match entry.observer.handle(event).await {
                Ok(()) => {
                    report.delivered += 1;
                    metrics::counter!("deliveries_total", "observer" => name.to_string())
                        .increment(1);
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("delivery_failures_total", "observer" => name.to_string())
                        .increment(1);
                    error!(
                        observer = name,
                        event = %event.kind,
                        from = %event.from_pub_key,
                        to = %event.to_pub_key,
                        error = %e,
                        "Observer failed to handle event"
                    );
                    if self.policy == FailurePolicy::Abort {
                        return Err(DispatchError::Delivery {
                            observer: name.to_string(),
                            event: event.kind.tag().to_string(),
                            source: e,
                        });
                    }
                }
            }
        }

        Ok(report)
    }

    /// Pulls events one at a time and dispatches each before pulling the next.
    ///
    /// Returns `Ok(())` once `shutdown` is signalled. An event that is being
    /// delivered when the signal arrives is delivered to completion first.
    /// If the sender is dropped without signalling, the loop keeps running.
    /// The end of the stream is reported as `DispatchError::SourceDisconnect`.
    #[instrument(skip_all, fields(observers = self.registry.len()))]
    pub async fn run<S>(
        &self,
        source: &mut S,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), DispatchError>
    where
        S: EventSource + ?Sized,
    {
        info!(observers = ?self.registry.names(), policy = ?self.policy, "Dispatcher started.");
        let mut shutdown_live = true;

        loop {
            if *shutdown_rx.borrow() {
                info!("Dispatcher received shutdown signal.");
                return Ok(());
            }

            let next = tokio::select! {
                biased;
                changed = shutdown_rx.changed(), if shutdown_live => match changed {
                    Ok(()) => {
                        info!("Dispatcher received shutdown signal.");
                        return Ok(());
                    }
                    Err(_) => {
                        warn!("Shutdown sender dropped; the dispatcher can no longer be stopped by signal.");
                        shutdown_live = false;
                        continue;
                    }
                },
                next = source.next_event() => next,
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(e)) => {
                    error!(error = %e, "Event source failed.");
                    return Err(DispatchError::Source(e));
                }
                None => {
                    error!("Event source disconnected.");
                    return Err(DispatchError::SourceDisconnect);
                }
            };

            metrics::counter!("events_received_total").increment(1);
            debug!(
                event = %event.kind,
                incoming_channel = ?event.incoming_channel_id,
                outgoing_channel = ?event.outgoing_channel_id,
                "Dispatching event"
            );

            let report = self.dispatch(&event).await?;
            debug!(?report, event = %event.kind, "Event dispatched");
        }
    }
}
