//! A metrics recorder that periodically logs all captured counters.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_util::registry::{AtomicStorage, Registry};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Keeps every counter registered through the `metrics` macros and writes a
/// snapshot of them to the log.
#[derive(Clone)]
pub struct LoggingRecorder {
    registry: Arc<Registry<Key, AtomicStorage>>,
}

impl Default for LoggingRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingRecorder {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new(AtomicStorage)),
        }
    }

    /// Current value of a counter, if it has been registered.
    pub fn counter(&self, key: &Key) -> Option<u64> {
        self.registry
            .get_counter_handles()
            .get(key)
            .map(|counter| counter.load(Ordering::Relaxed))
    }

    /// Logs every counter at info level.
    pub fn log_snapshot(&self) {
        debug!("--- Metrics Snapshot ---");
        let mut counters: Vec<_> = self.registry.get_counter_handles().into_iter().collect();
        counters.sort_by(|(a, _), (b, _)| a.name().cmp(b.name()));
        for (key, counter) in counters {
            let labels = key
                .labels()
                .map(|label| format!("{}={}", label.key(), label.value()))
                .collect::<Vec<_>>()
                .join(",");
            info!(
                metric = key.name(),
                labels = %labels,
                value = counter.load(Ordering::Relaxed),
                "[Counter]"
            );
        }
    }

    /// Starts a background task that logs a snapshot every `interval`, and a
    /// final one once `shutdown_rx` fires. A dropped sender leaves the task
    /// ticking.
    pub fn spawn_logger(
        &self,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let recorder = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            let mut shutdown_live = true;
            loop {
                tokio::select! {
                    _ = ticker.tick() => recorder.log_snapshot(),
                    changed = shutdown_rx.changed(), if shutdown_live => {
                        if changed.is_err() {
                            shutdown_live = false;
                            continue;
                        }
                        recorder.log_snapshot();
                        debug!("Metrics logging task stopped.");
                        break;
                    }
                }
            }
        })
    }
}

impl Recorder for LoggingRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        self.registry.get_or_create_counter(key, |c| c.clone()).into()
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        self.registry.get_or_create_gauge(key, |g| g.clone()).into()
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        self.registry.get_or_create_histogram(key, |h| h.clone()).into()
    }
}
