//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    core::{ChatSink, EventSource, Observer},
    dispatcher::{Dispatcher, EventFilter, Registry},
    error::DispatchError,
    formatting::Renderer,
    lnd::LndEventSource,
    notification::{ChatNotifier, LoggingObserver, TelegramClient},
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::{debug, info, instrument};

/// A fully wired application: an event source and the dispatcher that feeds
/// its events to the registered observers.
pub struct App {
    dispatcher: Dispatcher,
    source: Box<dyn EventSource>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Runs the dispatch loop until shutdown is signalled or the source fails.
    pub async fn run(self, shutdown_rx: watch::Receiver<bool>) -> Result<(), DispatchError> {
        let App {
            dispatcher,
            mut source,
        } = self;
        dispatcher.run(source.as_mut(), shutdown_rx).await
    }
}

/// Builder for the main application.
///
/// Separates constructing the application's components from running it, and
/// lets tests swap the external collaborators.
pub struct AppBuilder {
    config: Config,
    source_override: Option<Box<dyn EventSource>>,
    sink_override: Option<Arc<dyn ChatSink>>,
    extra_observers: Vec<Arc<dyn Observer>>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            source_override: None,
            sink_override: None,
            extra_observers: Vec::new(),
        }
    }

    /// Overrides the event source for testing.
    pub fn source_override(mut self, source: Box<dyn EventSource>) -> Self {
        self.source_override = Some(source);
        self
    }

    /// Overrides the chat sink for testing. Skips the bot credential check.
    pub fn sink_override(mut self, sink: Arc<dyn ChatSink>) -> Self {
        self.sink_override = Some(sink);
        self
    }

    /// Registers an additional observer after the configured ones.
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.extra_observers.push(observer);
        self
    }

    /// Builds and initializes all application components, returning a runnable `App`.
    #[instrument(skip_all)]
    pub async fn build(self) -> Result<App> {
        let config = self.config;

        // =========================================================================
        // 1. Chat transport
        // =========================================================================
        let sink: Arc<dyn ChatSink> = match self.sink_override {
            Some(sink) => sink,
            None => {
                let client = TelegramClient::new(
                    &config.telegram.api_url,
                    &config.telegram.token,
                    Duration::from_secs(config.telegram.timeout_seconds),
                )
                .context("failed to create Telegram client")?;
                client
                    .get_me()
                    .await
                    .context("Telegram authentication failed")?;
                Arc::new(client)
            }
        };

        // =========================================================================
        // 2. Observers, in registration order
        // =========================================================================
        let mut registry = Registry::new();
        let renderer = Renderer::new(config.telegram.chat_id, config.notify.amount_unit);
        debug!(
            chat_id = config.telegram.chat_id,
            unit = %renderer.unit(),
            events = ?config.notify.events,
            "Initializing chat notifier"
        );
        registry.register_for(
            Arc::new(ChatNotifier::new("telegram", renderer, sink)),
            EventFilter::from_tags(&config.notify.events),
        );
        if config.notify.log_events {
            registry.register(Arc::new(LoggingObserver));
        }
        for observer in self.extra_observers {
            registry.register(observer);
        }

        // =========================================================================
        // 3. Event source
        // =========================================================================
        let source: Box<dyn EventSource> = match self.source_override {
            Some(source) => source,
            None => Box::new(
                LndEventSource::connect(&config.lnd)
                    .await
                    .context("failed to subscribe to HTLC events")?,
            ),
        };

        info!(
            observers = ?registry.names(),
            "routewatch initialized successfully. Waiting for routing events..."
        );

        Ok(App {
            dispatcher: Dispatcher::new(registry, config.notify.failure_policy),
            source,
        })
    }
}
