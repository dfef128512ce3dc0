//! routewatch - Lightning routing notifications
//!
//! Subscribes to an LND node's HTLC events and sends a Telegram message for
//! every forward and settle.

use clap::Parser;
use routewatch::{app::App, cli::Cli, config::Config, internal_metrics::LoggingRecorder};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load_from_cli(cli).unwrap_or_else(|err| {
        // Initialize a minimal logger for this specific error
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("error"))
            .with_writer(std::io::stderr)
            .init();
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("routewatch starting up...");

    // Log the loaded configuration settings for visibility
    let shown = config.redacted();
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", shown.log_level);
    info!("LND REST Host: {}", shown.lnd.rpc_host);
    info!("Macaroon: {}", shown.lnd.macaroon_path.display());
    info!("TLS Certificate: {}", shown.lnd.cert_path.display());
    info!("Telegram API: {}", shown.telegram.api_url);
    info!("Telegram Token: {}", shown.telegram.token);
    info!("Telegram Chat: {}", shown.telegram.chat_id);
    info!("Amount Unit: {}", shown.notify.amount_unit);
    info!("Failure Policy: {:?}", shown.notify.failure_policy);
    info!("Notify On: {}", shown.notify.events.join(", "));
    info!("Log Events: {}", shown.notify.log_events);
    info!("Log Metrics: {}", shown.metrics.log_metrics);
    info!("Metrics Interval: {}s", shown.metrics.log_interval_seconds);
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received. Finishing the current event...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!("Failed to listen for the shutdown signal: {}", e);
            }
        }
    });

    // =========================================================================
    // Initialize Metrics Recorder if enabled
    // =========================================================================
    let mut metrics_task = None;
    if config.metrics.log_metrics {
        info!(
            "Logging recorder enabled. Metrics will be printed every {} seconds.",
            config.metrics.log_interval_seconds
        );
        let recorder = LoggingRecorder::new();
        let handle = recorder.spawn_logger(
            Duration::from_secs(config.metrics.log_interval_seconds),
            shutdown_rx.clone(),
        );
        match metrics::set_global_recorder(recorder) {
            Ok(()) => metrics_task = Some(handle),
            Err(e) => {
                error!("Failed to install logging recorder: {}", e);
                handle.abort();
            }
        }
    }

    let app = match App::builder(config).build().await {
        Ok(app) => app,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            std::process::exit(1);
        }
    };

    match app.run(shutdown_rx).await {
        Ok(()) => {
            if let Some(handle) = metrics_task {
                if let Err(e) = handle.await {
                    error!("Metrics task panicked: {:?}", e);
                }
            }
            info!("routewatch shut down gracefully.");
        }
        Err(e) => {
            error!("Dispatcher stopped: {}", e);
            std::process::exit(1);
        }
    }
}
