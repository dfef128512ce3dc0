/// routewatch - routing notifications for Lightning node operators
///
/// This library provides the event-observer pipeline that turns a node's
/// HTLC events into chat messages: the observer registry and dispatcher, the
/// message renderer, the LND event source and the Telegram delivery sink.
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod error;
pub mod formatting;
pub mod internal_metrics;
pub mod lnd;
pub mod notification;

// Re-export core types for convenience
pub use core::*;
