//! Observers that deliver routing events, and the chat transport they use.
//!
//! The dispatcher only knows the `Observer` contract. `ChatNotifier` adapts it
//! to a `ChatSink` through the renderer; `LoggingObserver` writes events to the
//! log.
pub mod chat_notifier;
pub mod logging_observer;
pub mod telegram;

pub use chat_notifier::ChatNotifier;
pub use logging_observer::LoggingObserver;
pub use telegram::{BotIdentity, TelegramClient};
