//! A client for delivering notifications through the Telegram Bot API.

use crate::core::{ChatSink, MessageId, OutgoingMessage};
use crate::error::{AuthenticationError, DeliveryError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Envelope shared by every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: MessageId,
}

/// The bot account behind a token, as reported by `getMe`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: i64,
    pub username: Option<String>,
}

/// A client for a single Telegram bot.
pub struct TelegramClient {
    http: reqwest::Client,
    /// `{api_url}/bot{token}`. Never logged.
    bot_url: String,
}

impl TelegramClient {
    /// Creates a new `TelegramClient`.
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            bot_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    /// Verifies the bot token with `getMe`.
    pub async fn get_me(&self) -> Result<BotIdentity, AuthenticationError> {
        let response = self
            .http
            .get(format!("{}/getMe", self.bot_url))
            .send()
            .await
            .map_err(|e| AuthenticationError::Transport(e.without_url()))?;

        let status = response.status();
        let body: ApiResponse<BotIdentity> = response
            .json()
            .await
            .map_err(|e| AuthenticationError::Transport(e.without_url()))?;

        match body {
            ApiResponse {
                ok: true,
                result: Some(identity),
                ..
            } => {
                info!(bot_id = identity.id, username = ?identity.username, "Telegram bot authenticated.");
                Ok(identity)
            }
            ApiResponse { description, .. } => Err(AuthenticationError::Rejected {
                description: description.unwrap_or_else(|| format!("HTTP {}", status)),
            }),
        }
    }
}

#[async_trait]
impl ChatSink for TelegramClient {
    /// Posts the message with `sendMessage`.
    #[instrument(skip(self, message), fields(chat_id = message.destination))]
    async fn send(&self, message: &OutgoingMessage) -> Result<MessageId, DeliveryError> {
        let payload = json!({
            "chat_id": message.destination,
            "text": message.body,
            "parse_mode": message.format.as_str(),
            "disable_web_page_preview": true,
        });

        let response = self
            .http
            .post(format!("{}/sendMessage", self.bot_url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        let body: ApiResponse<SentMessage> = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) => {
                error!(status = %status, error = %e, "Telegram returned a non-JSON response");
                if !status.is_success() {
                    return Err(DeliveryError::Rejected {
                        status: status.as_u16(),
                        description: text,
                    });
                }
                return Err(DeliveryError::InvalidResponse(e.to_string()));
            }
        };

        match body {
            ApiResponse {
                ok: true,
                result: Some(sent),
                ..
            } if status.is_success() => {
                debug!(message_id = sent.message_id, "Message delivered to Telegram.");
                Ok(sent.message_id)
            }
            ApiResponse {
                ok: true,
                result: None,
                ..
            } if status.is_success() => Err(DeliveryError::InvalidResponse(
                "response is missing the sent message".to_string(),
            )),
            ApiResponse { description, .. } => {
                let description = description.unwrap_or_default();
                error!(status = %status, description = %description, "Telegram rejected message");
                Err(DeliveryError::Rejected {
                    status: status.as_u16(),
                    description,
                })
            }
        }
    }
}
