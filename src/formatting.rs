// src/formatting.rs

use crate::core::{ChatId, EventKind, OutgoingMessage, ParseMode, RoutingEvent};
use serde::{Deserialize, Serialize};
use std::fmt;

const UNKNOWN_ALIAS: &str = "unknown";

/// The unit every amount of a message is displayed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountUnit {
    #[default]
    Msat,
    /// Whole satoshi, truncated toward zero.
    Sat,
}

impl AmountUnit {
    fn amount(&self, msat: u64) -> u64 {
        match self {
            AmountUnit::Msat => msat,
            AmountUnit::Sat => msat / 1000,
        }
    }

    fn signed(&self, msat: i128) -> i128 {
        match self {
            AmountUnit::Msat => msat,
            AmountUnit::Sat => msat / 1000,
        }
    }
}

impl fmt::Display for AmountUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountUnit::Msat => f.write_str("msat"),
            AmountUnit::Sat => f.write_str("sat"),
        }
    }
}

/// Maps routing events to chat messages for one destination.
///
/// Rendering is a pure function of the event: no I/O and no state, so the
/// same event always renders to the same message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderer {
    destination: ChatId,
    unit: AmountUnit,
}

impl Renderer {
    pub fn new(destination: ChatId, unit: AmountUnit) -> Self {
        Self { destination, unit }
    }

    pub fn unit(&self) -> AmountUnit {
        self.unit
    }

    /// Renders one event into an HTML message.
    pub fn render(&self, event: &RoutingEvent) -> OutgoingMessage {
        let mut lines = vec![format!("New <b>{}</b>", escape_html(event.kind.tag()))];

        match &event.kind {
            EventKind::Forward => match event.amounts() {
                Some((incoming, outgoing)) => {
                    lines.push(self.route_with_amounts(event, incoming, outgoing));
                    let fee = i128::from(incoming) - i128::from(outgoing);
                    lines.push(format!("💲 Earned: {} {}", self.unit.signed(fee), self.unit));
                }
                None => lines.push(route(event)),
            },
            EventKind::Settle => match event.amounts() {
                Some((incoming, outgoing)) => {
                    lines.push(self.route_with_amounts(event, incoming, outgoing))
                }
                None => lines.push(route(event)),
            },
            EventKind::ForwardFail => {
                lines.push(route(event));
            }
            EventKind::LinkFail => {
                lines.push(route(event));
                if let Some(failure) = event.failure.as_deref().filter(|f| !f.is_empty()) {
                    lines.push(format!("Reason: {}", escape_html(failure)));
                }
            }
            EventKind::Other(_) => {}
        }

        OutgoingMessage {
            destination: self.destination,
            body: lines.join("\n"),
            format: ParseMode::Html,
        }
    }

    fn route_with_amounts(&self, event: &RoutingEvent, incoming: u64, outgoing: u64) -> String {
        format!(
            "<b>{}</b> ({} {unit}) ➜ <b>{}</b> ({} {unit})",
            display_alias(&event.from_alias),
            self.unit.amount(incoming),
            display_alias(&event.to_alias),
            self.unit.amount(outgoing),
            unit = self.unit,
        )
    }
}

fn route(event: &RoutingEvent) -> String {
    format!(
        "<b>{}</b> ➜ <b>{}</b>",
        display_alias(&event.from_alias),
        display_alias(&event.to_alias)
    )
}

fn display_alias(alias: &str) -> String {
    if alias.trim().is_empty() {
        UNKNOWN_ALIAS.to_string()
    } else {
        escape_html(alias)
    }
}

/// Escapes the characters Telegram's HTML mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
