//! Conversion of raw HTLC events into routing events.

use crate::core::{EventKind, RoutingEvent};
use crate::lnd::graph::{ChannelDirectory, Peer};
use crate::lnd::htlc::{HtlcEvent, HtlcInfo, HtlcKey, HtlcOutcome, LinkFailEvent};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Turns `HtlcEvent`s into `RoutingEvent`s, resolving aliases and carrying
/// forward amounts over to the settle or failure of the same HTLC.
pub struct EventTranslator {
    directory: Arc<dyn ChannelDirectory>,
    forwards: Cache<HtlcKey, (u64, u64)>,
}

impl EventTranslator {
    pub fn new(directory: Arc<dyn ChannelDirectory>) -> Self {
        Self {
            directory,
            forwards: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(24 * 3600))
                .build(),
        }
    }

    /// Translates one event. Returns `None` for stream bookkeeping messages
    /// that do not describe an HTLC.
    pub async fn translate(&self, htlc: &HtlcEvent) -> Option<RoutingEvent> {
        let key = htlc.key();
        let (kind, amounts, failure) = match htlc.outcome() {
            HtlcOutcome::Subscribed => {
                debug!("HTLC event subscription confirmed by node");
                return None;
            }
            HtlcOutcome::Forward(info) => {
                let amounts = info.map(amounts_of);
                if let Some(amounts) = amounts {
                    self.forwards.insert(key, amounts).await;
                }
                (EventKind::Forward, amounts, None)
            }
            HtlcOutcome::Settle => (EventKind::Settle, self.forwards.remove(&key).await, None),
            HtlcOutcome::ForwardFail => {
                (EventKind::ForwardFail, self.forwards.remove(&key).await, None)
            }
            HtlcOutcome::LinkFail(fail) => {
                let amounts = match fail.info.as_ref() {
                    Some(info) => Some(amounts_of(info)),
                    None => self.forwards.remove(&key).await,
                };
                (EventKind::LinkFail, amounts, failure_text(fail))
            }
            HtlcOutcome::FinalHtlc(_) => (EventKind::Other("FinalHtlc".to_string()), None, None),
            HtlcOutcome::Unrecognized(member) => {
                let tag = member.map_or_else(|| "Unrecognized".to_string(), member_tag);
                (EventKind::Other(tag), None, None)
            }
        };

        let from = self.endpoint(htlc.incoming_channel_id).await;
        let to = self.endpoint(htlc.outgoing_channel_id).await;
        if amounts.is_none() && matches!(kind, EventKind::Forward | EventKind::Settle) {
            debug!(?key, event = %kind, "HTLC amounts unknown");
        }
        let (incoming_msat, outgoing_msat) = amounts.unzip();

        Some(RoutingEvent {
            kind,
            from_alias: from.alias,
            to_alias: to.alias,
            from_pub_key: from.pub_key,
            to_pub_key: to.pub_key,
            incoming_channel_id: non_zero(htlc.incoming_channel_id),
            outgoing_channel_id: non_zero(htlc.outgoing_channel_id),
            incoming_htlc_id: non_zero(htlc.incoming_channel_id).map(|_| htlc.incoming_htlc_id),
            outgoing_htlc_id: non_zero(htlc.outgoing_channel_id).map(|_| htlc.outgoing_htlc_id),
            incoming_msat,
            outgoing_msat,
            failure,
            timestamp: htlc.timestamp(),
        })
    }

    /// Channel id 0 stands for the local node (payments it sends or receives).
    async fn endpoint(&self, channel_id: u64) -> Peer {
        let result = if channel_id == 0 {
            self.directory.local_node().await
        } else {
            self.directory.channel_peer(channel_id).await
        };
        result.unwrap_or_else(|e| {
            warn!(channel_id, error = %e, "Failed to resolve channel peer; alias left empty");
            Peer::default()
        })
    }
}

fn amounts_of(info: &HtlcInfo) -> (u64, u64) {
    (info.incoming_amt_msat, info.outgoing_amt_msat)
}

fn failure_text(fail: &LinkFailEvent) -> Option<String> {
    [&fail.failure_string, &fail.failure_detail, &fail.wire_failure]
        .into_iter()
        .find(|s| !s.is_empty())
        .cloned()
}

/// `some_new_event` becomes `SomeNew`, the way `final_htlc_event` is shown
/// as `FinalHtlc`.
fn member_tag(member: &str) -> String {
    member
        .strip_suffix("_event")
        .unwrap_or(member)
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn non_zero(id: u64) -> Option<u64> {
    (id != 0).then_some(id)
}
