//! Decoding of the node's HTLC event stream.
//!
//! LND's REST proxy wraps each streamed message as `{"result": {...}}`, or
//! `{"error": {...}}` when the subscription fails. 64-bit integers are encoded
//! as JSON strings.

use crate::error::SourceError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// One message of the `SubscribeHtlcEvents` stream.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct HtlcEvent {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub incoming_channel_id: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub outgoing_channel_id: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub incoming_htlc_id: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub outgoing_htlc_id: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub timestamp_ns: u64,
    /// `UNKNOWN`, `SEND`, `RECEIVE` or `FORWARD`.
    pub event_type: String,
    pub forward_event: Option<ForwardEvent>,
    pub forward_fail_event: Option<serde_json::Value>,
    pub settle_event: Option<serde_json::Value>,
    pub link_fail_event: Option<LinkFailEvent>,
    pub subscribed_event: Option<serde_json::Value>,
    pub final_htlc_event: Option<FinalHtlcEvent>,
    /// Members this version does not know, keyed by field name.
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForwardEvent {
    pub info: Option<HtlcInfo>,
}

/// Timelocks and amounts of both legs of an HTLC.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct HtlcInfo {
    pub incoming_timelock: u32,
    pub outgoing_timelock: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub incoming_amt_msat: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub outgoing_amt_msat: u64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinkFailEvent {
    pub info: Option<HtlcInfo>,
    pub wire_failure: String,
    pub failure_detail: String,
    pub failure_string: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FinalHtlcEvent {
    pub settled: bool,
    pub offchain: bool,
}

/// Which member of the event one-of is populated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HtlcOutcome<'a> {
    Forward(Option<&'a HtlcInfo>),
    ForwardFail,
    Settle,
    LinkFail(&'a LinkFailEvent),
    Subscribed,
    FinalHtlc(&'a FinalHtlcEvent),
    /// No known member is set. Carries the name of an unknown one, if any.
    Unrecognized(Option<&'a str>),
}

/// Identifies one HTLC across the events LND emits for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HtlcKey {
    pub incoming_channel_id: u64,
    pub incoming_htlc_id: u64,
    pub outgoing_channel_id: u64,
    pub outgoing_htlc_id: u64,
}

impl HtlcEvent {
    pub fn outcome(&self) -> HtlcOutcome<'_> {
        if let Some(forward) = &self.forward_event {
            HtlcOutcome::Forward(forward.info.as_ref())
        } else if self.settle_event.is_some() {
            HtlcOutcome::Settle
        } else if self.forward_fail_event.is_some() {
            HtlcOutcome::ForwardFail
        } else if let Some(link_fail) = &self.link_fail_event {
            HtlcOutcome::LinkFail(link_fail)
        } else if let Some(final_htlc) = &self.final_htlc_event {
            HtlcOutcome::FinalHtlc(final_htlc)
        } else if self.subscribed_event.is_some() {
            HtlcOutcome::Subscribed
        } else {
            let member = self
                .other
                .iter()
                .find(|(_, value)| value.is_object())
                .map(|(name, _)| name.as_str());
            HtlcOutcome::Unrecognized(member)
        }
    }

    pub fn key(&self) -> HtlcKey {
        HtlcKey {
            incoming_channel_id: self.incoming_channel_id,
            incoming_htlc_id: self.incoming_htlc_id,
            outgoing_channel_id: self.outgoing_channel_id,
            outgoing_htlc_id: self.outgoing_htlc_id,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if self.timestamp_ns == 0 {
            return None;
        }
        let secs = (self.timestamp_ns / 1_000_000_000) as i64;
        let nanos = (self.timestamp_ns % 1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nanos)
    }
}

#[derive(Debug, Deserialize)]
struct Frame {
    result: Option<HtlcEvent>,
    error: Option<RpcStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RpcStatus {
    code: i64,
    message: String,
}

/// Parses a raw text frame from the event stream.
///
/// # Returns
/// * `Ok(HtlcEvent)` for a result frame
/// * `Err(SourceError::Upstream)` if the node reported an error
/// * `Err(SourceError::Decode)` if the JSON is malformed
pub fn parse_frame(text: &str) -> Result<HtlcEvent, SourceError> {
    let frame: Frame = serde_json::from_str(text)?;
    match frame {
        Frame {
            error: Some(status),
            ..
        } => Err(SourceError::Upstream {
            code: status.code,
            message: status.message,
        }),
        Frame {
            result: Some(event),
            ..
        } => Ok(event),
        Frame { .. } => Err(SourceError::Decode(<serde_json::Error as serde::de::Error>::custom(
            "frame has neither a result nor an error",
        ))),
    }
}
