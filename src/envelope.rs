// =============================================================================
// Request / Envelope: inbound query and outbound frame
// =============================================================================
//
// Every outbound message is wrapped as
//   { "type": ..., "request_id": ..., "timestamp": ..., "payload": ... }
// with an ISO-8601 `Z` timestamp, so callers can correlate responses with the
// request that produced them.
// =============================================================================

use anyhow::{Context, Result};
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::IndicatorRow;

fn default_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().simple())
}

/// A request for the indicator table of one symbol, optionally bounded by an
/// inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRequest {
    #[serde(default = "default_request_id")]
    pub request_id: String,
    pub symbol: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl IndicatorRequest {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            request_id: default_request_id(),
            symbol: symbol.into(),
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_range(mut self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    /// Whether `date` falls inside the requested (inclusive) range.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }
}

/// Payload of an `indicators` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorPayload {
    pub symbol: String,
    pub count: usize,
    pub rows: Vec<IndicatorRow>,
}

/// Outbound message frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub request_id: String,
    pub timestamp: String,
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Wrap any serialisable payload.
    pub fn new(kind: impl Into<String>, request_id: impl Into<String>, payload: impl Serialize) -> Result<Self> {
        let kind = kind.into();
        let payload = serde_json::to_value(payload)
            .with_context(|| format!("failed to serialise {kind} payload"))?;
        Ok(Self {
            kind,
            request_id: request_id.into(),
            timestamp: now_iso(),
            payload,
        })
    }

    /// An `error` envelope carrying a message.
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            request_id: request_id.into(),
            timestamp: now_iso(),
            payload: serde_json::json!({ "message": message.into() }),
        }
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
