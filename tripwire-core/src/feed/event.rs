//! Typed events carried by the live feed.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::sse::SseFrame;
use crate::error::FeedError;
use crate::incident::Incident;

pub const INCIDENT_EVENT: &str = "incident";
pub const ENRICHED_EVENT: &str = "incident_enriched";

/// Payload of an `incident_enriched` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnrichmentUpdate {
    pub incident_id: String,
    #[serde(default)]
    pub enrichment: Value,
}

/// A decoded feed event.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Incident(Incident),
    Enriched(EnrichmentUpdate),
}

impl FeedEvent {
    /// Classify and parse one SSE frame.
    ///
    /// Unnamed frames are routed by an in-band `_event` key and default to
    /// `incident`. Unknown event names yield `Ok(None)`; undecodable JSON is
    /// a feed fault.
    pub fn from_frame(
        frame: &SseFrame,
        received_at: DateTime<Utc>,
    ) -> Result<Option<FeedEvent>, FeedError> {
        let name = frame.event.as_deref().unwrap_or("");
        if !name.is_empty() && name != INCIDENT_EVENT && name != ENRICHED_EVENT {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(&frame.data).map_err(|e| malformed(name, e))?;
        let name = if name.is_empty() {
            value
                .get("_event")
                .and_then(Value::as_str)
                .unwrap_or(INCIDENT_EVENT)
                .to_string()
        } else {
            name.to_string()
        };

        match name.as_str() {
            INCIDENT_EVENT => Incident::from_value(value, received_at)
                .map(|incident| Some(FeedEvent::Incident(incident)))
                .map_err(|e| malformed(&name, e)),
            ENRICHED_EVENT => serde_json::from_value::<EnrichmentUpdate>(value)
                .map(|update| Some(FeedEvent::Enriched(update)))
                .map_err(|e| malformed(&name, e)),
            _ => Ok(None),
        }
    }

    pub fn incident_id(&self) -> &str {
        match self {
            FeedEvent::Incident(incident) => &incident.incident_id,
            FeedEvent::Enriched(update) => &update.incident_id,
        }
    }
}

fn malformed(event: &str, error: serde_json::Error) -> FeedError {
    FeedError::MalformedPayload {
        event: if event.is_empty() { INCIDENT_EVENT } else { event }.to_string(),
        message: error.to_string(),
    }
}
