//! HTTP client for the detection backend: startup snapshot and live stream.

use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use super::event::FeedEvent;
use super::sse::{SseDecoder, SseFrame};
use crate::clock::Clock;
use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::incident::Incident;

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    #[serde(default)]
    cards: Vec<serde_json::Value>,
}

/// Talks to the upstream pipeline. Knows nothing about triage state.
pub struct FeedClient {
    client: reqwest::Client,
    config: FeedConfig,
    clock: Arc<dyn Clock>,
}

impl FeedClient {
    pub fn new(config: FeedConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            clock,
        }
    }

    /// Fetch the recent-incidents snapshot.
    ///
    /// Cards that fail to parse are skipped with a warning.
    pub async fn fetch_snapshot(&self) -> Result<Vec<Incident>, FeedError> {
        let mut url = self.endpoint(&self.config.snapshot_path)?;
        url.query_pairs_mut()
            .append_pair("minutes", &self.config.lookback_minutes.to_string());

        debug!(url = url.as_str(), "Fetching incident snapshot");
        let response = self
            .client
            .get(url.clone())
            .timeout(Duration::from_secs(self.config.request_timeout_secs))
            .send()
            .await
            .map_err(|e| FeedError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body: SnapshotResponse =
            response
                .json()
                .await
                .map_err(|e| FeedError::MalformedPayload {
                    event: "snapshot".into(),
                    message: e.to_string(),
                })?;

        let received_at = self.clock.now();
        let total = body.cards.len();
        let incidents: Vec<Incident> = body
            .cards
            .into_iter()
            .filter_map(|card| match Incident::from_value(card, received_at) {
                Ok(incident) => Some(incident),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed snapshot card");
                    None
                }
            })
            .collect();
        info!(cards = total, parsed = incidents.len(), "Snapshot fetched");
        Ok(incidents)
    }

    /// Stream live events into `tx` until the feed ends or faults.
    ///
    /// Returns `Ok(())` when the server closes the stream cleanly. Any fault
    /// ends the subscription; reconnecting is the caller's call.
    pub async fn subscribe(&self, tx: mpsc::Sender<FeedEvent>) -> Result<(), FeedError> {
        let url = self.endpoint(&self.config.stream_path)?;
        info!(url = url.as_str(), "Subscribing to incident stream");

        let response = self
            .client
            .get(url.clone())
            .header("accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| FeedError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut byte_stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk.map_err(|e| FeedError::Stream {
                message: e.to_string(),
            })?;
            for frame in decoder.push(&chunk) {
                self.forward(&frame, &tx).await?;
            }
        }
        if let Some(frame) = decoder.finish() {
            self.forward(&frame, &tx).await?;
        }

        info!("Incident stream closed by server");
        Ok(())
    }

    async fn forward(
        &self,
        frame: &SseFrame,
        tx: &mpsc::Sender<FeedEvent>,
    ) -> Result<(), FeedError> {
        let event = match FeedEvent::from_frame(frame, self.clock.now()) {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!(event = ?frame.event, "Ignoring unrecognised feed event");
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "Malformed feed payload; closing subscription");
                return Err(e);
            }
        };
        tx.send(event).await.map_err(|_| FeedError::ConsumerClosed)
    }

    fn endpoint(&self, path: &str) -> Result<Url, FeedError> {
        let invalid = |message: String| FeedError::InvalidUrl {
            url: format!("{}{}", self.config.base_url, path),
            message,
        };
        Url::parse(&self.config.base_url)
            .and_then(|base| base.join(path))
            .map_err(|e| invalid(e.to_string()))
    }
}
