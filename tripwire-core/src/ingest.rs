//! Drives triage state from the upstream feed.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::attention::{TriageEvent, TriageState};
use crate::config::AttentionConfig;
use crate::error::FeedError;
use crate::feed::FeedEvent;
use crate::incident::Incident;
use crate::store::IncidentStore;

/// Running totals for what has been ingested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub incidents: usize,
    pub enrichments: usize,
}

/// Adapter between feed events and the triage controller.
#[derive(Debug, Default)]
pub struct StreamIngestor {
    stats: IngestStats,
}

impl StreamIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the initial state from the snapshot fetch.
    ///
    /// A failed fetch is logged and the store simply starts empty.
    pub fn load_snapshot(
        &mut self,
        snapshot: Result<Vec<Incident>, FeedError>,
        settings: AttentionConfig,
    ) -> TriageState {
        let store = match snapshot {
            Ok(cards) => {
                self.stats.incidents += cards.len();
                let store = IncidentStore::from_snapshot(cards);
                info!(incidents = store.len(), "Loaded startup snapshot");
                store
            }
            Err(e) => {
                warn!(error = %e, "Snapshot unavailable; starting with an empty store");
                IncidentStore::new()
            }
        };
        TriageState::with_store(store, settings)
    }

    /// Apply one feed event.
    pub fn ingest(&mut self, state: &mut TriageState, event: FeedEvent) {
        state.apply(self.translate(event));
    }

    /// Drain `rx` into `state` until every sender is gone.
    pub async fn run(&mut self, state: &mut TriageState, rx: &mut mpsc::Receiver<FeedEvent>) {
        while let Some(event) = rx.recv().await {
            self.ingest(state, event);
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    fn translate(&mut self, event: FeedEvent) -> TriageEvent {
        match event {
            FeedEvent::Incident(incident) => {
                self.stats.incidents += 1;
                TriageEvent::Incident(incident)
            }
            FeedEvent::Enriched(update) => {
                self.stats.enrichments += 1;
                TriageEvent::Enriched {
                    incident_id: update.incident_id,
                    enrichment: update.enrichment,
                }
            }
        }
    }
}
