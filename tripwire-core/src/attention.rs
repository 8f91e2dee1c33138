//! Attention gating: pause ingestion while an operator is looking, replay on resume.
//!
//! The surface is paused while any cause holds (explicit toggle, pointer
//! hover, an incident open for inspection). While paused, arrivals queue in
//! an [`AttentionBuffer`]; when the last cause clears the queue is merged into
//! the store in one step.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::AttentionConfig;
use crate::incident::{Incident, Severity, classify, is_ecosystem_duplicate};
use crate::store::IncidentStore;

/// Whether arrivals reach the store directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Live,
    Paused,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Live => write!(f, "live"),
            Mode::Paused => write!(f, "paused"),
        }
    }
}

/// Something currently holding the surface paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseCause {
    Toggle,
    Hover,
    Inspect,
}

/// Events processed, strictly in arrival order, by [`TriageState::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum TriageEvent {
    /// A full incident payload from the feed.
    Incident(Incident),
    /// Enrichment for an incident that may or may not be known yet.
    Enriched {
        incident_id: String,
        enrichment: Value,
    },
    /// Flip the explicit pause switch.
    TogglePause,
    /// Pointer entered (`true`) or left (`false`) the live surface.
    Hover(bool),
    /// Open an incident for inspection.
    Inspect(String),
    /// Close the inspection panel.
    CloseInspect,
    /// Clear every pause cause at once.
    Resume,
}

/// What happened to an incident offered to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Buffered {
    Queued,
    Merged,
    Dropped,
}

/// Incidents received while paused, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct AttentionBuffer {
    pending: Vec<Incident>,
}

impl AttentionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an incident.
    ///
    /// A pending incident with the same id absorbs the update, exactly as the
    /// store would; a repeated id is merged rather than dropped. An ecosystem
    /// incident whose merged record collides with a pending one under a
    /// different id is dropped and the queue is left untouched.
    pub fn offer(&mut self, incident: Incident) -> Buffered {
        let pos = self
            .pending
            .iter()
            .position(|p| p.incident_id == incident.incident_id);
        let candidate = match pos {
            Some(pos) => {
                let mut merged = self.pending[pos].clone();
                merged.merge_from(incident);
                merged
            }
            None => incident,
        };
        if self
            .pending
            .iter()
            .any(|p| is_ecosystem_duplicate(p, &candidate))
        {
            return Buffered::Dropped;
        }
        match pos {
            Some(pos) => {
                self.pending[pos] = candidate;
                Buffered::Merged
            }
            None => {
                self.pending.push(candidate);
                Buffered::Queued
            }
        }
    }

    /// Apply enrichment to a pending incident, if it is waiting here.
    pub fn apply_enrichment(&mut self, incident_id: &str, enrichment: Value) -> bool {
        match self.pending.iter_mut().find(|p| p.incident_id == incident_id) {
            Some(incident) => {
                incident.attach_enrichment(enrichment);
                true
            }
            None => false,
        }
    }

    pub fn pending(&self) -> &[Incident] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn take(&mut self) -> Vec<Incident> {
        std::mem::take(&mut self.pending)
    }
}

/// The whole triage controller state: store, pending queue, pause causes.
#[derive(Debug, Clone)]
pub struct TriageState {
    store: IncidentStore,
    buffer: AttentionBuffer,
    toggled: bool,
    hovering: bool,
    focused: Option<String>,
    settings: AttentionConfig,
}

impl TriageState {
    pub fn new(settings: AttentionConfig) -> Self {
        Self::with_store(IncidentStore::new(), settings)
    }

    /// Start from a pre-populated store (e.g. the startup snapshot).
    pub fn with_store(store: IncidentStore, settings: AttentionConfig) -> Self {
        Self {
            store,
            buffer: AttentionBuffer::new(),
            toggled: false,
            hovering: false,
            focused: None,
            settings,
        }
    }

    /// Pure transition: consume the state and an event, return the next state.
    pub fn reduce(mut self, event: TriageEvent) -> Self {
        self.apply(event);
        self
    }

    /// Process one event in place.
    pub fn apply(&mut self, event: TriageEvent) {
        match event {
            TriageEvent::Incident(incident) => self.admit(incident),
            TriageEvent::Enriched {
                incident_id,
                enrichment,
            } => self.enrich(&incident_id, enrichment),
            TriageEvent::TogglePause => self.update_causes(|s| s.toggled = !s.toggled),
            TriageEvent::Hover(hovering) => self.update_causes(|s| s.hovering = hovering),
            TriageEvent::Inspect(incident_id) => {
                self.update_causes(|s| s.focused = Some(incident_id))
            }
            TriageEvent::CloseInspect => self.update_causes(|s| s.focused = None),
            TriageEvent::Resume => self.update_causes(|s| {
                s.toggled = false;
                s.hovering = false;
                s.focused = None;
            }),
        }
    }

    pub fn mode(&self) -> Mode {
        if self.toggled || self.hovering || self.focused.is_some() {
            Mode::Paused
        } else {
            Mode::Live
        }
    }

    pub fn is_paused(&self) -> bool {
        self.mode() == Mode::Paused
    }

    pub fn pause_causes(&self) -> Vec<PauseCause> {
        let mut causes = Vec::new();
        if self.toggled {
            causes.push(PauseCause::Toggle);
        }
        if self.hovering {
            causes.push(PauseCause::Hover);
        }
        if self.focused.is_some() {
            causes.push(PauseCause::Inspect);
        }
        causes
    }

    pub fn store(&self) -> &IncidentStore {
        &self.store
    }

    pub fn pending(&self) -> &[Incident] {
        self.buffer.pending()
    }

    /// Id of the incident open for inspection, if any.
    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    pub fn settings(&self) -> &AttentionConfig {
        &self.settings
    }

    fn admit(&mut self, incident: Incident) {
        if self.is_paused() {
            let id = incident.incident_id.clone();
            let outcome = self.buffer.offer(incident);
            debug!(
                incident_id = %id,
                outcome = ?outcome,
                pending = self.buffer.len(),
                "Buffered incident while paused"
            );
            return;
        }

        // Severity of the record as it will be stored, not of the bare update.
        if self.settings.preempt_high
            && classify(&self.store.preview(&incident)) == Severity::High
        {
            self.store.preempt_to_front(incident);
        } else {
            self.store.upsert(incident);
        }
    }

    fn enrich(&mut self, incident_id: &str, enrichment: Value) {
        // A pending copy also gets it so the merge on resume does not lose it.
        let pending_hit = self.buffer.apply_enrichment(incident_id, enrichment.clone());
        let stored_hit = self.store.apply_enrichment(incident_id, enrichment);
        if !pending_hit && !stored_hit {
            debug!(incident_id, "Enrichment target not seen yet");
        }
    }

    fn update_causes(&mut self, change: impl FnOnce(&mut Self)) {
        let was_paused = self.is_paused();
        change(self);
        match (was_paused, self.is_paused()) {
            (false, true) => info!(causes = ?self.pause_causes(), "Live surface paused"),
            (true, false) => self.flush(),
            _ => {}
        }
    }

    fn flush(&mut self) {
        let pending = self.buffer.take();
        info!(pending = pending.len(), "Live surface resumed");
        self.store.merge_batch(pending);
    }
}

impl Default for TriageState {
    fn default() -> Self {
        Self::new(AttentionConfig::default())
    }
}
