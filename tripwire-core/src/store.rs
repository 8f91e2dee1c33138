//! The authoritative ordered, deduplicated incident working set.
//!
//! Outside of [`IncidentStore::preempt_to_front`] the sequence is always in
//! display order, `incident_id`s are unique, and there is at most one
//! ecosystem incident per `(signature, source, title)`.

use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::incident::{Incident, ecosystem_key, is_ecosystem_duplicate, sort_incidents};

/// Ordered incident collection. Nothing is ever evicted.
#[derive(Debug, Clone, Default)]
pub struct IncidentStore {
    incidents: Vec<Incident>,
}

impl IncidentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a startup snapshot, deduplicated and sorted.
    pub fn from_snapshot(cards: Vec<Incident>) -> Self {
        let mut store = Self::new();
        store.merge_batch(cards);
        store
    }

    /// Insert or overlay by `incident_id`, then re-sort.
    ///
    /// An ecosystem incident that collides with a stored one under a
    /// different id is dropped, not merged. The check runs on the merged
    /// record, so a partial update that would rename a stored incident onto
    /// another's key is dropped as well.
    pub fn upsert(&mut self, incident: Incident) -> &[Incident] {
        self.upsert_unsorted(incident);
        sort_incidents(&mut self.incidents);
        &self.incidents
    }

    /// Put `incident` at position 0 regardless of display order.
    ///
    /// Any stored record with the same id is folded into it first so earlier
    /// enrichment survives. The next re-sort moves it back to its rank.
    pub fn preempt_to_front(&mut self, incident: Incident) -> &[Incident] {
        let Some((pos, front)) = self.resolve(incident) else {
            return &self.incidents;
        };
        if let Some(pos) = pos {
            self.incidents.remove(pos);
        }
        debug!(incident_id = %front.incident_id, "Preempting display with incident");
        self.incidents.insert(0, front);
        &self.incidents
    }

    /// Upsert every incident in order, sweep ecosystem duplicates that
    /// arrived together, and re-sort once.
    pub fn merge_batch(&mut self, batch: impl IntoIterator<Item = Incident>) -> &[Incident] {
        for incident in batch {
            self.upsert_unsorted(incident);
        }

        let mut seen = HashSet::new();
        let before = self.incidents.len();
        self.incidents
            .retain(|inc| ecosystem_key(inc).is_none_or(|key| seen.insert(key)));
        if self.incidents.len() != before {
            debug!(
                removed = before - self.incidents.len(),
                "Swept duplicate ecosystem incidents from batch"
            );
        }

        sort_incidents(&mut self.incidents);
        &self.incidents
    }

    /// Attach enrichment to a known incident. Order is unaffected.
    ///
    /// Returns `false` (and changes nothing) when the id is unknown.
    pub fn apply_enrichment(&mut self, incident_id: &str, enrichment: Value) -> bool {
        match self.incidents.iter_mut().find(|i| i.incident_id == incident_id) {
            Some(incident) => {
                incident.attach_enrichment(enrichment);
                true
            }
            None => {
                debug!(incident_id, "Enrichment for unknown incident ignored");
                false
            }
        }
    }

    /// Current sequence in display order.
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    pub fn get(&self, incident_id: &str) -> Option<&Incident> {
        self.incidents.iter().find(|i| i.incident_id == incident_id)
    }

    pub fn contains(&self, incident_id: &str) -> bool {
        self.position(incident_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// Whether `incident` would be dropped as an ecosystem duplicate.
    pub fn collides(&self, incident: &Incident) -> bool {
        self.incidents
            .iter()
            .any(|existing| is_ecosystem_duplicate(existing, incident))
    }

    fn position(&self, incident_id: &str) -> Option<usize> {
        self.incidents
            .iter()
            .position(|i| i.incident_id == incident_id)
    }

    /// The record `incident` becomes once folded over any stored copy with
    /// the same id. The update itself is left unmerged.
    pub fn preview(&self, incident: &Incident) -> Incident {
        self.merged(self.position(&incident.incident_id), incident.clone())
    }

    fn merged(&self, pos: Option<usize>, incident: Incident) -> Incident {
        match pos {
            Some(pos) => {
                let mut merged = self.incidents[pos].clone();
                merged.merge_from(incident);
                merged
            }
            None => incident,
        }
    }

    /// Position of the stored copy and the merged record, or `None` when the
    /// merged record would duplicate an ecosystem incident stored under
    /// another id. The first-seen record wins and the update is dropped.
    fn resolve(&self, incident: Incident) -> Option<(Option<usize>, Incident)> {
        let pos = self.position(&incident.incident_id);
        let merged = self.merged(pos, incident);
        if self.collides(&merged) {
            debug!(incident_id = %merged.incident_id, "Dropping duplicate ecosystem incident");
            return None;
        }
        Some((pos, merged))
    }

    fn upsert_unsorted(&mut self, incident: Incident) {
        let Some((pos, merged)) = self.resolve(incident) else {
            return;
        };
        match pos {
            Some(pos) => {
                debug!(incident_id = %merged.incident_id, "Merging update into stored incident");
                self.incidents[pos] = merged;
            }
            None => {
                debug!(
                    incident_id = %merged.incident_id,
                    kind = %merged.kind,
                    "Storing new incident"
                );
                self.incidents.push(merged);
            }
        }
    }
}
