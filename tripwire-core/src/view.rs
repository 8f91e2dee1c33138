//! Read-only projections consumed by the display layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::attention::TriageState;
use crate::explain::{self, Trajectory};
use crate::filter::IncidentFilter;
use crate::incident::{Actor, Incident, IncidentKind, Severity, classify};

/// One row / card worth of display data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentView {
    pub incident_id: String,
    pub kind: IncidentKind,
    pub title: String,
    pub repo_full_name: Option<String>,
    pub html_url: Option<String>,
    pub severity: Severity,
    pub reference_time: DateTime<Utc>,
    pub why_fired: String,
    pub scope: String,
    pub surface: String,
    pub actor: Actor,
    pub trajectory: Trajectory,
    pub trajectory_reason: String,
    pub enriched: bool,
}

impl From<&Incident> for IncidentView {
    fn from(incident: &Incident) -> Self {
        let (trajectory, trajectory_reason) = explain::trajectory(incident);
        Self {
            incident_id: incident.incident_id.clone(),
            kind: incident.kind.clone(),
            title: incident
                .title
                .clone()
                .unwrap_or_else(|| format!("Untitled {} incident", incident.kind)),
            repo_full_name: incident.repo_full_name.clone(),
            html_url: incident.html_url.clone(),
            severity: classify(incident),
            reference_time: incident.reference_time(),
            why_fired: explain::why_fired(incident),
            scope: explain::scope(incident),
            surface: explain::surface(incident),
            actor: explain::actor(incident),
            trajectory,
            trajectory_reason,
            enriched: incident.enrichment.is_some(),
        }
    }
}

impl TriageState {
    /// The attention window: the first N incidents passing `filter`.
    pub fn live_surface(&self, filter: &IncidentFilter, now: DateTime<Utc>) -> Vec<IncidentView> {
        self.filtered(filter, now)
            .take(self.settings().window_size)
            .map(IncidentView::from)
            .collect()
    }

    /// Every incident passing `filter`, in display order.
    pub fn list_view(&self, filter: &IncidentFilter, now: DateTime<Utc>) -> Vec<IncidentView> {
        self.filtered(filter, now).map(IncidentView::from).collect()
    }

    /// Raw incident JSON for the inspection panel.
    pub fn inspect_json(&self, incident_id: &str) -> Option<String> {
        self.store()
            .get(incident_id)
            .and_then(|incident| serde_json::to_string_pretty(incident).ok())
    }

    /// Incidents waiting behind the pause, as views.
    pub fn pending_views(&self) -> Vec<IncidentView> {
        self.pending().iter().map(IncidentView::from).collect()
    }

    fn filtered<'a>(
        &'a self,
        filter: &'a IncidentFilter,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a Incident> + 'a {
        self.store()
            .incidents()
            .iter()
            .filter(move |incident| filter.matches(incident, now))
    }
}
