//! Predicates behind the list view. Filtering hides incidents; it never
//! removes them from the store.

use chrono::{DateTime, Duration, Utc};

use crate::explain;
use crate::incident::{Incident, IncidentKind, Severity, classify};

/// A conjunction of optional predicates. The default matches everything.
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    /// Only incidents whose reference time is within this window of `now`.
    pub window: Option<Duration>,
    /// Only these kinds (empty = any).
    pub kinds: Vec<IncidentKind>,
    /// Only incidents at least this severe.
    pub min_severity: Option<Severity>,
    pub scope: Option<String>,
    pub surface: Option<String>,
    /// Case-insensitive substring over title, repository and id.
    pub query: Option<String>,
}

impl IncidentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn within(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    pub fn kind(mut self, kind: impl Into<IncidentKind>) -> Self {
        self.kinds.push(kind.into());
        self
    }

    pub fn min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn surface(mut self, surface: impl Into<String>) -> Self {
        self.surface = Some(surface.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn matches(&self, incident: &Incident, now: DateTime<Utc>) -> bool {
        // A window reaching past the earliest representable time has no floor.
        if let Some(window) = self.window
            && let Some(floor) = now.checked_sub_signed(window)
            && incident.reference_time() < floor
        {
            return false;
        }
        if !self.kinds.is_empty() && !self.kinds.contains(&incident.kind) {
            return false;
        }
        if let Some(floor) = self.min_severity
            && !classify(incident).at_least(floor)
        {
            return false;
        }
        if let Some(scope) = &self.scope
            && !explain::scope(incident).eq_ignore_ascii_case(scope)
        {
            return false;
        }
        if let Some(surface) = &self.surface
            && !explain::surface(incident).eq_ignore_ascii_case(surface)
        {
            return false;
        }
        if let Some(query) = &self.query {
            let needle = query.to_lowercase();
            let haystack = [
                incident.title.as_deref(),
                incident.repo_full_name.as_deref(),
                Some(incident.incident_id.as_str()),
            ];
            if !haystack
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn inc(id: &str, kind: &str, minutes_ago: i64) -> Incident {
        Incident::new(id, kind, now()).with_created_at(now() - Duration::minutes(minutes_ago))
    }

    #[test]
    fn test_default_matches_everything() {
        assert!(IncidentFilter::new().matches(&inc("a", "x", 10_000), now()));
    }

    #[test]
    fn test_time_window_hides_stale() {
        let filter = IncidentFilter::new().within(Duration::minutes(60));
        assert!(filter.matches(&inc("fresh", "workflow_failure", 59), now()));
        assert!(!filter.matches(&inc("stale", "workflow_failure", 61), now()));
    }

    #[test]
    fn test_window_past_calendar_range_keeps_everything() {
        let filter = IncidentFilter::new().within(Duration::days(100_000_000));
        assert!(filter.matches(&inc("ancient", "workflow_failure", 5_000_000), now()));
    }

    #[test]
    fn test_kind_and_severity() {
        let filter = IncidentFilter::new()
            .kind("ghostaction_risk")
            .min_severity(Severity::Medium);
        let high = inc("a", "ghostaction_risk", 0).with_conclusion("high");
        let low = inc("b", "ghostaction_risk", 0).with_conclusion("low");
        let other = inc("c", "workflow_failure", 0).with_conclusion("critical");
        assert!(filter.matches(&high, now()));
        assert!(!filter.matches(&low, now()));
        assert!(!filter.matches(&other, now()));
    }

    #[test]
    fn test_scope_surface_and_query() {
        let eco = inc("e1", "ecosystem_incident", 0).with_title("Ecosystem incident: npm_auth_token_expired");
        let repo = inc("r1", "ghostaction_risk", 0).with_repo("Octo/Widgets");

        let by_scope = IncidentFilter::new().scope("ecosystem");
        assert!(by_scope.matches(&eco, now()));
        assert!(!by_scope.matches(&repo, now()));

        let by_surface = IncidentFilter::new().surface("Credentials");
        assert!(by_surface.matches(&repo, now()));
        assert!(!by_surface.matches(&eco, now()));

        assert!(IncidentFilter::new().query("octo/widgets").matches(&repo, now()));
        assert!(IncidentFilter::new().query("NPM_AUTH").matches(&eco, now()));
        assert!(IncidentFilter::new().query("e1").matches(&eco, now()));
        assert!(!IncidentFilter::new().query("pypi").matches(&eco, now()));
    }
}
