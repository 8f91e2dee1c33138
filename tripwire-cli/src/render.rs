//! Plain-text rendering of triage views.

use tripwire_core::{IncidentView, Mode, PauseCause, TriageState};

const CARD_WIDTH: usize = 78;

/// One-line summary of the controller: mode, why paused, and queue depth.
pub fn status_line(state: &TriageState) -> String {
    match state.mode() {
        Mode::Live => format!("LIVE | {} incidents", state.store().len()),
        Mode::Paused => {
            let causes: Vec<&str> = state
                .pause_causes()
                .into_iter()
                .map(|cause| match cause {
                    PauseCause::Toggle => "toggle",
                    PauseCause::Hover => "hover",
                    PauseCause::Inspect => "inspect",
                })
                .collect();
            format!(
                "PAUSED ({}) | {} incidents | {} pending",
                causes.join(", "),
                state.store().len(),
                state.pending().len()
            )
        }
    }
}

/// Compact list row.
pub fn row(view: &IncidentView) -> String {
    let mut line = format!(
        "{:<6} {} {}",
        view.severity.as_str().to_uppercase(),
        view.reference_time.format("%Y-%m-%d %H:%M"),
        view.title
    );
    if let Some(repo) = &view.repo_full_name {
        line.push_str(&format!(" [{repo}]"));
    }
    line.push_str(&format!(" ({})", view.incident_id));
    if view.enriched {
        line.push_str(" +osv");
    }
    line
}

/// Multi-line card for the live surface.
pub fn card(view: &IncidentView) -> String {
    let indent = textwrap::Options::new(CARD_WIDTH)
        .initial_indent("    ")
        .subsequent_indent("    ");
    let mut out = row(view);
    out.push('\n');
    out.push_str(&format!(
        "    {} / {} | actor {} | trajectory {}\n",
        view.scope, view.surface, view.actor.login, view.trajectory
    ));
    out.push_str(&textwrap::fill(&view.why_fired, &indent));
    if let Some(url) = &view.html_url {
        out.push('\n');
        out.push_str(&format!("    {url}"));
    }
    out
}

/// The attention window with its status header.
pub fn surface(state: &TriageState, views: &[IncidentView]) -> String {
    let mut out = status_line(state);
    if views.is_empty() {
        out.push_str("\n  (no incidents)");
    }
    for view in views {
        out.push_str("\n\n");
        out.push_str(&card(view));
    }
    out
}

/// Full list, one row per incident.
pub fn list(views: &[IncidentView]) -> String {
    if views.is_empty() {
        return "(no incidents)".to_string();
    }
    views.iter().map(row).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tripwire_core::{Incident, TriageEvent};

    fn view() -> IncidentView {
        let incident = Incident::new("g1", "ghostaction_risk", Utc::now())
            .with_title("Secrets sent to unknown host")
            .with_repo("octo/app")
            .with_created_at(Utc.with_ymd_and_hms(2025, 9, 14, 12, 0, 0).unwrap())
            .with_evidence("confidence", 0.9);
        IncidentView::from(&incident)
    }

    #[test]
    fn test_row_format() {
        assert_eq!(
            row(&view()),
            "HIGH   2025-09-14 12:00 Secrets sent to unknown host [octo/app] (g1)"
        );
    }

    #[test]
    fn test_card_wraps_explanation() {
        let rendered = card(&view());
        assert!(rendered.lines().count() >= 3);
        assert!(rendered.lines().all(|line| line.chars().count() <= CARD_WIDTH + 20));
    }

    #[test]
    fn test_status_line_lists_causes() {
        let mut state = TriageState::default();
        assert_eq!(status_line(&state), "LIVE | 0 incidents");

        state.apply(TriageEvent::TogglePause);
        state.apply(TriageEvent::Hover(true));
        assert_eq!(
            status_line(&state),
            "PAUSED (toggle, hover) | 0 incidents | 0 pending"
        );
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(list(&[]), "(no incidents)");
    }
}
