//! End-to-end triage scenarios driven through the public controller API.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;

use tripwire_core::feed::replay_transcript;
use tripwire_core::{
    AttentionConfig, Incident, IncidentFilter, IncidentStore, ManualClock, Mode, PauseCause,
    Severity, StreamIngestor, TriageEvent, TriageState, classify,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 14, 12, 0, 0).unwrap()
}

fn scored(id: &str, confidence: f64, created: DateTime<Utc>) -> Incident {
    Incident::new(id, "workflow_failure", t0())
        .with_created_at(created)
        .with_evidence("confidence", confidence)
}

fn order(state: &TriageState) -> Vec<&str> {
    state
        .store()
        .incidents()
        .iter()
        .map(|i| i.incident_id.as_str())
        .collect()
}

#[test]
fn severity_outranks_recency() {
    let mut state = TriageState::default();
    state.apply(TriageEvent::Incident(scored("low", 0.1, t0())));
    state.apply(TriageEvent::Incident(scored("high", 0.9, t0())));
    state.apply(TriageEvent::Incident(scored(
        "medium",
        0.5,
        t0() + Duration::minutes(1),
    )));

    assert_eq!(order(&state), vec!["high", "medium", "low"]);
    let severities: Vec<Severity> = state.store().incidents().iter().map(classify).collect();
    assert_eq!(
        severities,
        vec![Severity::High, Severity::Medium, Severity::Low]
    );
}

#[test]
fn paused_arrivals_merge_in_order_on_resume() {
    let store = IncidentStore::from_snapshot(vec![scored("existing-low", 0.1, t0())]);
    let mut state = TriageState::with_store(store, AttentionConfig::default());

    state.apply(TriageEvent::Hover(true));
    assert_eq!(state.mode(), Mode::Paused);

    state.apply(TriageEvent::Incident(scored(
        "high",
        0.9,
        t0() + Duration::minutes(2),
    )));
    state.apply(TriageEvent::Incident(scored(
        "medium",
        0.5,
        t0() + Duration::minutes(1),
    )));
    assert_eq!(order(&state), vec!["existing-low"]);
    assert_eq!(state.pending().len(), 2);

    state.apply(TriageEvent::Hover(false));
    assert_eq!(state.mode(), Mode::Live);
    assert!(state.pending().is_empty());
    assert_eq!(order(&state), vec!["high", "medium", "existing-low"]);
}

#[test]
fn duplicate_ecosystem_reports_collapse() {
    let outage = |id: &str| {
        Incident::new(id, "ecosystem_incident", t0())
            .with_title("npm outage")
            .with_evidence("signature", "npm_auth_failures")
            .with_evidence("source", "registry")
    };

    let mut state = TriageState::default();
    state.apply(TriageEvent::Incident(outage("e1")));
    state.apply(TriageEvent::Incident(outage("e2")));

    assert_eq!(state.store().len(), 1);
    assert_eq!(order(&state), vec!["e1"]);
}

#[test]
fn overlapping_pause_causes_hold_until_all_clear() {
    let mut state = TriageState::default();
    state.apply(TriageEvent::TogglePause);
    state.apply(TriageEvent::Inspect("anything".into()));
    assert_eq!(
        state.pause_causes(),
        vec![PauseCause::Toggle, PauseCause::Inspect]
    );

    state.apply(TriageEvent::Incident(scored("queued", 0.5, t0())));
    state.apply(TriageEvent::TogglePause);
    assert!(state.is_paused());
    assert!(state.store().is_empty());

    state.apply(TriageEvent::CloseInspect);
    assert!(!state.is_paused());
    assert_eq!(order(&state), vec!["queued"]);
}

#[test]
fn enrichment_for_buffered_incident_survives_resume() {
    let mut state = TriageState::default();
    state.apply(TriageEvent::TogglePause);
    state.apply(TriageEvent::Incident(scored("w1", 0.5, t0())));
    state.apply(TriageEvent::Enriched {
        incident_id: "w1".into(),
        enrichment: serde_json::json!({"osv": {"status": "not_applicable"}}),
    });
    state.apply(TriageEvent::Resume);

    let incident = state.store().get("w1").unwrap();
    assert_eq!(
        incident.enrichment,
        Some(serde_json::json!({"osv": {"status": "not_applicable"}}))
    );
}

#[test]
fn enrichment_for_unknown_incident_changes_nothing() {
    let mut state = TriageState::default();
    state.apply(TriageEvent::Incident(scored("w1", 0.5, t0())));
    let before = state.store().incidents().to_vec();

    state.apply(TriageEvent::Enriched {
        incident_id: "missing".into(),
        enrichment: serde_json::json!({"osv": {}}),
    });
    assert_eq!(state.store().incidents(), before.as_slice());
}

const TRANSCRIPT: &str = r#"event: incident
data: {"incident_id":"w1","kind":"workflow_failure","title":"CI failed","repo_full_name":"octo/app","conclusion":"failure","created_at":"2025-09-14T12:00:00Z"}

event: incident
data: {"incident_id":"g1","kind":"ghostaction_risk","title":"Secrets sent to unknown host","evidence":{"confidence":0.92,"external_domains":["exfil.example"]},"created_at":"2025-09-14 11:58:00"}

event: incident
data: {"incident_id":"e1","kind":"ecosystem_incident","title":"npm outage","evidence":{"signature":"npm_auth_failures","source":"registry","confidence":"medium","affected_repos_count":4},"created_at":"2025-09-14T12:01:00Z"}

event: incident
data: {"incident_id":"e2","kind":"ecosystem_incident","title":"npm outage","evidence":{"signature":"npm_auth_failures","source":"registry","confidence":"medium"},"created_at":"2025-09-14T12:02:00Z"}

event: incident_enriched
data: {"incident_id":"w1","enrichment":{"osv":{"status":"not_applicable"}}}

"#;

#[test]
fn replayed_transcript_drives_live_surface() {
    let clock = ManualClock::new(t0() + Duration::minutes(5));
    let events = replay_transcript(TRANSCRIPT, &clock).unwrap();
    assert_eq!(events.len(), 5);

    let mut ingestor = StreamIngestor::new();
    let settings = AttentionConfig {
        window_size: 2,
        ..AttentionConfig::default()
    };
    let mut state = ingestor.load_snapshot(Ok(Vec::new()), settings);
    for event in events {
        ingestor.ingest(&mut state, event);
    }

    assert_eq!(order(&state), vec!["g1", "e1", "w1"]);

    let now = t0() + Duration::minutes(5);
    let surface = state.live_surface(&IncidentFilter::new(), now);
    let shown: Vec<&str> = surface.iter().map(|v| v.incident_id.as_str()).collect();
    assert_eq!(shown, vec!["g1", "e1"]);
    assert_eq!(surface[0].severity, Severity::High);

    let list = state.list_view(&IncidentFilter::new().min_severity(Severity::Medium), now);
    assert_eq!(list.len(), 2);

    let w1 = state
        .list_view(&IncidentFilter::new().query("octo/app"), now)
        .pop()
        .unwrap();
    assert!(w1.enriched);

    let raw = state.inspect_json("w1").unwrap();
    assert!(raw.contains("\"incident_id\": \"w1\""));
    assert!(state.inspect_json("e2").is_none());
}
