//! The incident record as delivered by the detection pipeline.
//!
//! Every field except `incident_id` is optional on the wire. Fields that fail
//! to parse are treated as absent rather than rejecting the whole payload, so
//! a sloppy detector can never stall ingestion.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Incident kind. Unknown kinds are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IncidentKind {
    GhostactionRisk,
    EcosystemIncident,
    WorkflowFailure,
    PersonalizedSecretExfiltration,
    Other(String),
}

impl IncidentKind {
    pub fn as_str(&self) -> &str {
        match self {
            IncidentKind::GhostactionRisk => "ghostaction_risk",
            IncidentKind::EcosystemIncident => "ecosystem_incident",
            IncidentKind::WorkflowFailure => "workflow_failure",
            IncidentKind::PersonalizedSecretExfiltration => "personalized_secret_exfiltration",
            IncidentKind::Other(kind) => kind,
        }
    }

    /// True when the payload carried no kind at all.
    pub fn is_unspecified(&self) -> bool {
        matches!(self, IncidentKind::Other(kind) if kind.is_empty())
    }
}

impl Default for IncidentKind {
    fn default() -> Self {
        IncidentKind::Other(String::new())
    }
}

impl From<String> for IncidentKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ghostaction_risk" => IncidentKind::GhostactionRisk,
            "ecosystem_incident" => IncidentKind::EcosystemIncident,
            "workflow_failure" => IncidentKind::WorkflowFailure,
            "personalized_secret_exfiltration" => IncidentKind::PersonalizedSecretExfiltration,
            _ => IncidentKind::Other(value),
        }
    }
}

impl From<&str> for IncidentKind {
    fn from(value: &str) -> Self {
        IncidentKind::from(value.to_string())
    }
}

impl From<IncidentKind> for String {
    fn from(kind: IncidentKind) -> Self {
        match kind {
            IncidentKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured findings attached by the summarizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentSummary {
    #[serde(default)]
    pub root_cause: Vec<String>,
    #[serde(default)]
    pub impact: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why_this_fired: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_trajectory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_trajectory_reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Who triggered the incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub login: String,
    #[serde(rename = "type")]
    pub actor_type: String,
    pub is_bot: bool,
}

/// A single detected risk event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Stable primary key.
    pub incident_id: String,
    #[serde(default, deserialize_with = "lenient_kind")]
    pub kind: IncidentKind,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub repo_full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub run_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub run_number: Option<i64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub inserted_at: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub evidence: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub summary: Option<IncidentSummary>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub why_this_fired: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub risk_trajectory: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub risk_trajectory_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub surface: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub actor: Option<Actor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Value>,
    /// Keys this build does not know about, kept for the inspection panel.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Local receipt instant; the last-resort reference time.
    #[serde(skip, default = "Utc::now")]
    received_at: DateTime<Utc>,
}

impl Incident {
    /// Create a bare incident received at `received_at`.
    pub fn new(
        incident_id: impl Into<String>,
        kind: impl Into<IncidentKind>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            incident_id: incident_id.into(),
            kind: kind.into(),
            repo_full_name: None,
            title: None,
            workflow_name: None,
            status: None,
            conclusion: None,
            html_url: None,
            run_id: None,
            run_number: None,
            created_at: None,
            updated_at: None,
            inserted_at: None,
            tags: None,
            evidence: None,
            summary: None,
            why_this_fired: None,
            risk_trajectory: None,
            risk_trajectory_reason: None,
            scope: None,
            surface: None,
            actor: None,
            enrichment: None,
            extra: Map::new(),
            received_at,
        }
    }

    /// Parse a wire payload, stamping it with the receipt instant.
    pub fn from_value(value: Value, received_at: DateTime<Utc>) -> Result<Self, serde_json::Error> {
        let incident: Incident = serde_json::from_value(value)?;
        Ok(incident.received_at(received_at))
    }

    /// Override the receipt instant.
    pub fn received_at(mut self, at: DateTime<Utc>) -> Self {
        self.received_at = at;
        self
    }

    pub fn receipt_time(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_repo(mut self, repo_full_name: impl Into<String>) -> Self {
        self.repo_full_name = Some(repo_full_name.into());
        self
    }

    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at.to_rfc3339());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_conclusion(mut self, conclusion: impl Into<String>) -> Self {
        self.conclusion = Some(conclusion.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.get_or_insert_with(Vec::new).push(tag.into());
        self
    }

    pub fn with_evidence(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.evidence
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_summary(mut self, summary: IncidentSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }

    pub fn evidence_field(&self, key: &str) -> Option<&Value> {
        self.evidence.as_ref().and_then(|e| e.get(key))
    }

    pub fn evidence_str(&self, key: &str) -> Option<&str> {
        self.evidence_field(key).and_then(Value::as_str)
    }

    /// The instant used for recency ordering.
    ///
    /// `created_at`, then `updated_at`, then `inserted_at`, then receipt time.
    /// Deterministic for a given record: the receipt fallback was fixed when
    /// the payload was first stamped.
    pub fn reference_time(&self) -> DateTime<Utc> {
        [&self.created_at, &self.updated_at, &self.inserted_at]
            .into_iter()
            .filter_map(|raw| raw.as_deref().and_then(parse_timestamp))
            .next()
            .unwrap_or(self.received_at)
    }

    /// Overlay every field `update` carries onto `self`.
    ///
    /// Absent fields leave the current value alone; the first receipt time
    /// is kept.
    pub fn merge_from(&mut self, update: Incident) {
        fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        if !update.kind.is_unspecified() {
            self.kind = update.kind;
        }
        overlay(&mut self.repo_full_name, update.repo_full_name);
        overlay(&mut self.title, update.title);
        overlay(&mut self.workflow_name, update.workflow_name);
        overlay(&mut self.status, update.status);
        overlay(&mut self.conclusion, update.conclusion);
        overlay(&mut self.html_url, update.html_url);
        overlay(&mut self.run_id, update.run_id);
        overlay(&mut self.run_number, update.run_number);
        overlay(&mut self.created_at, update.created_at);
        overlay(&mut self.updated_at, update.updated_at);
        overlay(&mut self.inserted_at, update.inserted_at);
        overlay(&mut self.tags, update.tags);
        overlay(&mut self.evidence, update.evidence);
        overlay(&mut self.summary, update.summary);
        overlay(&mut self.why_this_fired, update.why_this_fired);
        overlay(&mut self.risk_trajectory, update.risk_trajectory);
        overlay(&mut self.risk_trajectory_reason, update.risk_trajectory_reason);
        overlay(&mut self.scope, update.scope);
        overlay(&mut self.surface, update.surface);
        overlay(&mut self.actor, update.actor);
        overlay(&mut self.enrichment, update.enrichment);
        self.extra.extend(update.extra);
    }

    /// Attach (or replace) the enrichment payload. Touches nothing else.
    pub fn attach_enrichment(&mut self, enrichment: Value) {
        self.enrichment = Some(enrichment);
    }
}

/// Parse a pipeline timestamp. RFC 3339 or naive `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<IncidentKind, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient::<D, String>(deserializer)?
        .map(IncidentKind::from)
        .unwrap_or_default())
}
