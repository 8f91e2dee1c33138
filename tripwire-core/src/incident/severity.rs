//! Severity classification from heterogeneous detector output.
//!
//! Numeric confidence is the strongest signal, a confidence label the next,
//! and free-text conclusion/status/tags the loosest fallback.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::Incident;

/// Discrete urgency tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Sort rank: lower is more urgent.
    pub fn rank(self) -> u8 {
        match self {
            Severity::High => 0,
            Severity::Medium => 1,
            Severity::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// True when `self` is at least as urgent as `floor`.
    pub fn at_least(self, floor: Severity) -> bool {
        self.rank() <= floor.rank()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Classify an incident. Total: always returns a tier.
pub fn classify(incident: &Incident) -> Severity {
    match incident.evidence_field("confidence") {
        Some(Value::Number(n)) => {
            if let Some(score) = n.as_f64() {
                return from_score(score);
            }
        }
        Some(Value::String(label)) => {
            if let Some(severity) = from_label(label) {
                return severity;
            }
        }
        _ => {}
    }

    let mut blob = String::new();
    for part in [incident.conclusion.as_deref(), incident.status.as_deref()]
        .into_iter()
        .flatten()
        .chain(incident.tags().iter().map(String::as_str))
    {
        blob.push_str(part);
        blob.push(' ');
    }
    from_label(&blob).unwrap_or(Severity::Low)
}

fn from_score(score: f64) -> Severity {
    if score >= 0.8 {
        Severity::High
    } else if score >= 0.3 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn from_label(label: &str) -> Option<Severity> {
    let label = label.to_lowercase();
    if label.contains("high") || label.contains("critical") {
        Some(Severity::High)
    } else if label.contains("medium") {
        Some(Severity::Medium)
    } else {
        None
    }
}
