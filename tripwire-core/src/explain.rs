//! Human-readable labels derived from incident fields.
//!
//! Everything here is pure and total: explicit fields from the pipeline win,
//! otherwise a label is derived from the kind, tags and evidence.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::incident::{Actor, Incident, IncidentKind};

const DEFAULT_TRAJECTORY_REASON: &str = "Insufficient trend data; defaulting to stable.";
const PACKAGE_TERMS: &[&str] = &["npm", "dependency", "dependencies", "pypi", "yarn", "pnpm"];

/// Why the detector fired, in one sentence.
pub fn why_fired(incident: &Incident) -> String {
    let explicit = non_empty(incident.why_this_fired.as_deref()).or_else(|| {
        incident
            .summary
            .as_ref()
            .and_then(|s| non_empty(s.why_this_fired.as_deref()))
    });
    if let Some(why) = explicit {
        return why.to_string();
    }

    match &incident.kind {
        IncidentKind::PersonalizedSecretExfiltration => {
            "Workflow change reuses secrets this repository already holds and posts data to an external endpoint.".into()
        }
        IncidentKind::EcosystemIncident => {
            match incident
                .evidence_field("affected_repos_count")
                .and_then(Value::as_u64)
            {
                Some(repos) => format!(
                    "npm authentication errors correlated across {repos} repositories in a short window."
                ),
                None => "npm authentication errors correlated across multiple repositories in a short window.".into(),
            }
        }
        IncidentKind::GhostactionRisk => {
            if has_external_domains(incident) {
                "Workflow change reads repository secrets and sends them to an external domain.".into()
            } else {
                "Workflow change matches GhostAction-style secret access patterns.".into()
            }
        }
        IncidentKind::WorkflowFailure => "A GitHub Actions check run concluded with a failure.".into(),
        IncidentKind::Other(_) => "A detection rule matched recent repository activity.".into(),
    }
}

/// Blast radius: `"ecosystem"` or `"repo"`.
pub fn scope(incident: &Incident) -> String {
    if let Some(scope) = non_empty(incident.scope.as_deref()) {
        return scope.to_string();
    }
    match incident.kind {
        IncidentKind::EcosystemIncident => "ecosystem".into(),
        _ => "repo".into(),
    }
}

/// What is at risk: credentials, dependencies, ops, or automation.
pub fn surface(incident: &Incident) -> String {
    if let Some(surface) = non_empty(incident.surface.as_deref()) {
        return surface.to_string();
    }

    let tag_blob = incident.tags().join(" ").to_lowercase();
    match incident.kind {
        IncidentKind::GhostactionRisk | IncidentKind::PersonalizedSecretExfiltration => {
            "credentials".into()
        }
        IncidentKind::EcosystemIncident => "dependencies".into(),
        _ if PACKAGE_TERMS.iter().any(|term| tag_blob.contains(term)) => "dependencies".into(),
        IncidentKind::WorkflowFailure => "ops".into(),
        _ => "automation".into(),
    }
}

/// Who triggered the incident, derived from evidence when not given.
pub fn actor(incident: &Incident) -> Actor {
    if let Some(actor) = &incident.actor {
        return actor.clone();
    }

    let login = incident
        .evidence_str("actor")
        .or_else(|| incident.evidence_str("actor_login"));
    let declared_type = incident
        .evidence_field("actor_context")
        .and_then(|ctx| ctx.get("type"))
        .and_then(Value::as_str)
        .map(str::to_lowercase);

    let is_bot = login.is_some_and(|l| l.to_lowercase().ends_with("[bot]"))
        || declared_type.as_deref() == Some("bot");
    let actor_type = match declared_type.as_deref() {
        Some(t @ ("user" | "bot" | "org")) => t.to_string(),
        _ => "unknown".to_string(),
    };

    Actor {
        login: login.unwrap_or("unknown").to_string(),
        actor_type,
        is_bot,
    }
}

/// Direction the risk is heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trajectory {
    Increasing,
    Stable,
    Recovering,
}

impl std::fmt::Display for Trajectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trajectory::Increasing => write!(f, "increasing"),
            Trajectory::Stable => write!(f, "stable"),
            Trajectory::Recovering => write!(f, "recovering"),
        }
    }
}

/// Risk trajectory and the reason given for it. Defaults to stable.
pub fn trajectory(incident: &Incident) -> (Trajectory, String) {
    let summary = incident.summary.as_ref();
    let label = non_empty(incident.risk_trajectory.as_deref())
        .or_else(|| summary.and_then(|s| non_empty(s.risk_trajectory.as_deref())));
    let parsed = match label.map(str::to_lowercase).as_deref() {
        Some("increasing") => Some(Trajectory::Increasing),
        Some("stable") => Some(Trajectory::Stable),
        Some("recovering") => Some(Trajectory::Recovering),
        _ => None,
    };

    let Some(trajectory) = parsed else {
        return (Trajectory::Stable, DEFAULT_TRAJECTORY_REASON.to_string());
    };
    let reason = non_empty(incident.risk_trajectory_reason.as_deref())
        .or_else(|| summary.and_then(|s| non_empty(s.risk_trajectory_reason.as_deref())))
        .unwrap_or(DEFAULT_TRAJECTORY_REASON);
    (trajectory, reason.to_string())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn has_external_domains(incident: &Incident) -> bool {
    match incident.evidence_field("external_domains") {
        Some(Value::Array(domains)) => !domains.is_empty(),
        Some(Value::String(domain)) => !domain.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::IncidentSummary;
    use chrono::Utc;
    use serde_json::json;

    fn incident(kind: &str) -> Incident {
        Incident::new("i", kind, Utc::now())
    }

    #[test]
    fn test_why_prefers_explicit_fields() {
        let mut inc = incident("workflow_failure");
        inc.why_this_fired = Some("Deploy job died on step 3".into());
        inc.summary = Some(IncidentSummary {
            why_this_fired: Some("from summary".into()),
            ..Default::default()
        });
        assert_eq!(why_fired(&inc), "Deploy job died on step 3");

        inc.why_this_fired = Some("   ".into());
        assert_eq!(why_fired(&inc), "from summary");
    }

    #[test]
    fn test_why_canned_per_kind() {
        assert!(why_fired(&incident("personalized_secret_exfiltration")).contains("secrets"));
        assert!(why_fired(&incident("workflow_failure")).contains("check run"));
        assert!(why_fired(&incident("something_new")).contains("detection rule"));

        let eco = incident("ecosystem_incident").with_evidence("affected_repos_count", 7);
        assert!(why_fired(&eco).contains("across 7 repositories"));
        assert!(why_fired(&incident("ecosystem_incident")).contains("multiple repositories"));
    }

    #[test]
    fn test_why_ghostaction_depends_on_domains() {
        let with_domains = incident("ghostaction_risk")
            .with_evidence("external_domains", json!(["exfil.example"]));
        let without = incident("ghostaction_risk").with_evidence("external_domains", json!([]));
        assert!(why_fired(&with_domains).contains("external domain"));
        assert!(why_fired(&without).contains("GhostAction"));
    }

    #[test]
    fn test_scope() {
        assert_eq!(scope(&incident("ecosystem_incident")), "ecosystem");
        assert_eq!(scope(&incident("ghostaction_risk")), "repo");
        assert_eq!(scope(&incident("brand_new_kind")), "repo");

        let mut explicit = incident("ecosystem_incident");
        explicit.scope = Some("org".into());
        assert_eq!(scope(&explicit), "org");
    }

    #[test]
    fn test_surface() {
        assert_eq!(surface(&incident("ghostaction_risk")), "credentials");
        assert_eq!(surface(&incident("personalized_secret_exfiltration")), "credentials");
        assert_eq!(surface(&incident("ecosystem_incident")), "dependencies");
        assert_eq!(surface(&incident("workflow_failure")), "ops");
        assert_eq!(
            surface(&incident("workflow_failure").with_tag("npm-install")),
            "dependencies"
        );
        assert_eq!(surface(&incident("unknown")), "automation");
        assert_eq!(
            surface(&incident("unknown").with_tag("Dependency-Review")),
            "dependencies"
        );

        let mut explicit = incident("workflow_failure");
        explicit.surface = Some("infra".into());
        assert_eq!(surface(&explicit), "infra");
    }

    #[test]
    fn test_actor_derivation() {
        let bot = incident("ghostaction_risk").with_evidence("actor", "dependabot[bot]");
        assert_eq!(
            actor(&bot),
            Actor {
                login: "dependabot[bot]".into(),
                actor_type: "unknown".into(),
                is_bot: true,
            }
        );

        let user = incident("ghostaction_risk")
            .with_evidence("actor_login", "mallory")
            .with_evidence("actor_context", json!({"type": "User"}));
        let derived = actor(&user);
        assert_eq!(derived.login, "mallory");
        assert_eq!(derived.actor_type, "user");
        assert!(!derived.is_bot);

        let typed_bot = incident("x").with_evidence("actor_context", json!({"type": "Bot"}));
        assert!(actor(&typed_bot).is_bot);

        let nobody = actor(&incident("x"));
        assert_eq!(nobody.login, "unknown");
        assert_eq!(nobody.actor_type, "unknown");
    }

    #[test]
    fn test_explicit_actor_wins() {
        let mut inc = incident("x").with_evidence("actor", "someone-else");
        inc.actor = Some(Actor {
            login: "octocat".into(),
            actor_type: "user".into(),
            is_bot: false,
        });
        assert_eq!(actor(&inc).login, "octocat");
    }

    #[test]
    fn test_trajectory() {
        let (traj, reason) = trajectory(&incident("x"));
        assert_eq!(traj, Trajectory::Stable);
        assert_eq!(reason, DEFAULT_TRAJECTORY_REASON);

        let mut inc = incident("x");
        inc.summary = Some(IncidentSummary {
            risk_trajectory: Some("Increasing".into()),
            risk_trajectory_reason: Some("Three failures in ten minutes".into()),
            ..Default::default()
        });
        assert_eq!(
            trajectory(&inc),
            (Trajectory::Increasing, "Three failures in ten minutes".to_string())
        );

        inc.risk_trajectory = Some("sideways".into());
        assert_eq!(trajectory(&inc).0, Trajectory::Stable);
    }
}
