//! Duplicate detection for cross-repository ecosystem incidents.
//!
//! Correlation can mint a fresh `incident_id` for what is the same upstream
//! disruption, so ecosystem incidents are also keyed by what they describe.

use super::model::{Incident, IncidentKind};

/// `(signature, source, title)` identity of an ecosystem incident.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EcosystemKey {
    pub signature: String,
    pub source: String,
    pub title: String,
}

/// Derive the ecosystem key. `None` for every other kind.
///
/// Missing parts collapse to the empty string.
pub fn ecosystem_key(incident: &Incident) -> Option<EcosystemKey> {
    if incident.kind != IncidentKind::EcosystemIncident {
        return None;
    }
    let signature = incident
        .evidence_str("signature")
        .or_else(|| incident.evidence_str("plugin"))
        .unwrap_or_default();
    Some(EcosystemKey {
        signature: signature.to_string(),
        source: incident.evidence_str("source").unwrap_or_default().to_string(),
        title: incident.title.clone().unwrap_or_default(),
    })
}

/// Two different incidents describing the same ecosystem event.
pub fn is_ecosystem_duplicate(a: &Incident, b: &Incident) -> bool {
    a.incident_id != b.incident_id
        && match (ecosystem_key(a), ecosystem_key(b)) {
            (Some(ka), Some(kb)) => ka == kb,
            _ => false,
        }
}
