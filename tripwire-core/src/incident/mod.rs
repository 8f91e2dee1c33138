//! Incident model, severity, ordering, and dedup identity.

pub mod dedup;
pub mod model;
pub mod ordering;
pub mod severity;

pub use dedup::{EcosystemKey, ecosystem_key, is_ecosystem_duplicate};
pub use model::{Actor, Incident, IncidentKind, IncidentSummary, parse_timestamp};
pub use ordering::{compare, sort_incidents};
pub use severity::{Severity, classify};
