//! # Tripwire Core
//!
//! Incident triage engine for the Tripwire security feed.
//! Orders incidents by severity and recency, collapses duplicates,
//! holds arrivals while an operator is paused or inspecting, and
//! adapts the upstream snapshot/SSE feed into triage events.

pub mod attention;
pub mod clock;
pub mod config;
pub mod error;
pub mod explain;
pub mod feed;
pub mod filter;
pub mod incident;
pub mod ingest;
pub mod store;
pub mod view;

// Re-export commonly used types at the crate root.
pub use attention::{AttentionBuffer, Buffered, Mode, PauseCause, TriageEvent, TriageState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AttentionConfig, DisplayConfig, FeedConfig, TripwireConfig, load_config};
pub use error::{ConfigError, FeedError, TripwireError};
pub use explain::Trajectory;
pub use feed::{FeedClient, FeedEvent};
pub use filter::IncidentFilter;
pub use incident::{Actor, Incident, IncidentKind, IncidentSummary, Severity, classify};
pub use ingest::{IngestStats, StreamIngestor};
pub use store::IncidentStore;
pub use view::IncidentView;
