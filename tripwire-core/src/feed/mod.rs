//! Upstream feed adapter: SSE decoding, event typing, HTTP client, replay.

pub mod client;
pub mod event;
pub mod replay;
pub mod sse;

pub use client::FeedClient;
pub use event::{ENRICHED_EVENT, EnrichmentUpdate, FeedEvent, INCIDENT_EVENT};
pub use replay::{load_transcript, replay_transcript};
pub use sse::{SseDecoder, SseFrame};
