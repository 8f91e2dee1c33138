//! Offline replay of recorded SSE transcripts.

use std::path::Path;

use super::event::FeedEvent;
use super::sse::SseDecoder;
use crate::clock::Clock;
use crate::error::{FeedError, TripwireError};

/// Decode a whole transcript. Stops at the first malformed payload, like
/// the live subscription does.
pub fn replay_transcript(transcript: &str, clock: &dyn Clock) -> Result<Vec<FeedEvent>, FeedError> {
    let mut decoder = SseDecoder::new();
    let mut frames = decoder.push(transcript.as_bytes());
    frames.extend(decoder.finish());

    let mut events = Vec::with_capacity(frames.len());
    for frame in &frames {
        if let Some(event) = FeedEvent::from_frame(frame, clock.now())? {
            events.push(event);
        }
    }
    Ok(events)
}

/// Read and decode a transcript file.
pub fn load_transcript(path: &Path, clock: &dyn Clock) -> Result<Vec<FeedEvent>, TripwireError> {
    let transcript = std::fs::read_to_string(path)?;
    Ok(replay_transcript(&transcript, clock)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    const TRANSCRIPT: &str = "\
: recorded from staging
event: incident
data: {\"incident_id\":\"a\",\"kind\":\"workflow_failure\",\"title\":\"CI failed in octo/app\"}

event: heartbeat
data: {}

event: incident_enriched
data: {\"incident_id\":\"a\",\"enrichment\":{\"osv\":{\"status\":\"not_applicable\"}}}
";

    #[test]
    fn test_replay_transcript() {
        let clock = ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let events = replay_transcript(TRANSCRIPT, &clock).unwrap();
        assert_eq!(events.len(), 2);
        match &events[0] {
            FeedEvent::Incident(incident) => {
                assert_eq!(incident.receipt_time(), clock.now());
            }
            other => panic!("expected incident, got {other:?}"),
        }
        assert!(matches!(events[1], FeedEvent::Enriched(_)));
    }

    #[test]
    fn test_replay_stops_on_malformed_frame() {
        let clock = ManualClock::new(Utc::now());
        let transcript = "event: incident\ndata: {not json}\n\n";
        assert!(replay_transcript(transcript, &clock).is_err());
    }

    #[test]
    fn test_load_transcript_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staging.sse");
        std::fs::write(&path, TRANSCRIPT).unwrap();
        let clock = ManualClock::new(Utc::now());
        assert_eq!(load_transcript(&path, &clock).unwrap().len(), 2);

        let missing = load_transcript(&dir.path().join("nope.sse"), &clock);
        assert!(matches!(missing, Err(TripwireError::Io(_))));
    }
}
