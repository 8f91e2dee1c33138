//! Incremental Server-Sent Events decoding.
//!
//! Bytes arrive in arbitrary chunks; a frame is complete at the first blank
//! line. Only the `event` and `data` fields matter here.

/// One dispatched SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// `event:` name, if the frame had one.
    pub event: Option<String>,
    /// All `data:` lines joined with `\n`.
    pub data: String,
}

/// Line-buffering SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        // Split on raw bytes so a UTF-8 sequence cut between chunks survives.
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&raw[..newline_pos]);
            if let Some(frame) = self.process_line(line.trim_end_matches('\r')) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a trailing frame the stream closed without terminating.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        let rest = rest.trim_end_matches('\r');
        if !rest.is_empty() {
            // A dangling final line cannot complete a frame on its own.
            let _ = self.process_line(rest);
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame { event, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"event: incident\ndata: {\"incident_id\":\"a\"}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("incident".into()),
                data: "{\"incident_id\":\"a\"}".into(),
            }]
        );
    }

    #[test]
    fn test_frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: incid").is_empty());
        assert!(decoder.push(b"ent\r\ndata: {\"a\":").is_empty());
        let frames = decoder.push(b"1}\r\n\r\nevent: incident_enriched\ndata: {}\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event.as_deref(), Some("incident"));
        assert_eq!(frames[0].data, "{\"a\":1}");
        assert_eq!(frames[1].event.as_deref(), Some("incident_enriched"));
    }

    #[test]
    fn test_comments_multiline_data_and_unnamed_frames() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keepalive\n\ndata:line one\ndata: line two\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: None,
                data: "line one\nline two".into(),
            }]
        );
    }

    #[test]
    fn test_event_without_data_is_not_dispatched() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"event: ping\n\ndata: x\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, None);
    }

    #[test]
    fn test_finish_flushes_unterminated_frame() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: incident\ndata: {}").is_empty());
        let frame = decoder.finish().unwrap();
        assert_eq!(frame.event.as_deref(), Some("incident"));
        assert_eq!(frame.data, "{}");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_multibyte_character_split_between_chunks() {
        let mut decoder = SseDecoder::new();
        let payload = "data: {\"title\":\"caf\u{e9}\"}\n\n".as_bytes();
        let split = payload.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(decoder.push(&payload[..split]).is_empty());
        let frames = decoder.push(&payload[split..]);
        assert_eq!(frames[0].data, "{\"title\":\"caf\u{e9}\"}");
    }
}
