/// One dispatched Server-Sent Event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

// Longer lines are dropped whole instead of buffered.
const MAX_LINE_BYTES: usize = 1 << 20;

/// Incremental `text/event-stream` decoder. Chunks may split lines, or
/// multi-byte characters, anywhere. Lines end at `\n`, `\r` or `\r\n`.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    after_cr: bool,
    discarding: bool,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for &byte in chunk {
            if std::mem::take(&mut self.after_cr) && byte == b'\n' {
                continue;
            }
            match byte {
                b'\n' | b'\r' => {
                    self.after_cr = byte == b'\r';
                    let raw = std::mem::take(&mut self.buffer);
                    if std::mem::take(&mut self.discarding) {
                        continue;
                    }
                    let line = String::from_utf8_lossy(&raw);
                    if let Some(event) = self.process_line(&line) {
                        events.push(event);
                    }
                }
                _ if self.discarding => {}
                _ if self.buffer.len() >= MAX_LINE_BYTES => {
                    log::warn!("Dropping event stream line longer than {} bytes", MAX_LINE_BYTES);
                    self.buffer = Vec::new();
                    self.discarding = true;
                }
                _ => self.buffer.push(byte),
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
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
            "id" => self.last_id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        Some(SseEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data: std::mem::take(&mut self.data).join("\n"),
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_event() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"event: position\ndata: {\"lon\": 1}\nid: 7\n\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: "position".into(),
                data: "{\"lon\": 1}".into(),
                id: Some("7".into()),
            }]
        );
    }

    #[test]
    fn joins_multiline_data_and_defaults_event_name() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"data: a\r\ndata: b\r\n\r\n");
        assert_eq!(events[0].event, "message");
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn handles_lines_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"event: posi").is_empty());
        assert!(decoder.push(b"tion\ndata: {\"n\":").is_empty());
        let events = decoder.push(b" \"\xC3\xA9\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "position");
        assert_eq!(events[0].data, "{\"n\": \"é\"}");
    }

    #[test]
    fn bare_carriage_returns_end_lines() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"event: position\rdata: a\rdata: b\r\r");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "position");
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn crlf_split_between_chunks_is_one_terminator() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: a\r").is_empty());
        // the \n completes the pair; only the next blank line dispatches
        assert!(decoder.push(b"\ndata: b\r").is_empty());
        let events = decoder.push(b"\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn oversized_line_is_dropped_without_buffering() {
        let mut decoder = SseDecoder::default();
        let mut chunk = b"data: ".to_vec();
        chunk.extend(std::iter::repeat(b'x').take(MAX_LINE_BYTES + 10));
        assert!(decoder.push(&chunk).is_empty());
        assert!(decoder.buffer.len() <= MAX_LINE_BYTES);

        let events = decoder.push(b"\ndata: ok\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "ok");
    }

    #[test]
    fn ignores_comments_and_empty_dispatches() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keepalive\n\nevent: position\n\n");
        assert!(events.is_empty());
        // event name without data is discarded, not carried over
        let events = decoder.push(b"data: x\n\n");
        assert_eq!(events[0].event, "message");
    }
}
