//! Incremental SSE parser
//!
//! Parses `text/event-stream` bodies arriving as arbitrary byte chunks into
//! complete `data:` payloads. Events are separated by blank lines; a single
//! event may carry multiple `data:` lines which are joined with newlines.
//!
//! Field handling:
//!
//! - `data:` -- collected and returned once the event is complete.
//! - `event: ping` / `data: [PING]` (case-insensitive) -- discarded.
//! - `id:` / `retry:` -- parsed and ignored; resumption is the caller's
//!   responsibility.
//! - Lines starting with `:` are SSE comments and are skipped.

/// Stateful parser accumulating bytes between event boundaries
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    /// Create an empty parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning any data payloads completed by it
    ///
    /// Invalid UTF-8 chunks are skipped; the stream position advances past
    /// them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = match std::str::from_utf8(chunk) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };

        self.buffer.push_str(text);

        let mut payloads = Vec::new();
        // SSE events are separated by blank lines (`\n\n`).
        while let Some(pos) = self.buffer.find("\n\n") {
            let event_block = self.buffer[..pos].to_string();
            self.buffer = self.buffer[pos + 2..].to_string();
            if let Some(data) = parse_event_block(&event_block) {
                payloads.push(data);
            }
        }

        payloads
    }

    /// Consume the parser, returning the payload of any trailing partial
    /// event
    pub fn finish(self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            parse_event_block(&self.buffer)
        }
    }
}

/// Parse a single event block (the text between two `\n\n` delimiters)
fn parse_event_block(event_block: &str) -> Option<String> {
    let mut data_lines: Vec<&str> = Vec::new();
    let mut event_type: Option<&str> = None;

    for line in event_block.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim());
        } else if let Some(value) = line.strip_prefix("event:") {
            event_type = Some(value.trim());
        }
        // `id:` and `retry:` are ignored.
    }

    if let Some(et) = event_type {
        if et.eq_ignore_ascii_case("ping") {
            return None;
        }
    }

    let data = data_lines.join("\n");
    if data.is_empty() || data.eq_ignore_ascii_case("[ping]") {
        return None;
    }

    Some(data)
}
