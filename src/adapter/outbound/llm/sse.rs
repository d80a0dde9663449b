//! Server-sent event framing for streamed completions.
//!
//! The provider sends `data: {json}` lines separated by blank lines and
//! terminates the stream with `data: [DONE]`. Network chunks may split a
//! line (or a multi-byte character) anywhere, so bytes are buffered until a
//! full line is available.

use std::collections::BTreeMap;

use crate::port::outbound::llm::ToolCall;

/// Marker payload closing the stream.
pub const DONE: &str = "[DONE]";

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every complete `data:` payload.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
        payloads
    }

    /// Drain a trailing line that was never newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest);
        line.trim()
            .strip_prefix("data:")
            .map(|data| data.trim_start().to_string())
    }
}

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Assembles tool calls from streamed deltas keyed by their index.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<u32, PartialCall>,
}

impl ToolCallAccumulator {
    pub fn push(
        &mut self,
        index: u32,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) {
        let call = self.calls.entry(index).or_default();
        if let Some(id) = id {
            call.id.push_str(id);
        }
        if let Some(name) = name {
            call.name.push_str(name);
        }
        if let Some(arguments) = arguments {
            call.arguments.push_str(arguments);
        }
    }

    /// Completed calls in index order.
    pub fn drain(&mut self) -> Vec<ToolCall> {
        std::mem::take(&mut self.calls)
            .into_values()
            .filter(|call| !call.name.is_empty())
            .map(|call| ToolCall {
                id: call.id,
                name: call.name,
                arguments: call.arguments,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_joins_split_lines() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"a\"").is_empty());
        let payloads = decoder.feed(b":1}\n\ndata: [DONE]\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}".to_string(), DONE.to_string()]);
    }

    #[test]
    fn decoder_ignores_comments_and_crlf() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b": keep-alive\r\ndata: x\r\n\r\n");
        assert_eq!(payloads, vec!["x".to_string()]);
    }

    #[test]
    fn decoder_keeps_multibyte_characters_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: ✓\n".as_bytes();
        let (head, tail) = bytes.split_at(8);
        assert!(decoder.feed(head).is_empty());
        assert_eq!(decoder.feed(tail), vec!["✓".to_string()]);
    }

    #[test]
    fn decoder_finish_returns_unterminated_payload() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"data: [DONE]");
        assert_eq!(decoder.finish().as_deref(), Some(DONE));
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn accumulator_assembles_fragments_in_index_order() {
        let mut acc = ToolCallAccumulator::default();
        acc.push(1, Some("call_b"), Some("createForecast"), Some("{"));
        acc.push(0, Some("call_a"), Some("findOrCreateCategory"), Some("{\"name\""));
        acc.push(0, None, None, Some(":\"Economy\"}"));
        acc.push(1, None, None, Some("}"));

        let calls = acc.drain();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].arguments, "{\"name\":\"Economy\"}");
        assert_eq!(calls[1].name, "createForecast");
        assert!(acc.drain().is_empty());
    }
}
