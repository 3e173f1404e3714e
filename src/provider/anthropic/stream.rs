use serde::Deserialize;

use crate::stream::LineOutcome;
use crate::types::StreamChunk;

const DATA_PREFIX: &str = "data: ";

#[derive(Debug, Deserialize)]
struct AnthropicStreamEvent {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    delta: Option<AnthropicStreamDelta>,
}

#[derive(Debug, Deserialize)]
struct AnthropicStreamDelta {
    #[serde(default)]
    text: Option<String>,
}

/// Decodes one line of a Messages API event stream.
///
/// Only `content_block_delta` text and `message_stop` produce chunks; the
/// other event types (`message_start`, `ping`, ...) are skipped.
pub fn decode_line(line: &str) -> LineOutcome {
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return LineOutcome::Skip;
    };
    let event: AnthropicStreamEvent = match serde_json::from_str(data.trim()) {
        Ok(event) => event,
        Err(err) => return LineOutcome::Malformed(err.to_string()),
    };

    match event.kind.as_str() {
        "content_block_delta" => match event.delta.and_then(|delta| delta.text) {
            Some(text) => LineOutcome::Chunk(StreamChunk::delta(Some(text), None)),
            // input_json_delta and thinking deltas carry no text
            None => LineOutcome::Skip,
        },
        "message_stop" => LineOutcome::Chunk(StreamChunk::delta(None, Some("stop".to_string()))),
        _ => LineOutcome::Skip,
    }
}

/// Returns the normalized chunk carried by `line`, if any.
pub fn parse_line(line: &str) -> Option<StreamChunk> {
    decode_line(line).into_chunk()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_delta_becomes_content() {
        let chunk = parse_line(
            r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
        )
        .expect("chunk");
        assert_eq!(chunk.content(), Some("Hi"));
        assert!(!chunk.is_terminal());
    }

    #[test]
    fn message_stop_is_terminal() {
        let chunk = parse_line(r#"data: {"type":"message_stop"}"#).expect("chunk");
        assert_eq!(chunk.finish_reason(), Some("stop"));
        assert_eq!(chunk.content(), None);
    }

    #[test]
    fn other_events_and_lines_are_ignored() {
        assert!(parse_line(r#"data: {"type":"message_start","message":{}}"#).is_none());
        assert!(parse_line(r#"data: {"type":"ping"}"#).is_none());
        assert!(parse_line("event: content_block_delta").is_none());
        assert!(parse_line(
            r#"data: {"type":"content_block_delta","delta":{"type":"input_json_delta","partial_json":"{"}}"#
        )
        .is_none());
        assert!(matches!(decode_line("data: {oops"), LineOutcome::Malformed(_)));
    }
}
