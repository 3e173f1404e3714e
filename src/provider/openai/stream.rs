use crate::stream::LineOutcome;
use crate::types::StreamChunk;

const DATA_PREFIX: &str = "data: ";
const DONE_SENTINEL: &str = "[DONE]";

/// Decodes one line of an OpenAI-compatible stream.
///
/// Chunks already use the normalized shape, so the JSON payload is taken as-is.
pub fn decode_line(line: &str) -> LineOutcome {
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return LineOutcome::Skip;
    };
    let data = data.trim();
    if data == DONE_SENTINEL {
        return LineOutcome::Done;
    }
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => LineOutcome::Chunk(chunk),
        Err(err) => LineOutcome::Malformed(err.to_string()),
    }
}

/// Returns the normalized chunk carried by `line`, if any.
///
/// # Examples
///
/// ```
/// use multillm::provider::openai::parse_line;
///
/// let chunk = parse_line(r#"data: {"choices":[{"delta":{"content":"Hi"},"finish_reason":null}]}"#)
///     .expect("chunk");
/// assert_eq!(chunk.content(), Some("Hi"));
/// assert!(parse_line("data: [DONE]").is_none());
/// ```
pub fn parse_line(line: &str) -> Option<StreamChunk> {
    decode_line(line).into_chunk()
}
