use crate::stream::LineOutcome;
use crate::types::StreamChunk;

use super::response::QwenResponse;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Decodes one line of a DashScope event stream.
///
/// The space after `data:` is optional. Events without `output.choices`
/// (errors, request metadata) are skipped.
pub fn decode_line(line: &str) -> LineOutcome {
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return LineOutcome::Skip;
    };
    let data = data.trim();
    if data == DONE_SENTINEL {
        return LineOutcome::Done;
    }
    let event: QwenResponse = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(err) => return LineOutcome::Malformed(err.to_string()),
    };

    match event
        .output
        .and_then(|output| output.choices.into_iter().next())
    {
        Some(choice) => LineOutcome::Chunk(StreamChunk::delta(
            choice.content(),
            choice.finish_reason(),
        )),
        None => LineOutcome::Skip,
    }
}

/// Returns the normalized chunk carried by `line`, if any.
pub fn parse_line(line: &str) -> Option<StreamChunk> {
    decode_line(line).into_chunk()
}
