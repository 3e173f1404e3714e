use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::LLMError;
use crate::types::CompletionResponse;

#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Map<String, Value>>,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Remaps a Messages API body into a single-choice normalized response.
pub(crate) fn map_response(
    resp: AnthropicResponse,
    provider: &'static str,
) -> Result<CompletionResponse, LLMError> {
    let text = resp
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| LLMError::provider(provider, "response contained no text block"))?;

    Ok(CompletionResponse::single(
        text,
        resp.stop_reason,
        resp.usage.unwrap_or_default(),
        resp.model,
    ))
}
