use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::LLMError;
use crate::types::CompletionResponse;

#[derive(Debug, Deserialize)]
pub(crate) struct QwenResponse {
    #[serde(default)]
    pub(crate) output: Option<QwenOutput>,
    #[serde(default)]
    usage: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QwenOutput {
    #[serde(default)]
    pub(crate) choices: Vec<QwenChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QwenChoice {
    #[serde(default)]
    pub(crate) message: Option<QwenMessage>,
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QwenMessage {
    #[serde(default)]
    pub(crate) content: Option<String>,
}

impl QwenChoice {
    pub(crate) fn content(&self) -> Option<String> {
        self.message
            .as_ref()
            .and_then(|message| message.content.clone())
    }

    /// DashScope reports an unfinished choice as the literal string `"null"`.
    pub(crate) fn finish_reason(&self) -> Option<String> {
        self.finish_reason
            .clone()
            .filter(|reason| !reason.is_empty() && reason != "null")
    }
}

/// Remaps a DashScope body into a single-choice normalized response.
///
/// DashScope does not echo the model, so the requested one is reported.
pub(crate) fn map_response(
    resp: QwenResponse,
    provider: &'static str,
    model: String,
) -> Result<CompletionResponse, LLMError> {
    let choice = resp
        .output
        .and_then(|output| output.choices.into_iter().next())
        .ok_or_else(|| LLMError::provider(provider, "response contained no output.choices"))?;

    Ok(CompletionResponse::single(
        choice.content().unwrap_or_default(),
        choice.finish_reason(),
        resp.usage.unwrap_or_default(),
        model,
    ))
}
