//! Vendor adapters behind one chat-completion contract.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use serde::de::DeserializeOwned;

use crate::error::{LLMError, status_error};
use crate::http::{HttpBodyStream, HttpResponse, HttpStreamResponse};
use crate::stream::collect_stream_text;
use crate::types::{
    CapabilityDescriptor, ChatOutput, CompletionRequest, CompletionResponse, ModelDescriptor,
    StreamChunk,
};

use self::retry::retry_after_from_headers;

pub mod anthropic;
pub mod openai;
pub mod openrouter;
pub mod qwen;
pub(crate) mod retry;

pub use anthropic::ClaudeAdapter;
pub use openai::OpenAiAdapter;
pub use openrouter::OpenRouterAdapter;
pub use qwen::QwenAdapter;

/// Lazy, finite sequence of normalized chunks produced by one HTTP round trip.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LLMError>> + Send>>;

/// Common contract every vendor adapter implements.
///
/// Adapters keep only read-only configuration and a shared transport, so a
/// single instance can serve concurrent calls.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Sends the conversation and waits for the full completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError>;

    /// Sends the conversation and yields incremental chunks.
    ///
    /// Re-invoking issues a fresh HTTP request; a returned stream cannot be restarted.
    async fn stream(&self, request: CompletionRequest) -> Result<ChatStream, LLMError>;

    /// Lists models, either live from the vendor or from a fixed catalog.
    ///
    /// See [`CapabilityDescriptor::supports_live_model_listing`].
    async fn get_available_models(&self) -> Result<Vec<ModelDescriptor>, LLMError>;

    fn capabilities(&self) -> CapabilityDescriptor;

    /// Provider label used in errors and logs, e.g. `"Claude"`.
    fn name(&self) -> &'static str;

    /// Dispatches on [`CompletionRequest::stream`].
    async fn chat_completion(&self, request: CompletionRequest) -> Result<ChatOutput, LLMError> {
        if request.stream {
            self.stream(request).await.map(ChatOutput::Stream)
        } else {
            self.complete(request).await.map(ChatOutput::Complete)
        }
    }
}

/// Thread-safe adapter handle.
pub type DynAdapter = Arc<dyn ChatAdapter>;

/// Rejects an empty conversation before any I/O happens.
pub(crate) fn ensure_messages(request: &CompletionRequest) -> Result<(), LLMError> {
    if request.messages.is_empty() {
        return Err(LLMError::Validation {
            message: "messages must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Returns the body text of a 2xx response, or the status-tagged error.
pub(crate) fn ensure_success(
    provider: &'static str,
    response: HttpResponse,
) -> Result<String, LLMError> {
    if response.is_success() {
        return response.into_string();
    }
    let status = response.status;
    let retry_after = retry_after_from_headers(&response.headers);
    let text = String::from_utf8_lossy(&response.body);
    tracing::warn!(provider, status, "vendor returned an error status");
    Err(status_error(provider, status, &text, retry_after))
}

/// Hands back the body of a 2xx streaming response; drains and maps it otherwise.
pub(crate) async fn ensure_stream_success(
    provider: &'static str,
    response: HttpStreamResponse,
) -> Result<HttpBodyStream, LLMError> {
    if (200..300).contains(&response.status) {
        return Ok(response.body);
    }
    let status = response.status;
    let retry_after = retry_after_from_headers(&response.headers);
    let text = collect_stream_text(response.body, provider).await?;
    tracing::warn!(provider, status, "vendor rejected stream request");
    Err(status_error(provider, status, &text, retry_after))
}

pub(crate) fn parse_json<T: DeserializeOwned>(
    provider: &'static str,
    text: &str,
) -> Result<T, LLMError> {
    serde_json::from_str(text).map_err(|err| LLMError::Provider {
        provider,
        message: format!("failed to parse response: {err}"),
    })
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
