use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{GenerationDefaults, Settings};
use crate::error::LLMError;
use crate::factory::ProviderKind;
use crate::http::{DynHttpTransport, post_json_stream_with_headers, post_json_with_headers};
use crate::provider::{
    ChatAdapter, ChatStream, ensure_messages, ensure_stream_success, ensure_success, join_url,
    parse_json,
};
use crate::stream::{ParseFailureHook, create_stream};
use crate::types::{CapabilityDescriptor, CompletionRequest, CompletionResponse, ModelDescriptor};

use super::request::build_anthropic_body;
use super::response::{AnthropicResponse, map_response};
use super::stream::decode_line;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Fixed catalog returned by [`ClaudeAdapter::get_available_models`].
pub const CLAUDE_MODELS: &[&str] = &[
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
];

/// Claude adapter for the Anthropic Messages API.
///
/// Model listing is served from [`CLAUDE_MODELS`] without a network call.
pub struct ClaudeAdapter {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    defaults: GenerationDefaults,
    timeout: Duration,
    parse_failure_hook: Option<ParseFailureHook>,
}

impl ClaudeAdapter {
    pub fn new(
        transport: DynHttpTransport,
        api_key: impl Into<String>,
        defaults: GenerationDefaults,
    ) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            defaults,
            timeout: DEFAULT_TIMEOUT,
            parse_failure_hook: None,
        }
    }

    /// Builds the adapter from the `claude` section of the settings.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] when no Claude API key is configured.
    pub fn from_settings(
        settings: &Settings,
        transport: DynHttpTransport,
    ) -> Result<Self, LLMError> {
        let kind = ProviderKind::Claude;
        let api_key = settings.require_api_key(kind)?;
        let mut adapter = Self::new(transport, api_key, settings.defaults_for(kind))
            .with_timeout(settings.timeout()?);
        if let Some(base_url) = &settings.provider(kind).base_url {
            adapter = adapter.with_base_url(base_url);
        }
        Ok(adapter)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Observes stream lines that are dropped because they fail to parse.
    pub fn with_parse_failure_hook(mut self, hook: ParseFailureHook) -> Self {
        self.parse_failure_hook = Some(hook);
        self
    }

    fn endpoint(&self) -> String {
        join_url(&self.base_url, "messages")
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            ("x-api-key".to_string(), self.api_key.clone()),
            (
                "anthropic-version".to_string(),
                ANTHROPIC_VERSION.to_string(),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ])
    }

    fn build_body(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<(String, serde_json::Value), LLMError> {
        ensure_messages(request)?;
        let model = self.defaults.model(request.options.model.as_deref());
        let body = build_anthropic_body(request, &model, &self.defaults, stream);
        Ok((model, body))
    }
}

#[async_trait]
impl ChatAdapter for ClaudeAdapter {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        let (model, body) = self.build_body(&request, false)?;
        let endpoint = self.endpoint();
        tracing::debug!(provider = self.name(), %model, %endpoint, "sending completion request");

        let response = post_json_with_headers(
            &*self.transport,
            endpoint,
            self.build_headers(),
            &body,
            self.timeout,
        )
        .await?;
        let text = ensure_success(self.name(), response)?;
        let parsed: AnthropicResponse = parse_json(self.name(), &text)?;
        map_response(parsed, self.name())
    }

    async fn stream(&self, request: CompletionRequest) -> Result<ChatStream, LLMError> {
        let (model, body) = self.build_body(&request, true)?;
        let endpoint = self.endpoint();
        tracing::debug!(provider = self.name(), %model, %endpoint, "opening completion stream");

        let response = post_json_stream_with_headers(
            &*self.transport,
            endpoint,
            self.build_headers(),
            &body,
            self.timeout,
        )
        .await?;
        let body = ensure_stream_success(self.name(), response).await?;
        Ok(create_stream(
            body,
            self.name(),
            decode_line,
            self.parse_failure_hook.clone(),
        ))
    }

    async fn get_available_models(&self) -> Result<Vec<ModelDescriptor>, LLMError> {
        Ok(CLAUDE_MODELS.iter().map(|id| ModelDescriptor::new(*id)).collect())
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_stream: true,
            supports_live_model_listing: false,
        }
    }

    fn name(&self) -> &'static str {
        "Claude"
    }
}
