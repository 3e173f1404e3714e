use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{GenerationDefaults, Settings};
use crate::error::LLMError;
use crate::factory::ProviderKind;
use crate::http::{
    DynHttpTransport, get_with_headers, post_json_stream_with_headers, post_json_with_headers,
};
use crate::provider::openai::request::build_openai_body;
use crate::provider::openai::response::map_model_list;
use crate::provider::openai::stream::decode_line;
use crate::provider::{
    ChatAdapter, ChatStream, ensure_messages, ensure_stream_success, ensure_success, join_url,
    parse_json,
};
use crate::stream::{ParseFailureHook, create_stream};
use crate::types::{CapabilityDescriptor, CompletionRequest, CompletionResponse, ModelDescriptor};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_REFERER: &str = "http://localhost:3000";
const DEFAULT_TITLE: &str = "Multi-LLM Client";

/// Sampling knobs OpenRouter forwards to the routed model.
const OPENROUTER_EXTRA_KEYS: &[&str] = &["top_p", "top_k", "repetition_penalty"];

/// OpenRouter adapter; speaks the OpenAI wire format with attribution headers.
pub struct OpenRouterAdapter {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    referer: String,
    title: String,
    defaults: GenerationDefaults,
    timeout: Duration,
    parse_failure_hook: Option<ParseFailureHook>,
}

impl OpenRouterAdapter {
    pub fn new(
        transport: DynHttpTransport,
        api_key: impl Into<String>,
        defaults: GenerationDefaults,
    ) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
            defaults,
            timeout: DEFAULT_TIMEOUT,
            parse_failure_hook: None,
        }
    }

    /// Builds the adapter from the `openrouter` section of the settings.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] when no OpenRouter API key is configured.
    pub fn from_settings(
        settings: &Settings,
        transport: DynHttpTransport,
    ) -> Result<Self, LLMError> {
        let kind = ProviderKind::OpenRouter;
        let api_key = settings.require_api_key(kind)?;
        let mut adapter = Self::new(transport, api_key, settings.defaults_for(kind))
            .with_timeout(settings.timeout()?)
            .with_attribution(&settings.openrouter_referer, &settings.openrouter_title);
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

    /// Sets the `HTTP-Referer` and `X-Title` headers OpenRouter uses for app attribution.
    pub fn with_attribution(
        mut self,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        self.referer = referer.into();
        self.title = title.into();
        self
    }

    /// Observes stream lines that are dropped because they fail to parse.
    pub fn with_parse_failure_hook(mut self, hook: ParseFailureHook) -> Self {
        self.parse_failure_hook = Some(hook);
        self
    }

    fn endpoint(&self) -> String {
        join_url(&self.base_url, "chat/completions")
    }

    fn models_endpoint(&self) -> String {
        join_url(&self.base_url, "models")
    }

    fn build_headers(&self) -> HashMap<String, String> {
        HashMap::from([
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.api_key),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("HTTP-Referer".to_string(), self.referer.clone()),
            ("X-Title".to_string(), self.title.clone()),
        ])
    }

    fn build_body(&self, request: &CompletionRequest, stream: bool) -> (String, serde_json::Value) {
        let model = self.defaults.model(request.options.model.as_deref());
        let body = build_openai_body(
            request,
            &model,
            &self.defaults,
            stream,
            OPENROUTER_EXTRA_KEYS,
        );
        (model, body)
    }
}

#[async_trait]
impl ChatAdapter for OpenRouterAdapter {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        ensure_messages(&request)?;
        let (model, body) = self.build_body(&request, false);
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
        parse_json(self.name(), &text)
    }

    async fn stream(&self, request: CompletionRequest) -> Result<ChatStream, LLMError> {
        ensure_messages(&request)?;
        let (model, body) = self.build_body(&request, true);
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
        let response = get_with_headers(
            &*self.transport,
            self.models_endpoint(),
            self.build_headers(),
            self.timeout,
        )
        .await?;
        let text = ensure_success(self.name(), response)?;
        map_model_list(self.name(), &text)
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            supports_stream: true,
            supports_live_model_listing: true,
        }
    }

    fn name(&self) -> &'static str {
        "OpenRouter"
    }
}
