//! Fan-out over OpenRouter models addressed by catalog alias.

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::future::join_all;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::Settings;
use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::provider::DynAdapter;
use crate::provider::openrouter::{ModelCatalog, OpenRouterAdapter};
use crate::types::{ChatMessage, ChatOptions, ChatOutput, CompletionRequest, ModelDescriptor};

/// Per-model result of [`MultiModelManager::compare_models`].
///
/// Serializes to `{"response", "usage", "model"}` or `{"error"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ComparisonOutcome {
    Success {
        response: String,
        usage: Map<String, Value>,
        model: String,
    },
    Error {
        error: String,
    },
}

impl ComparisonOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, ComparisonOutcome::Error { .. })
    }

    /// Response text of a successful call.
    pub fn response(&self) -> Option<&str> {
        match self {
            ComparisonOutcome::Success { response, .. } => Some(response),
            ComparisonOutcome::Error { .. } => None,
        }
    }
}

/// Progress of one model inside [`MultiModelManager::stream_multiple_models_with`].
#[derive(Debug)]
pub enum StreamProgress<'a> {
    Started { model: &'a str },
    Delta { model: &'a str, content: &'a str },
    Finished { model: &'a str, finish_reason: &'a str },
    Failed { model: &'a str, error: &'a LLMError },
}

/// Runs one conversation against several OpenRouter models.
///
/// All names go through a single adapter; aliases are resolved with the
/// [`ModelCatalog`] and anything else is sent as a literal model id.
pub struct MultiModelManager {
    adapter: DynAdapter,
    catalog: ModelCatalog,
}

impl MultiModelManager {
    /// Builds the manager around an OpenRouter adapter configured from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] when no OpenRouter API key is configured.
    pub fn new(settings: &Settings, transport: DynHttpTransport) -> Result<Self, LLMError> {
        let adapter = OpenRouterAdapter::from_settings(settings, transport)?;
        Ok(Self::with_adapter(Arc::new(adapter)))
    }

    /// Uses an already-built adapter, typically one pointed at a test server.
    pub fn with_adapter(adapter: DynAdapter) -> Self {
        Self {
            adapter,
            catalog: ModelCatalog::new(),
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn resolve_model<'a>(&self, model_name: &'a str) -> &'a str {
        self.catalog.resolve(model_name)
    }

    /// Sends the conversation to one model.
    ///
    /// # Errors
    ///
    /// Propagates the adapter error unchanged.
    pub async fn chat_with_model(
        &self,
        model_name: &str,
        messages: Vec<ChatMessage>,
        stream: bool,
        options: ChatOptions,
    ) -> Result<ChatOutput, LLMError> {
        let request = self.request_for(model_name, messages, stream, options);
        self.adapter.chat_completion(request).await
    }

    /// Calls every model concurrently and collects one outcome per requested name.
    ///
    /// Failures are recorded in place; this never returns an error. Keys keep
    /// the order of `model_names`.
    pub async fn compare_models<S: AsRef<str>>(
        &self,
        model_names: &[S],
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> IndexMap<String, ComparisonOutcome> {
        let futures = model_names.iter().map(|name| {
            let name = name.as_ref();
            let request = self.request_for(name, messages.to_vec(), false, options.clone());
            async move { (name, self.adapter.complete(request).await) }
        });

        let mut results = IndexMap::new();
        for (name, result) in join_all(futures).await {
            let outcome = match result {
                Ok(response) => match response.text().map(str::to_string) {
                    Some(text) => ComparisonOutcome::Success {
                        response: text,
                        model: if response.model.is_empty() {
                            name.to_string()
                        } else {
                            response.model
                        },
                        usage: response.usage,
                    },
                    None => ComparisonOutcome::Error {
                        error: format!("{}: response contained no choices", self.adapter.name()),
                    },
                },
                Err(err) => {
                    tracing::warn!(model = name, error = %err, "model comparison call failed");
                    ComparisonOutcome::Error {
                        error: err.to_string(),
                    }
                }
            };
            results.insert(name.to_string(), outcome);
        }
        results
    }

    /// Streams every model concurrently and returns each model's full text.
    ///
    /// A failed model yields `(name, None)` without affecting the others.
    pub async fn stream_multiple_models<S: AsRef<str>>(
        &self,
        model_names: &[S],
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Vec<(String, Option<String>)> {
        let silent = |_: StreamProgress<'_>| {};
        self.stream_multiple_models_with(model_names, messages, options, &silent)
            .await
    }

    /// Like [`Self::stream_multiple_models`], reporting progress as chunks arrive.
    ///
    /// Events of different models interleave in arrival order.
    pub async fn stream_multiple_models_with<S, F>(
        &self,
        model_names: &[S],
        messages: &[ChatMessage],
        options: &ChatOptions,
        observer: &F,
    ) -> Vec<(String, Option<String>)>
    where
        S: AsRef<str>,
        F: Fn(StreamProgress<'_>) + Sync,
    {
        let futures = model_names.iter().map(|name| {
            let name = name.as_ref();
            let request = self.request_for(name, messages.to_vec(), true, options.clone());
            async move {
                match self.collect_stream(name, request, observer).await {
                    Ok(content) => (name.to_string(), Some(content)),
                    Err(err) => {
                        tracing::warn!(model = name, error = %err, "model stream failed");
                        observer(StreamProgress::Failed {
                            model: name,
                            error: &err,
                        });
                        (name.to_string(), None)
                    }
                }
            }
        });
        join_all(futures).await
    }

    /// Lists live OpenRouter models whose id contains `provider`, ignoring case.
    ///
    /// # Errors
    ///
    /// Propagates the listing error.
    pub async fn get_available_models_by_provider(
        &self,
        provider: &str,
    ) -> Result<Vec<ModelDescriptor>, LLMError> {
        let needle = provider.to_lowercase();
        let models = self.adapter.get_available_models().await?;
        Ok(models
            .into_iter()
            .filter(|model| model.id.to_lowercase().contains(&needle))
            .collect())
    }

    fn request_for(
        &self,
        model_name: &str,
        messages: Vec<ChatMessage>,
        stream: bool,
        options: ChatOptions,
    ) -> CompletionRequest {
        let model = self.resolve_model(model_name).to_string();
        CompletionRequest::new(messages)
            .with_options(options.with_model(model))
            .streaming(stream)
    }

    async fn collect_stream<F>(
        &self,
        name: &str,
        request: CompletionRequest,
        observer: &F,
    ) -> Result<String, LLMError>
    where
        F: Fn(StreamProgress<'_>) + Sync,
    {
        let mut stream = self.adapter.stream(request).await?;
        observer(StreamProgress::Started { model: name });

        let mut content = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(text) = chunk.content() {
                observer(StreamProgress::Delta {
                    model: name,
                    content: text,
                });
                content.push_str(text);
            }
            if let Some(reason) = chunk.finish_reason() {
                observer(StreamProgress::Finished {
                    model: name,
                    finish_reason: reason,
                });
                break;
            }
        }
        Ok(content)
    }
}
