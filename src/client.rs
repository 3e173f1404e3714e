use std::collections::HashMap;

use crate::config::Settings;
use crate::error::LLMError;
use crate::factory::{ProviderKind, create_adapter};
use crate::http::DynHttpTransport;
use crate::provider::{ChatStream, DynAdapter};
use crate::types::{
    CapabilityDescriptor, ChatOutput, CompletionRequest, CompletionResponse, ModelDescriptor,
};

/// Registry of adapters addressed by handle.
///
/// Adapters are registered explicitly at start-up; nothing is discovered at runtime.
pub struct LLMClient {
    adapters: HashMap<String, DynAdapter>,
}

impl LLMClient {
    pub fn builder() -> LLMClientBuilder {
        LLMClientBuilder {
            adapters: HashMap::new(),
        }
    }

    /// Registers every provider that has an API key, under its provider id.
    ///
    /// # Errors
    ///
    /// Propagates [`LLMError::InvalidConfig`] from adapter construction.
    pub fn from_settings(
        settings: &Settings,
        transport: DynHttpTransport,
    ) -> Result<Self, LLMError> {
        let mut builder = Self::builder();
        for kind in ProviderKind::ALL {
            if settings.provider(kind).api_key.is_none() {
                continue;
            }
            let adapter = create_adapter(kind, settings, transport.clone())?;
            builder = builder.register_handle(kind.as_str(), adapter);
        }
        Ok(builder.build())
    }

    /// Dispatches on [`CompletionRequest::stream`].
    pub async fn chat_completion(
        &self,
        handle: &str,
        request: CompletionRequest,
    ) -> Result<ChatOutput, LLMError> {
        let adapter = self.get_adapter(handle)?;
        adapter.chat_completion(request).await
    }

    pub async fn complete(
        &self,
        handle: &str,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, LLMError> {
        let adapter = self.get_adapter(handle)?;
        adapter.complete(request).await
    }

    pub async fn stream(
        &self,
        handle: &str,
        request: CompletionRequest,
    ) -> Result<ChatStream, LLMError> {
        let adapter = self.get_adapter(handle)?;
        adapter.stream(request).await
    }

    pub async fn get_available_models(
        &self,
        handle: &str,
    ) -> Result<Vec<ModelDescriptor>, LLMError> {
        let adapter = self.get_adapter(handle)?;
        adapter.get_available_models().await
    }

    /// Registered handles, sorted.
    pub fn handles(&self) -> Vec<String> {
        let mut handles: Vec<String> = self.adapters.keys().cloned().collect();
        handles.sort();
        handles
    }

    pub fn capabilities(&self, handle: &str) -> Result<CapabilityDescriptor, LLMError> {
        let adapter = self.get_adapter(handle)?;
        Ok(adapter.capabilities())
    }

    /// Handles whose adapter queries the vendor for its model list.
    pub fn handles_supporting_live_listing(&self) -> Vec<String> {
        let mut handles: Vec<String> = self
            .adapters
            .iter()
            .filter_map(|(handle, adapter)| {
                if adapter.capabilities().supports_live_model_listing {
                    Some(handle.clone())
                } else {
                    None
                }
            })
            .collect();
        handles.sort();
        handles
    }

    fn get_adapter(&self, handle: &str) -> Result<DynAdapter, LLMError> {
        self.adapters
            .get(handle)
            .cloned()
            .ok_or_else(|| LLMError::Validation {
                message: format!("unknown model handle: {handle}"),
            })
    }
}

pub struct LLMClientBuilder {
    adapters: HashMap<String, DynAdapter>,
}

impl LLMClientBuilder {
    /// Registers an adapter; a repeated handle replaces the earlier one.
    pub fn register_handle<S: Into<String>>(mut self, handle: S, adapter: DynAdapter) -> Self {
        self.adapters.insert(handle.into(), adapter);
        self
    }

    pub fn build(self) -> LLMClient {
        LLMClient {
            adapters: self.adapters,
        }
    }
}
