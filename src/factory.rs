use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::provider::{ClaudeAdapter, DynAdapter, OpenAiAdapter, OpenRouterAdapter, QwenAdapter};

/// Closed set of supported vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Claude,
    Qwen,
    #[serde(rename = "openrouter")]
    OpenRouter,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Claude,
        ProviderKind::Qwen,
        ProviderKind::OpenRouter,
    ];

    /// Identifier used by the factory and as the default registry handle.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Claude => "claude",
            ProviderKind::Qwen => "qwen",
            ProviderKind::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LLMError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                LLMError::invalid_config(
                    "provider",
                    format!(
                        "unsupported provider `{value}`, expected one of: {}",
                        get_available_providers().join(", ")
                    ),
                )
            })
    }
}

/// Builds the adapter for `provider_id`.
///
/// Resolution happens before any network activity.
///
/// # Errors
///
/// Returns [`LLMError::InvalidConfig`] for an unknown provider or a missing API key.
pub fn create_client(
    provider_id: &str,
    settings: &Settings,
    transport: DynHttpTransport,
) -> Result<DynAdapter, LLMError> {
    let kind: ProviderKind = provider_id.parse()?;
    create_adapter(kind, settings, transport)
}

/// Typed variant of [`create_client`].
///
/// # Errors
///
/// Returns [`LLMError::InvalidConfig`] when the provider's API key is missing.
pub fn create_adapter(
    kind: ProviderKind,
    settings: &Settings,
    transport: DynHttpTransport,
) -> Result<DynAdapter, LLMError> {
    let adapter: DynAdapter = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiAdapter::from_settings(settings, transport)?),
        ProviderKind::Claude => Arc::new(ClaudeAdapter::from_settings(settings, transport)?),
        ProviderKind::Qwen => Arc::new(QwenAdapter::from_settings(settings, transport)?),
        ProviderKind::OpenRouter => {
            Arc::new(OpenRouterAdapter::from_settings(settings, transport)?)
        }
    };
    tracing::debug!(provider = kind.as_str(), "created adapter");
    Ok(adapter)
}

/// Identifiers accepted by [`create_client`].
pub fn get_available_providers() -> Vec<&'static str> {
    ProviderKind::ALL.iter().map(ProviderKind::as_str).collect()
}
