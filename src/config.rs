use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LLMError;
use crate::factory::ProviderKind;

const OPENROUTER_KEY_PREFIX: &str = "sk-or-v1-";

/// How an absent or zero-valued generation parameter is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamFallback {
    /// Only a missing value falls back to the configured default, so `0.0` is sent as-is.
    #[default]
    Presence,
    /// `0` and `0.0` are treated like a missing value.
    Falsy,
}

/// Credentials and defaults for one vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model used when a request does not name one.
    pub model: String,
    /// Overrides the vendor's public endpoint, e.g. for a proxy.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProviderSettings {
    fn with_model(model: &str) -> Self {
        Self {
            api_key: None,
            model: model.to_string(),
            base_url: None,
        }
    }
}

/// Explicit settings object shared by reference with every adapter.
///
/// Build it once at start-up, either from the environment with
/// [`Settings::from_env`] or by deserializing/constructing it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub openai: ProviderSettings,
    pub claude: ProviderSettings,
    pub qwen: ProviderSettings,
    pub openrouter: ProviderSettings,
    /// Default completion budget, `1..=8192`.
    pub max_tokens: u32,
    /// Default sampling temperature, `0.0..=2.0`.
    pub temperature: f64,
    /// Whole-operation timeout in seconds, at least `1.0`.
    pub timeout_secs: f64,
    /// Catalog aliases the demo driver compares by default.
    pub preferred_models: Vec<String>,
    pub param_fallback: ParamFallback,
    /// Sent to OpenRouter as `HTTP-Referer`.
    pub openrouter_referer: String,
    /// Sent to OpenRouter as `X-Title`.
    pub openrouter_title: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai: ProviderSettings::with_model("gpt-4.1-mini"),
            claude: ProviderSettings::with_model("claude-3-haiku-20240307"),
            qwen: ProviderSettings::with_model("qwen-plus"),
            openrouter: ProviderSettings::with_model("openai/gpt-4.1-mini"),
            max_tokens: 1000,
            temperature: 0.7,
            timeout_secs: 30.0,
            preferred_models: vec![
                "claude-4-sonnet".to_string(),
                "gpt-4.1-mini".to_string(),
                "qwen3-next-80b".to_string(),
                "gpt-oss".to_string(),
            ],
            param_fallback: ParamFallback::Presence,
            openrouter_referer: "http://localhost:3000".to_string(),
            openrouter_title: "Multi-LLM Client".to_string(),
        }
    }
}

impl Settings {
    /// Loads `.env` (if present) and reads settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] for unparsable or out-of-range values.
    pub fn from_env() -> Result<Self, LLMError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!(error = %err, "failed to read .env file"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup.
    ///
    /// Keys are upper-case (`OPENROUTER_API_KEY`, `MAX_TOKENS`, `CLAUDE_MODEL`, ...).
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] for unparsable or out-of-range values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LLMError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut settings = Settings::default();

        for kind in ProviderKind::ALL {
            let prefix = kind.as_str().to_ascii_uppercase();
            let provider = settings.provider_mut(kind);
            if let Some(key) = get(&format!("{prefix}_API_KEY")) {
                provider.api_key = Some(key.trim().to_string());
            }
            if let Some(model) = get(&format!("{prefix}_MODEL")) {
                provider.model = model.trim().to_string();
            }
            if let Some(base_url) = get(&format!("{prefix}_BASE_URL")) {
                provider.base_url = Some(base_url.trim().to_string());
            }
        }

        if let Some(value) = get("MAX_TOKENS") {
            settings.max_tokens = parse_field("max_tokens", &value)?;
        }
        if let Some(value) = get("TEMPERATURE") {
            settings.temperature = parse_field("temperature", &value)?;
        }
        if let Some(value) = get("TIMEOUT") {
            settings.timeout_secs = parse_field("timeout", &value)?;
        }
        if let Some(value) = get("PREFERRED_MODELS") {
            settings.preferred_models = parse_list(&value);
        }
        if let Some(value) = get("PARAM_FALLBACK") {
            settings.param_fallback = match value.trim().to_ascii_lowercase().as_str() {
                "presence" => ParamFallback::Presence,
                "falsy" => ParamFallback::Falsy,
                other => {
                    return Err(LLMError::invalid_config(
                        "param_fallback",
                        format!("expected `presence` or `falsy`, got `{other}`"),
                    ));
                }
            };
        }
        if let Some(value) = get("OPENROUTER_REFERER") {
            settings.openrouter_referer = value;
        }
        if let Some(value) = get("OPENROUTER_TITLE") {
            settings.openrouter_title = value;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Checks value ranges and key formats.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), LLMError> {
        if !(1..=8192).contains(&self.max_tokens) {
            return Err(LLMError::invalid_config(
                "max_tokens",
                format!("{} is outside 1..=8192", self.max_tokens),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LLMError::invalid_config(
                "temperature",
                format!("{} is outside 0.0..=2.0", self.temperature),
            ));
        }
        if !(self.timeout_secs >= 1.0 && self.timeout_secs.is_finite()) {
            return Err(LLMError::invalid_config(
                "timeout",
                format!("{} must be at least 1 second", self.timeout_secs),
            ));
        }
        if let Some(key) = &self.openrouter.api_key {
            if !key.starts_with(OPENROUTER_KEY_PREFIX) {
                return Err(LLMError::invalid_config(
                    "openrouter_api_key",
                    format!("OpenRouter API keys start with {OPENROUTER_KEY_PREFIX}"),
                ));
            }
        }
        Ok(())
    }

    pub fn provider(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Claude => &self.claude,
            ProviderKind::Qwen => &self.qwen,
            ProviderKind::OpenRouter => &self.openrouter,
        }
    }

    pub fn provider_mut(&mut self, kind: ProviderKind) -> &mut ProviderSettings {
        match kind {
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::Claude => &mut self.claude,
            ProviderKind::Qwen => &mut self.qwen,
            ProviderKind::OpenRouter => &mut self.openrouter,
        }
    }

    /// Sets the API key for one provider.
    pub fn with_api_key(mut self, kind: ProviderKind, key: impl Into<String>) -> Self {
        self.provider_mut(kind).api_key = Some(key.into());
        self
    }

    /// Returns the configured key or an [`LLMError::InvalidConfig`] naming it.
    pub fn require_api_key(&self, kind: ProviderKind) -> Result<&str, LLMError> {
        self.provider(kind)
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                LLMError::invalid_config(
                    format!("{}_api_key", kind.as_str()),
                    format!("an API key is required for provider {}", kind.as_str()),
                )
            })
    }

    /// Request timeout as a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] when `timeout_secs` is not a positive,
    /// representable number of seconds. Settings built without [`Self::validate`]
    /// are checked here.
    pub fn timeout(&self) -> Result<Duration, LLMError> {
        if self.timeout_secs.is_nan() || self.timeout_secs <= 0.0 {
            return Err(LLMError::invalid_config(
                "timeout",
                format!("{} must be a positive number of seconds", self.timeout_secs),
            ));
        }
        Duration::try_from_secs_f64(self.timeout_secs)
            .map_err(|err| LLMError::invalid_config("timeout", err.to_string()))
    }

    /// Generation defaults snapshot handed to an adapter at construction.
    pub fn defaults_for(&self, kind: ProviderKind) -> GenerationDefaults {
        GenerationDefaults {
            model: self.provider(kind).model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            fallback: self.param_fallback,
        }
    }
}

/// Read-only defaults an adapter merges into each request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationDefaults {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub fallback: ParamFallback,
}

impl GenerationDefaults {
    /// Requested model, or the default when absent or empty.
    pub fn model(&self, requested: Option<&str>) -> String {
        requested
            .filter(|model| !model.is_empty())
            .unwrap_or(&self.model)
            .to_string()
    }

    pub fn max_tokens(&self, requested: Option<u32>) -> u32 {
        match (requested, self.fallback) {
            (Some(0), ParamFallback::Falsy) | (None, _) => self.max_tokens,
            (Some(value), _) => value,
        }
    }

    pub fn temperature(&self, requested: Option<f64>) -> f64 {
        self.explicit_temperature(requested)
            .unwrap_or(self.temperature)
    }

    /// Temperature for vendors that only send it when the caller asked for one.
    ///
    /// `None` stays `None`; a supplied value is resolved like [`Self::temperature`].
    pub fn explicit_temperature(&self, requested: Option<f64>) -> Option<f64> {
        requested.map(|value| match self.fallback {
            ParamFallback::Falsy if value == 0.0 => self.temperature,
            _ => value,
        })
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, LLMError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err: T::Err| LLMError::invalid_config(field, format!("`{value}`: {err}")))
}

/// Accepts a JSON array (`["a","b"]`) or a comma-separated list.
fn parse_list(value: &str) -> Vec<String> {
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(value) {
        return items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect();
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
