//! Normalized chat types shared by every vendor adapter.
//!
//! The shapes follow the OpenAI chat-completions format, which serves as the
//! lingua franca: OpenAI-compatible vendors are passed through, the others are
//! remapped into these structures.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::provider::ChatStream;

/// Chat role understood by every vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of the conversation.
///
/// # Examples
///
/// ```
/// use multillm::types::{ChatMessage, Role};
///
/// let msg = ChatMessage::user("Summarize Rust traits.");
/// assert_eq!(msg.role, Role::User);
/// assert_eq!(
///     serde_json::to_string(&msg).unwrap(),
///     r#"{"role":"user","content":"Summarize Rust traits."}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// Vendor message fields such as `refusal` or `reasoning`; never sent upstream.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            extra: Map::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Per-call generation overrides.
///
/// Absent values fall back to the adapter's configured defaults according to
/// [`crate::config::ParamFallback`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Vendor model identifier; the adapter default is used when absent or empty.
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    /// Vendor-specific knobs such as `top_p`, `top_k` or `repetition_penalty`.
    ///
    /// Each adapter forwards only the keys its vendor accepts.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl ChatOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Normalized chat-completion request.
///
/// # Examples
///
/// ```
/// use multillm::types::{ChatMessage, ChatOptions, CompletionRequest};
///
/// let request = CompletionRequest::new(vec![
///     ChatMessage::system("You are concise."),
///     ChatMessage::user("What is a lifetime?"),
/// ])
/// .with_options(ChatOptions::default().with_temperature(0.2))
/// .streaming(true);
/// assert!(request.stream);
/// assert_eq!(request.messages.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub options: ChatOptions,
    /// Selects the streaming path of [`crate::provider::ChatAdapter::chat_completion`].
    #[serde(default)]
    pub stream: bool,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            options: ChatOptions::default(),
            stream: false,
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Non-streaming completion in the normalized shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<Choice>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub usage: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
    /// Remaining vendor fields (`id`, `created`, ...) kept for pass-through.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompletionResponse {
    /// Builds a single-choice assistant response.
    pub fn single(
        content: impl Into<String>,
        finish_reason: Option<String>,
        usage: Map<String, Value>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            choices: vec![Choice {
                message: ChatMessage::assistant(content),
                finish_reason,
                extra: Map::new(),
            }],
            usage,
            model: model.into(),
            extra: Map::new(),
        }
    }

    /// Text of the first choice, if any.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// `index`, `logprobs` and other per-choice fields, kept as returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One normalized stream event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<StreamChoice>,
}

impl StreamChunk {
    /// Builds a single-choice chunk.
    pub fn delta(content: Option<String>, finish_reason: Option<String>) -> Self {
        Self {
            choices: vec![StreamChoice {
                delta: Delta { content },
                finish_reason,
            }],
        }
    }

    /// Text carried by the first choice.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }

    /// Finish reason of the first choice that reports one.
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices
            .iter()
            .find_map(|choice| choice.finish_reason.as_deref())
    }

    /// A chunk with a finish reason ends the stream.
    pub fn is_terminal(&self) -> bool {
        self.finish_reason().is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Entry of a model listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    #[serde(default = "model_object")]
    pub object: String,
    /// Vendor metadata such as context length or pricing.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: model_object(),
            extra: Map::new(),
        }
    }
}

fn model_object() -> String {
    "model".to_string()
}

/// Result of [`crate::provider::ChatAdapter::chat_completion`].
pub enum ChatOutput {
    Complete(CompletionResponse),
    Stream(ChatStream),
}

impl ChatOutput {
    pub fn into_response(self) -> Option<CompletionResponse> {
        match self {
            ChatOutput::Complete(response) => Some(response),
            ChatOutput::Stream(_) => None,
        }
    }

    pub fn into_stream(self) -> Option<ChatStream> {
        match self {
            ChatOutput::Stream(stream) => Some(stream),
            ChatOutput::Complete(_) => None,
        }
    }
}

impl fmt::Debug for ChatOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatOutput::Complete(response) => f.debug_tuple("Complete").field(response).finish(),
            ChatOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Capability descriptor used to tell adapters apart at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CapabilityDescriptor {
    /// Whether the adapter supports streaming outputs.
    pub supports_stream: bool,
    /// `true` when `get_available_models` queries the vendor; `false` when it
    /// returns a fixed catalog.
    pub supports_live_model_listing: bool,
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
