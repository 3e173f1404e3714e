use std::time::Duration;

use thiserror::Error;

/// Aggregates every failure mode exposed by the unified chat client.
///
/// Vendor-facing variants carry the provider label (`"OpenAI"`, `"Claude"`, ...)
/// so that failures coming out of a multi-provider fan-out stay distinguishable
/// at the call site.
#[derive(Debug, Error)]
pub enum LLMError {
    /// Represents transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The request did not complete within the configured timeout.
    #[error("request timed out: {message}")]
    Timeout { message: String },
    /// HTTP 401: the API key was rejected.
    #[error("{provider}: authentication failed - check your API key")]
    Auth { provider: &'static str },
    /// HTTP 402: the account has run out of credit or quota.
    #[error("{provider}: insufficient credits")]
    InsufficientCredit { provider: &'static str },
    /// HTTP 429: the provider throttled the request.
    #[error("{provider}: rate limit exceeded")]
    RateLimit {
        provider: &'static str,
        /// Wait duration suggested through `Retry-After`, if any. Never acted upon here.
        retry_after: Option<Duration>,
    },
    /// Any other non-success status, kept verbatim for diagnosis.
    #[error("{provider}: API call failed ({status}) - {body}")]
    Api {
        provider: &'static str,
        status: u16,
        /// Raw response body returned by the provider.
        body: String,
    },
    /// A success response whose body could not be mapped to the normalized shape.
    #[error("{provider}: {message}")]
    Provider {
        /// Display label of the provider, such as `Claude`.
        provider: &'static str,
        message: String,
    },
    /// Signals validation failures in the request payload.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Raised when building or validating configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
}

impl LLMError {
    /// Creates an [`LLMError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use multillm::error::LLMError;
    ///
    /// let err = LLMError::transport("dns lookup failed");
    /// assert!(matches!(err, LLMError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Provider`] with the given provider label and message.
    ///
    /// # Examples
    ///
    /// ```
    /// use multillm::error::LLMError;
    ///
    /// let err = LLMError::provider("Qwen", "missing output.choices");
    /// assert_eq!(err.to_string(), "Qwen: missing output.choices");
    /// ```
    pub fn provider<T: Into<String>>(provider: &'static str, message: T) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::InvalidConfig`] for the named field.
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the provider label for vendor-originated failures.
    pub fn provider_name(&self) -> Option<&'static str> {
        match self {
            Self::Auth { provider }
            | Self::InsufficientCredit { provider }
            | Self::RateLimit { provider, .. }
            | Self::Api { provider, .. }
            | Self::Provider { provider, .. } => Some(provider),
            _ => None,
        }
    }
}

/// Maps a non-success HTTP status to the status-driven error taxonomy.
pub(crate) fn status_error(
    provider: &'static str,
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> LLMError {
    match status {
        401 => LLMError::Auth { provider },
        402 => LLMError::InsufficientCredit { provider },
        429 => LLMError::RateLimit {
            provider,
            retry_after,
        },
        _ => LLMError::Api {
            provider,
            status,
            body: body.to_string(),
        },
    }
}
