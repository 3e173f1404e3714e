//! Unified chat-completion client over OpenAI, Claude, Qwen and OpenRouter.
//!
//! Every vendor is driven through [`provider::ChatAdapter`] and answers in the
//! OpenAI-compatible shapes of [`types`]. [`factory::create_client`] builds an
//! adapter from [`config::Settings`]; [`manager::MultiModelManager`] fans one
//! conversation out over several OpenRouter models.

pub mod client;
pub mod config;
pub mod error;
pub mod factory;
pub mod http;
pub mod manager;
pub mod provider;
pub mod stream;
pub mod types;

pub use client::LLMClient;
pub use config::{ParamFallback, Settings};
pub use error::LLMError;
pub use factory::{ProviderKind, create_client, get_available_providers};
pub use manager::{ComparisonOutcome, MultiModelManager, StreamProgress};
pub use provider::{ChatAdapter, ChatStream, DynAdapter};
pub use stream::{LineOutcome, ParseFailure, ParseFailureHook};
pub use types::*;
