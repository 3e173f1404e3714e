//! Claude adapter over the Anthropic Messages API.

mod provider;
mod request;
mod response;
pub mod stream;

pub use provider::{CLAUDE_MODELS, ClaudeAdapter};
pub use stream::{decode_line, parse_line};
