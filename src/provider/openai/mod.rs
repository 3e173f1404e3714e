//! OpenAI Chat Completions adapter.
//!
//! The request, response and stream helpers here are shared with the
//! OpenRouter adapter, which speaks the same wire format.

mod provider;
pub(crate) mod request;
pub(crate) mod response;
pub mod stream;

pub use provider::OpenAiAdapter;
pub use stream::{decode_line, parse_line};
