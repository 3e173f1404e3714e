//! Qwen adapter over Alibaba DashScope text generation.

mod provider;
mod request;
mod response;
pub mod stream;

pub use provider::{QWEN_MODELS, QwenAdapter};
pub use stream::{decode_line, parse_line};
