use serde_json::{Map, Value};

use crate::config::GenerationDefaults;
use crate::types::{ChatMessage, CompletionRequest};

/// Optional knobs OpenAI accepts from [`crate::types::ChatOptions::extra`].
pub(crate) const OPENAI_EXTRA_KEYS: &[&str] = &["top_p"];

/// Builds the `/chat/completions` payload shared by OpenAI-compatible vendors.
///
/// Only the keys listed in `extra_keys` are copied from the request extras.
pub(crate) fn build_openai_body(
    request: &CompletionRequest,
    model: &str,
    defaults: &GenerationDefaults,
    stream: bool,
    extra_keys: &[&str],
) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert(
        "messages".to_string(),
        Value::Array(convert_messages(&request.messages)),
    );
    body.insert(
        "max_tokens".to_string(),
        Value::from(defaults.max_tokens(request.options.max_tokens)),
    );
    body.insert(
        "temperature".to_string(),
        Value::from(defaults.temperature(request.options.temperature)),
    );
    body.insert("stream".to_string(), Value::Bool(stream));
    for key in extra_keys {
        if let Some(value) = request.options.extra.get(*key) {
            body.insert((*key).to_string(), value.clone());
        }
    }
    Value::Object(body)
}

/// Converts messages into `{role, content}` objects, keeping their order.
pub(crate) fn convert_messages<'a>(
    messages: impl IntoIterator<Item = &'a ChatMessage>,
) -> Vec<Value> {
    messages
        .into_iter()
        .map(|message| {
            let mut object = Map::new();
            object.insert(
                "role".to_string(),
                Value::String(message.role.as_str().to_string()),
            );
            object.insert(
                "content".to_string(),
                Value::String(message.content.clone()),
            );
            Value::Object(object)
        })
        .collect()
}
