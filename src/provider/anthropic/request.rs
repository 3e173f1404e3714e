use serde_json::{Map, Value};

use crate::config::GenerationDefaults;
use crate::provider::openai::request::convert_messages;
use crate::types::{CompletionRequest, Role};

/// Builds the `/messages` payload.
///
/// The first system turn becomes the top-level `system` field. The Messages
/// API has no system role inside `messages`, so later system turns are left
/// out; the remaining turns keep their order.
pub(crate) fn build_anthropic_body(
    request: &CompletionRequest,
    model: &str,
    defaults: &GenerationDefaults,
    stream: bool,
) -> Value {
    let mut system = None;
    let mut turns = Vec::with_capacity(request.messages.len());
    for message in &request.messages {
        match message.role {
            Role::System if system.is_none() => system = Some(message.content.as_str()),
            Role::System => {
                tracing::debug!(provider = "Claude", "dropping additional system message");
            }
            _ => turns.push(message),
        }
    }

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert("messages".to_string(), Value::Array(convert_messages(turns)));
    body.insert(
        "max_tokens".to_string(),
        Value::from(defaults.max_tokens(request.options.max_tokens)),
    );
    body.insert("stream".to_string(), Value::Bool(stream));

    if let Some(system) = system.filter(|content| !content.is_empty()) {
        body.insert("system".to_string(), Value::String(system.to_string()));
    }
    if let Some(temperature) = defaults.explicit_temperature(request.options.temperature) {
        body.insert("temperature".to_string(), Value::from(temperature));
    }
    Value::Object(body)
}
