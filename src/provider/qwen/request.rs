use serde_json::{Map, Value};

use crate::config::GenerationDefaults;
use crate::provider::openai::request::convert_messages;
use crate::types::CompletionRequest;

/// Builds the DashScope generation payload.
///
/// `incremental_output` follows the stream flag so each streamed event carries
/// only the new text.
pub(crate) fn build_qwen_body(
    request: &CompletionRequest,
    model: &str,
    defaults: &GenerationDefaults,
    stream: bool,
) -> Value {
    let mut input = Map::new();
    input.insert(
        "messages".to_string(),
        Value::Array(convert_messages(&request.messages)),
    );

    let mut parameters = Map::new();
    parameters.insert(
        "max_tokens".to_string(),
        Value::from(defaults.max_tokens(request.options.max_tokens)),
    );
    parameters.insert(
        "temperature".to_string(),
        Value::from(defaults.temperature(request.options.temperature)),
    );
    parameters.insert(
        "result_format".to_string(),
        Value::String("message".to_string()),
    );
    parameters.insert("incremental_output".to_string(), Value::Bool(stream));

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert("input".to_string(), Value::Object(input));
    body.insert("parameters".to_string(), Value::Object(parameters));
    Value::Object(body)
}
