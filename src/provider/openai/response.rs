use serde::Deserialize;

use crate::error::LLMError;
use crate::provider::parse_json;
use crate::types::ModelDescriptor;

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelDescriptor>,
}

/// Extracts the `data` array of a `/models` listing.
pub(crate) fn map_model_list(
    provider: &'static str,
    text: &str,
) -> Result<Vec<ModelDescriptor>, LLMError> {
    let list: ModelList = parse_json(provider, text)?;
    Ok(list.data)
}
