/// Short aliases mapped to OpenRouter model identifiers, grouped by vendor.
const CATALOG: &[(&str, &str)] = &[
    ("gpt-4.1-mini", "openai/gpt-4.1-mini"),
    ("gpt-5", "openai/gpt-5"),
    ("gpt-oss", "openai/gpt-oss-120b"),
    ("claude-4.1-opus", "anthropic/claude-opus-4.1"),
    ("claude-4-sonnet", "anthropic/claude-sonnet-4"),
    ("qwen3-235b", "qwen/qwen3-235b-a22b-2507"),
    ("qwen3-30b", "qwen/qwen3-30b-a3b"),
    ("qwen3-next-80b", "qwen/qwen3-next-80b-a3b-instruct"),
    ("qwen3-coder-480b", "qwen/qwen3-coder"),
    ("llama-2-70b", "meta-llama/llama-3.3-70b-instruct"),
    ("llama-2-13b", "meta-llama/llama-4-maverick"),
    ("gemini-pro", "google/gemini-2.5-flash"),
    ("palm-2", "google/gemini-2.5-pro"),
    ("mistral-7b", "mistralai/mistral-7b-instruct"),
    ("mixtral-8x7b", "mistralai/mixtral-8x7b-instruct"),
    (
        "perplexity-sonar-deep-research",
        "perplexity/sonar-deep-research",
    ),
    ("perplexity-sonar", "perplexity/sonar"),
];

/// Read-only alias table used by [`crate::manager::MultiModelManager`].
///
/// # Examples
///
/// ```
/// use multillm::provider::openrouter::ModelCatalog;
///
/// let catalog = ModelCatalog::new();
/// assert_eq!(catalog.resolve("claude-4-sonnet"), "anthropic/claude-sonnet-4");
/// assert_eq!(catalog.resolve("x-ai/grok-4"), "x-ai/grok-4");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ModelCatalog {
    entries: &'static [(&'static str, &'static str)],
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self { entries: CATALOG }
    }

    /// Looks up an alias.
    pub fn get(&self, alias: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(name, _)| *name == alias)
            .map(|(_, id)| *id)
    }

    /// Resolves an alias, passing unknown names through as literal model ids.
    pub fn resolve<'a>(&self, name: &'a str) -> &'a str {
        self.get(name).unwrap_or(name)
    }

    /// All `(alias, model id)` pairs in catalog order.
    pub fn all(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries.iter().copied()
    }

    /// Catalog model ids whose identifier contains `provider`, ignoring case.
    pub fn models_by_provider(&self, provider: &str) -> Vec<&'static str> {
        let needle = provider.to_lowercase();
        self.entries
            .iter()
            .map(|(_, id)| *id)
            .filter(|id| id.to_lowercase().contains(&needle))
            .collect()
    }
}
