//! Canonical model name resolution
//!
//! Each mapped provider has a small static table from canonical model ids to
//! its native ids. Names missing from a table are forwarded unchanged so new
//! models work without a release.

use crate::providers::adapter::ProviderKind;

type ModelTable = &'static [(&'static str, &'static str)];

const GEMINI_MODELS: ModelTable = &[
    ("claude-3-5-sonnet-20241022", "gemini-2.0-flash-exp"),
    ("claude-3-5-sonnet", "gemini-2.0-flash-exp"),
    ("claude-3-haiku", "gemini-1.5-flash"),
    ("claude-3-opus", "gemini-1.5-pro"),
];

const OPENAI_MODELS: ModelTable = &[
    ("claude-3-5-sonnet-20241022", "gpt-4o"),
    ("claude-3-5-sonnet", "gpt-4o"),
    ("claude-3-haiku", "gpt-4o-mini"),
    ("claude-3-opus", "gpt-4"),
];

const QWEN_MODELS: ModelTable = &[
    ("claude-3-5-sonnet-20241022", "qwen-max"),
    ("claude-3-5-sonnet", "qwen-max"),
    ("claude-3-haiku", "qwen-turbo"),
    ("claude-3-opus", "qwen-plus"),
];

const CEREBRAS_MODELS: ModelTable = &[
    ("claude-3-5-sonnet-20241022", "llama3.1-70b"),
    ("claude-3-5-sonnet", "llama3.1-70b"),
    ("claude-3-haiku", "llama3.1-8b"),
    ("claude-3-opus", "llama3.1-70b"),
];

/// Mapping table for a provider. Pass-through providers have none.
pub fn model_table(provider: ProviderKind) -> ModelTable {
    match provider {
        ProviderKind::Gemini => GEMINI_MODELS,
        ProviderKind::OpenAi => OPENAI_MODELS,
        ProviderKind::Qwen => QWEN_MODELS,
        ProviderKind::Cerebras => CEREBRAS_MODELS,
        ProviderKind::Anthropic | ProviderKind::AnyRouter => &[],
    }
}

/// Resolve a canonical model id to the provider's native id.
///
/// Total: an unknown name is returned unchanged.
pub fn resolve(provider: ProviderKind, canonical_model: &str) -> String {
    model_table(provider)
        .iter()
        .find(|(canonical, _)| *canonical == canonical_model)
        .map(|(_, native)| native.to_string())
        .unwrap_or_else(|| canonical_model.to_string())
}
