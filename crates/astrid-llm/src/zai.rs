//! Z.AI (GLM) provider: an `OpenAI`-compatible endpoint, so this is a thin
//! constructor wrapper rather than a fresh implementation.

use crate::openai_compat::OpenAiCompatProvider;

const ZAI_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
const DEFAULT_MODEL: &str = "glm-4.6";

/// Z.AI (GLM) provider, built on [`OpenAiCompatProvider::custom`].
pub struct ZaiProvider;

impl ZaiProvider {
    /// Create a provider for Z.AI's default model.
    #[must_use]
    pub fn new(api_key: &str) -> OpenAiCompatProvider {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    /// Create a provider for a specific Z.AI model.
    #[must_use]
    pub fn with_model(api_key: &str, model: &str) -> OpenAiCompatProvider {
        OpenAiCompatProvider::custom(ZAI_BASE_URL, Some(api_key), model)
    }
}
