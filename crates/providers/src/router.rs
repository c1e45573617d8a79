//! Config-driven provider construction.
//!
//! The provider map was a process-global factory in earlier designs;
//! here the built provider is handed to the dialog engine explicitly so
//! tests can substitute a fake at the same seam.

use std::sync::Arc;

use dialform_config::AppConfig;
use dialform_core::error::LlmError;
use dialform_core::llm::Llm;
use tracing::info;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured LLM provider.
///
/// Fails fast when the API key is missing or the provider name is
/// unknown — before any dialog starts.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Llm>, LlmError> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| LlmError::NotConfigured("no API key configured".into()))?;

    let mut provider = match config.provider.as_str() {
        "openai" => OpenAiCompatProvider::openai(api_key)?,
        "deepseek" => OpenAiCompatProvider::deepseek(api_key)?,
        other => {
            return Err(LlmError::NotConfigured(format!(
                "unknown provider '{other}': expected openai or deepseek"
            )));
        }
    };

    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url);
    }

    info!(provider = %provider.name(), model = %config.model, "LLM provider ready");
    Ok(Arc::new(provider))
}
