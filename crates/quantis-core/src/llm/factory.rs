//! Construct the primary/fallback provider pair from configuration.

use super::anthropic::AnthropicProvider;
use super::openai_compat::OpenAiCompatProvider;
use super::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::sync::Arc;

/// Build the primary and fallback providers named by `config`.
///
/// Both providers are the same provider kind with a different model
/// string, per §4.3's resolution that primary/fallback name two models of
/// one configured provider rather than two distinct providers.
pub fn build_providers(config: &LlmConfig) -> Result<(Arc<dyn LlmProvider>, Arc<dyn LlmProvider>), LlmError> {
    let api_key = config.api_key.clone().ok_or(LlmError::NotConfigured)?;

    match config.provider.as_str() {
        "anthropic" => {
            let primary: Arc<dyn LlmProvider> = match &config.base_url {
                Some(url) => Arc::new(AnthropicProvider::with_base_url(
                    api_key.clone(),
                    config.primary_model.clone(),
                    url.clone(),
                )),
                None => Arc::new(AnthropicProvider::new(api_key.clone(), config.primary_model.clone())),
            };
            let fallback: Arc<dyn LlmProvider> = match &config.base_url {
                Some(url) => Arc::new(AnthropicProvider::with_base_url(
                    api_key,
                    config.fallback_model.clone(),
                    url.clone(),
                )),
                None => Arc::new(AnthropicProvider::new(api_key, config.fallback_model.clone())),
            };
            Ok((primary, fallback))
        }
        "openai" => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string());
            let primary: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatProvider::new(
                base_url.clone(),
                api_key.clone(),
                config.primary_model.clone(),
                "openai".to_string(),
            ));
            let fallback: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatProvider::new(
                base_url,
                api_key,
                config.fallback_model.clone(),
                "openai".to_string(),
            ));
            Ok((primary, fallback))
        }
        other => Err(LlmError::Api {
            status: 0,
            message: format!("unsupported LLM provider: {other}"),
        }),
    }
}
