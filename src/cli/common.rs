//! Shared CLI helpers used across multiple command handlers.

use std::sync::Arc;

use anyhow::{bail, Result};

use helmsman::config::Config;
use helmsman::jobs::{JobController, JobSettings};
use helmsman::providers::{LLMProvider, OpenAIProvider, RetryProvider};
use helmsman::store::{ConversationStore, FileStore};
use helmsman::tools::coding_tools;

/// Model provider from config, wrapped in the retry policy.
pub(crate) fn build_provider(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let Some(api_key) = config
        .providers
        .groq
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
    else {
        bail!(
            "No model API key configured. Set HELMSMAN_PROVIDERS_GROQ_API_KEY or \
             providers.groq.api_key in {}",
            Config::path().display()
        );
    };

    let provider = match config.providers.groq.api_base.as_deref() {
        Some(base) => OpenAIProvider::with_base_url(api_key, base),
        None => OpenAIProvider::new(api_key),
    }
    .with_default_model(&config.agent.model);

    Ok(Arc::new(
        RetryProvider::new(Box::new(provider)).with_policy(config.providers.retry),
    ))
}

/// Job controller wired to the given stores and the configured provider.
pub(crate) fn build_controller(
    config: &Config,
    settings: JobSettings,
    conversations: Arc<dyn ConversationStore>,
    files: Arc<dyn FileStore>,
) -> Result<JobController> {
    let provider = build_provider(config)?;
    let tools = coding_tools(files, &config.tools);
    Ok(JobController::new(
        conversations,
        provider,
        Arc::new(tools),
        settings,
    ))
}
