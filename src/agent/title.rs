//! One-shot conversation title generation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::providers::{ChatOptions, LLMProvider};

use super::context::TITLE_GENERATOR_SYSTEM_PROMPT;
use super::runner::{Agent, AgentState};

/// Titles are short; cap the completion accordingly.
const TITLE_MAX_TOKENS: u32 = 50;

/// Single agent call, no tools and no router.
#[derive(Debug)]
pub struct TitleGenerator {
    agent: Agent,
}

impl TitleGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, model: &str) -> Self {
        let agent = Agent::new("title-generator", TITLE_GENERATOR_SYSTEM_PROMPT, provider)
            .with_model(model)
            .with_options(ChatOptions::new().with_max_tokens(TITLE_MAX_TOKENS));
        Self { agent }
    }

    /// Title for a conversation opening with `message`.
    ///
    /// `Ok(None)` when the model produced no usable text.
    pub async fn generate(
        &self,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let turn = self
            .agent
            .run(message, &mut AgentState::default(), cancel)
            .await?;

        Ok(turn
            .assistant_text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string))
    }
}
