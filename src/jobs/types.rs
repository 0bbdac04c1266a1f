//! Job inputs and the settings a controller runs them with.

use std::time::Duration;

use crate::bus::MessageSent;
use crate::config::Config;
use crate::providers::ChatOptions;

/// One unit of work: answer a single user message.
///
/// Immutable once created and owned by the task that runs it.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageJob {
    pub job_id: String,
    /// Assistant message the answer is written to
    pub message_id: String,
    pub conversation_id: String,
    pub project_id: String,
    pub message_text: String,
}

impl MessageJob {
    pub fn new(message_id: &str, conversation_id: &str, project_id: &str, message_text: &str) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            message_id: message_id.to_string(),
            conversation_id: conversation_id.to_string(),
            project_id: project_id.to_string(),
            message_text: message_text.to_string(),
        }
    }
}

impl From<MessageSent> for MessageJob {
    fn from(event: MessageSent) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            message_id: event.message_id,
            conversation_id: event.conversation_id,
            project_id: event.project_id,
            message_text: event.message,
        }
    }
}

/// Everything a [`JobController`](super::JobController) needs from config.
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Store credential; a job refuses to start without one
    pub internal_key: Option<String>,
    pub model: String,
    pub title_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_iter: usize,
    pub max_turns: usize,
    pub sync_delay: Duration,
    pub history_limit: usize,
}

impl JobSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            internal_key: config.store.internal_key().map(str::to_string),
            model: config.agent.model.clone(),
            title_model: config.agent.title_model.clone(),
            max_tokens: config.agent.max_tokens,
            temperature: config.agent.temperature,
            max_iter: config.agent.max_iter,
            max_turns: config.agent.max_turns,
            sync_delay: Duration::from_millis(config.job.sync_delay_ms),
            history_limit: config.job.history_limit,
        }
    }

    pub fn with_internal_key(mut self, key: &str) -> Self {
        self.internal_key = Some(key.to_string());
        self
    }

    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions::new()
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }
}

impl Default for JobSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
