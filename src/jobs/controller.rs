//! Job lifecycle: from a message event to a persisted reply.
//!
//! A job runs a fixed sequence of named steps. Each step only reads from or
//! upserts into the store, so re-running a step after a crash leaves the
//! same state behind. Cancellation is checked before every step and before
//! every write; a cancelled job writes nothing further and rolls nothing
//! back.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::agent::{Agent, ContextBuilder, Network, NetworkOutcome, Router, TitleGenerator};
use crate::bus::JobReport;
use crate::error::{HelmError, Result};
use crate::providers::LLMProvider;
use crate::store::ConversationStore;
use crate::tools::{ToolContext, ToolRegistry};
use crate::utils::clock::{Sleeper, TokioSleeper};

use super::types::{JobSettings, MessageJob};

/// Written in place of an answer when a job fails.
pub const APOLOGY: &str = "My apologies, I encountered an error while processing your request. Let me know if you need anything else!";

const STEP_WAIT_FOR_SYNC: &str = "wait-for-db-sync";
const STEP_GET_CONVERSATION: &str = "get-conversation";
const STEP_GET_MESSAGES: &str = "get-recent-messages";
const STEP_BUILD_CONTEXT: &str = "build-context";
const STEP_GENERATE_TITLE: &str = "generate-title";
const STEP_UPDATE_TITLE: &str = "update-conversation-title";
const STEP_RUN_NETWORK: &str = "run-network";
const STEP_UPDATE_MESSAGE: &str = "update-assistant-message";

/// Runs message jobs against a store, a model and a tool set.
///
/// Holds no per-job state, so one controller serves any number of
/// concurrent jobs.
pub struct JobController {
    store: Arc<dyn ConversationStore>,
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    sleeper: Arc<dyn Sleeper>,
    context: ContextBuilder,
    settings: JobSettings,
}

impl JobController {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn LLMProvider>,
        tools: Arc<ToolRegistry>,
        settings: JobSettings,
    ) -> Self {
        Self {
            store,
            provider,
            tools,
            sleeper: Arc::new(TokioSleeper),
            context: ContextBuilder::coding(),
            settings,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_context_builder(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Run `job` to a terminal state and report how it ended.
    ///
    /// Never returns an error: failures are turned into the apology write
    /// and a [`JobStatus::Failed`](crate::bus::JobStatus::Failed) report.
    pub async fn run(&self, job: &MessageJob, cancel: &CancellationToken) -> JobReport {
        let span = info_span!(
            "job",
            job_id = %job.job_id,
            message_id = %job.message_id,
            conversation_id = %job.conversation_id,
        );

        async {
            let started = Instant::now();
            info!("Job started");

            match self.execute(job, cancel).await {
                Ok(outcome) => {
                    info!(
                        turns = outcome.history.len(),
                        stop_reason = %outcome.stop_reason,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "Job completed"
                    );
                    JobReport::completed(
                        &job.job_id,
                        &job.message_id,
                        &job.conversation_id,
                        &outcome.answer,
                        outcome.stop_reason,
                        outcome.history.len(),
                    )
                }
                Err(e) if e.is_cancellation() => {
                    info!(reason = %e, "Job cancelled");
                    JobReport::cancelled(&job.job_id, &job.message_id, &job.conversation_id)
                }
                Err(e) => {
                    error!(error = %e, "Job failed");
                    let written = self.on_failure(job).await;
                    JobReport::failed(
                        &job.job_id,
                        &job.message_id,
                        &job.conversation_id,
                        &e.to_string(),
                        written.then_some(APOLOGY),
                    )
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, job: &MessageJob, cancel: &CancellationToken) -> Result<NetworkOutcome> {
        if self.settings.internal_key.is_none() {
            return Err(HelmError::Config(
                "store internal key is not configured".to_string(),
            ));
        }

        checkpoint(cancel, STEP_WAIT_FOR_SYNC)?;
        self.sleeper.sleep(self.settings.sync_delay).await;

        checkpoint(cancel, STEP_GET_CONVERSATION)?;
        let conversation = self
            .store
            .get_conversation_by_id(&job.conversation_id)
            .await?
            .ok_or_else(|| {
                HelmError::NotFound(format!("conversation {}", job.conversation_id))
            })?;

        checkpoint(cancel, STEP_GET_MESSAGES)?;
        let history = self
            .store
            .get_recent_messages(&job.conversation_id, self.settings.history_limit)
            .await?;

        checkpoint(cancel, STEP_BUILD_CONTEXT)?;
        let system_prompt = self.context.build(&history, &job.message_id);
        debug!(history = history.len(), prompt_chars = system_prompt.len(), "Context built");

        if conversation.is_default_title {
            checkpoint(cancel, STEP_GENERATE_TITLE)?;
            self.generate_title(job, cancel).await?;
        }

        checkpoint(cancel, STEP_RUN_NETWORK)?;
        let agent = Agent::new("coding-agent", &system_prompt, Arc::clone(&self.provider))
            .with_tools(Arc::clone(&self.tools))
            .with_model(&self.settings.model)
            .with_options(self.settings.chat_options());
        let network = Network::new(agent)
            .with_router(Router::new(self.settings.max_turns))
            .with_max_iter(self.settings.max_iter);
        let tool_context = ToolContext::new()
            .with_project(&job.project_id)
            .with_conversation(&job.conversation_id);
        let outcome = network.run(&job.message_text, tool_context, cancel).await?;

        checkpoint(cancel, STEP_UPDATE_MESSAGE)?;
        self.store
            .update_message_content(&job.message_id, &outcome.answer)
            .await?;

        Ok(outcome)
    }

    /// Title step. Only cancellation escapes; every other failure is
    /// logged and the job goes on.
    async fn generate_title(&self, job: &MessageJob, cancel: &CancellationToken) -> Result<()> {
        let generator = TitleGenerator::new(Arc::clone(&self.provider), &self.settings.title_model);

        let title = match generator.generate(&job.message_text, cancel).await {
            Ok(Some(title)) => title,
            Ok(None) => {
                warn!(step = STEP_GENERATE_TITLE, "Model produced no title, skipping");
                return Ok(());
            }
            Err(e) if e.is_cancellation() => return Err(e),
            Err(e) => {
                warn!(step = STEP_GENERATE_TITLE, error = %e, "Title generation failed, skipping");
                return Ok(());
            }
        };

        checkpoint(cancel, STEP_UPDATE_TITLE)?;
        if let Err(e) = self
            .store
            .update_conversation_title(&job.conversation_id, &title)
            .await
        {
            warn!(step = STEP_UPDATE_TITLE, error = %e, "Title update failed, skipping");
        }
        Ok(())
    }

    /// Best-effort apology write. Returns whether it landed.
    async fn on_failure(&self, job: &MessageJob) -> bool {
        if self.settings.internal_key.is_none() {
            warn!("No store credential, cannot record failure");
            return false;
        }

        match self
            .store
            .update_message_content(&job.message_id, APOLOGY)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Failed to record apology");
                false
            }
        }
    }
}

impl std::fmt::Debug for JobController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobController")
            .field("provider", &self.provider.name())
            .field("tools", &self.tools.names())
            .field("settings", &self.settings)
            .finish()
    }
}

fn checkpoint(cancel: &CancellationToken, step: &'static str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(HelmError::Cancelled(format!("before step '{}'", step)));
    }
    info!(step, "Entering step");
    Ok(())
}
