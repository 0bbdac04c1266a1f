//! The agent network: an agent driven by the router until it stops.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{HelmError, Result};
use crate::session::Transcript;
use crate::tools::ToolContext;

use super::output::RunHistory;
use super::router::{final_answer, Router, RouterState, StopReason};
use super::runner::{Agent, AgentState};

/// Default cap on agent invocations per run.
pub const DEFAULT_MAX_ITER: usize = 10;

/// Result of a finished network run.
#[derive(Debug, Clone)]
pub struct NetworkOutcome {
    pub answer: String,
    pub stop_reason: StopReason,
    pub history: RunHistory,
    pub transcript: Transcript,
}

/// Runs one agent under a [`Router`].
///
/// Two ceilings apply independently: the router's turn bound and the
/// network's own `max_iter` cap on agent invocations. Whichever is hit
/// first ends the run.
#[derive(Debug)]
pub struct Network {
    agent: Agent,
    router: Router,
    max_iter: usize,
}

impl Network {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            router: Router::default(),
            max_iter: DEFAULT_MAX_ITER,
        }
    }

    pub fn with_router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Drive the agent with `prompt` until the router or the cap stops it.
    ///
    /// Cancellation is observed before each invocation and between tool
    /// calls; an in-flight model call is never interrupted.
    pub async fn run(
        &self,
        prompt: &str,
        tool_context: ToolContext,
        cancel: &CancellationToken,
    ) -> Result<NetworkOutcome> {
        let mut state = AgentState::new(tool_context);
        let mut history = RunHistory::new();

        let stop_reason = loop {
            if cancel.is_cancelled() {
                return Err(HelmError::Cancelled(format!(
                    "network run cancelled after {} turns",
                    history.len()
                )));
            }

            let turn = self.agent.run(prompt, &mut state, cancel).await?;
            history.push(turn);

            match self.router.decide(&history) {
                RouterState::Done(reason) => break reason,
                RouterState::Running if history.len() >= self.max_iter => {
                    break StopReason::IterationLimit;
                }
                RouterState::Running => {
                    debug!(agent = %self.agent.name(), turn = history.len(), "Router continuing");
                }
            }
        };

        info!(
            agent = %self.agent.name(),
            turns = history.len(),
            stop_reason = %stop_reason,
            "Network run finished"
        );

        Ok(NetworkOutcome {
            answer: final_answer(&history),
            stop_reason,
            history,
            transcript: state.transcript,
        })
    }
}
