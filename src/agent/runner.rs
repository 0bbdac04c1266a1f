//! A single agent: one model call plus the tool calls it requested.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{HelmError, Result};
use crate::providers::{ChatOptions, LLMProvider, LLMToolCall};
use crate::session::{Message, ToolCall, Transcript};
use crate::tools::{ToolContext, ToolOutput, ToolRegistry};

use super::output::{AgentTurnResult, OutputItem};

/// Mutable state an agent carries across the turns of one run.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub transcript: Transcript,
    pub tool_context: ToolContext,
}

impl AgentState {
    pub fn new(tool_context: ToolContext) -> Self {
        Self {
            transcript: Transcript::new(),
            tool_context,
        }
    }
}

/// A named agent bound to a system prompt, a model and a tool set.
///
/// Each [`run`](Agent::run) performs exactly one model call. The model sees
/// the system prompt, the original user prompt and everything recorded in
/// the transcript so far, so a later turn observes earlier tool results.
pub struct Agent {
    name: String,
    system_prompt: String,
    provider: Arc<dyn LLMProvider>,
    tools: Arc<ToolRegistry>,
    model: Option<String>,
    options: ChatOptions,
}

impl Agent {
    /// Create an agent with no tools.
    pub fn new(name: &str, system_prompt: &str, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.to_string(),
            system_prompt: system_prompt.to_string(),
            provider,
            tools: Arc::new(ToolRegistry::new()),
            model: None,
            options: ChatOptions::new(),
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one turn.
    ///
    /// Tool calls are executed in the order the model emitted them and
    /// their results appended to the transcript. A tool failure becomes a
    /// failure result the model can read; only a missing tool context or
    /// cancellation aborts the turn.
    pub async fn run(
        &self,
        prompt: &str,
        state: &mut AgentState,
        cancel: &CancellationToken,
    ) -> Result<AgentTurnResult> {
        if cancel.is_cancelled() {
            return Err(HelmError::Cancelled(format!(
                "agent '{}' cancelled before model call",
                self.name
            )));
        }

        let mut messages = Vec::with_capacity(state.transcript.len() + 2);
        messages.push(Message::system(&self.system_prompt));
        messages.push(Message::user(prompt));
        messages.extend(state.transcript.messages().iter().cloned());

        let started = Instant::now();
        let response = self
            .provider
            .chat(
                messages,
                self.tools.definitions(),
                self.model.as_deref(),
                self.options.clone(),
            )
            .await?;

        debug!(
            agent = %self.name,
            tool_calls = response.tool_calls.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Model responded"
        );

        let calls: Vec<LLMToolCall> = response
            .tool_calls
            .into_iter()
            .map(|mut call| {
                if call.id.is_empty() {
                    call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
                }
                call
            })
            .collect();

        let mut outputs = Vec::with_capacity(calls.len() + 1);
        if !response.content.trim().is_empty() {
            outputs.push(OutputItem::assistant_text(&response.content));
        }
        outputs.extend(
            calls
                .iter()
                .map(|c| OutputItem::tool_call(&c.id, &c.name, &c.arguments)),
        );

        if calls.is_empty() {
            state.transcript.push(Message::assistant(&response.content));
            return Ok(AgentTurnResult::new(outputs));
        }

        state.transcript.push(Message::assistant_with_tools(
            &response.content,
            calls
                .iter()
                .map(|c| ToolCall::new(&c.id, &c.name, &c.arguments))
                .collect(),
        ));

        for call in &calls {
            if cancel.is_cancelled() {
                return Err(HelmError::Cancelled(format!(
                    "agent '{}' cancelled before tool '{}'",
                    self.name, call.name
                )));
            }

            info!(agent = %self.name, tool = %call.name, id = %call.id, "Executing tool");
            let output = match serde_json::from_str(&call.arguments) {
                Ok(args) => {
                    self.tools
                        .execute_with_context(&call.name, args, &state.tool_context)
                        .await?
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Invalid JSON in tool arguments");
                    ToolOutput::failure(format!("Invalid arguments JSON: {}", e))
                }
            };

            state
                .transcript
                .push(Message::tool_result(&call.id, &output.for_llm()));
        }

        Ok(AgentTurnResult::new(outputs))
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("tools", &self.tools.names())
            .finish()
    }
}
