//! Agent module - model-driven turns and the router that bounds them
//!
//! - [`ContextBuilder`]: system prompt plus recent conversation history
//! - [`Agent`]: one model call per turn, executing requested tools and
//!   recording the exchange in an explicit transcript
//! - [`Router`]: decides after each turn whether to invoke the agent again
//! - [`Network`]: drives an agent under a router until it stops
//! - [`TitleGenerator`]: single-shot title for a new conversation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Network   │────>│    Agent    │────>│ LLMProvider │
//! │             │     │             │     │   (retry)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   │
//!        │                   │
//!        ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐
//! │   Router    │     │    Tools    │
//! │ (RunHistory)│     │  Registry   │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use helmsman::agent::{Agent, ContextBuilder, Network};
//! use helmsman::providers::{OpenAIProvider, RetryProvider};
//! use helmsman::tools::ToolContext;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn answer() -> helmsman::Result<String> {
//!     let provider = Arc::new(RetryProvider::new(Box::new(OpenAIProvider::new("gsk-..."))));
//!     let system = ContextBuilder::coding().build(&[], "msg_1");
//!     let network = Network::new(Agent::new("coder", &system, provider));
//!     let outcome = network
//!         .run("Add a README", ToolContext::new().with_project("p1"), &CancellationToken::new())
//!         .await?;
//!     Ok(outcome.answer)
//! }
//! ```

mod context;
mod network;
mod output;
mod router;
mod runner;
mod title;

pub use context::{ContextBuilder, CODING_AGENT_SYSTEM_PROMPT, TITLE_GENERATOR_SYSTEM_PROMPT};
pub use network::{Network, NetworkOutcome, DEFAULT_MAX_ITER};
pub use output::{AgentTurnResult, OutputItem, RunHistory};
pub use router::{final_answer, Router, RouterState, StopReason, DEFAULT_MAX_TURNS, FALLBACK_ANSWER};
pub use runner::{Agent, AgentState};
pub use title::TitleGenerator;
