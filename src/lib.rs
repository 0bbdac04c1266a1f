//! Helmsman - durable agent orchestration for a conversational coding assistant

pub mod agent;
pub mod bus;
pub mod config;
pub mod error;
pub mod jobs;
pub mod providers;
pub mod session;
pub mod store;
pub mod tools;
pub mod utils;

pub use agent::{Agent, ContextBuilder, Network, Router};
pub use bus::{InboundEvent, JobReport, JobStatus, MessageBus};
pub use config::Config;
pub use error::{HelmError, ModelError, ProviderError, Result};
pub use jobs::{Dispatcher, JobController, JobSettings, MessageJob};
pub use providers::{
    ChatOptions, LLMProvider, LLMResponse, LLMToolCall, OpenAIProvider, RetryProvider,
    ToolDefinition, Usage,
};
pub use session::{Message, Role, ToolCall, Transcript};
