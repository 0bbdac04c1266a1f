//! Providers module - model service adapters
//!
//! This module defines the `LLMProvider` trait and common types for talking
//! to a text-generation service. [`OpenAIProvider`] speaks the OpenAI wire
//! format (Groq by default) and [`RetryProvider`] layers the rate-limit aware
//! retry policy on top of any provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use helmsman::providers::{ChatOptions, LLMProvider, OpenAIProvider, RetryProvider};
//! use helmsman::session::Message;
//!
//! async fn example() -> helmsman::error::Result<()> {
//!     let provider = RetryProvider::new(Box::new(OpenAIProvider::new("gsk-xxx")));
//!     let messages = vec![Message::user("Hello!")];
//!     let options = ChatOptions::new().with_max_tokens(1000);
//!
//!     let response = provider.chat(messages, vec![], None, options).await?;
//!     println!("Response: {}", response.content);
//!     Ok(())
//! }
//! ```

pub mod openai;
pub mod retry;
mod types;

use crate::error::ProviderError;

pub use openai::OpenAIProvider;
pub use retry::{RetryPolicy, RetryProvider};
pub use types::{ChatOptions, LLMProvider, LLMResponse, LLMToolCall, ToolDefinition, Usage};

/// Parse an HTTP status code and response body into a structured [`ProviderError`].
pub fn parse_provider_error(status: u16, body: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Auth(body.to_string()),
        402 => ProviderError::Billing(body.to_string()),
        404 => ProviderError::ModelNotFound(body.to_string()),
        408 => ProviderError::Timeout(body.to_string()),
        429 => ProviderError::RateLimit(body.to_string()),
        400 | 413 | 422 => ProviderError::InvalidRequest(body.to_string()),
        500..=599 => ProviderError::ServerError(body.to_string()),
        _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
    }
}
