//! OpenAI-compatible Provider Implementation
//!
//! This module implements the `LLMProvider` trait for any Chat Completions
//! endpoint that speaks the OpenAI wire format. The default base URL points
//! at Groq's OpenAI-compatible API.
//!
//! Failures are classified into [`ProviderError`] here, at the edge, so the
//! retry layer never has to inspect strings.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HelmError, ProviderError, Result};
use crate::session::{Message, Role};

use super::{
    parse_provider_error, ChatOptions, LLMProvider, LLMResponse, LLMToolCall, ToolDefinition,
    Usage,
};

/// Groq's OpenAI-compatible API endpoint.
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

/// The default model to use.
const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

// ============================================================================
// API Request Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// A message in OpenAI's format.
#[derive(Debug, Serialize)]
struct WireMessage {
    /// Role: "system", "user", "assistant", or "tool"
    role: String,
    /// Message content (null for assistant with tool_calls)
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireToolCallRequest {
    id: String,
    r#type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded arguments
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    r#type: String,
    function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    /// Text content (may be null if tool_calls present)
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCallResponse>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCallResponse {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
    #[serde(default)]
    r#type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ============================================================================
// Provider
// ============================================================================

/// OpenAI-compatible chat completions provider.
pub struct OpenAIProvider {
    /// API key for authentication
    api_key: String,
    /// API base URL
    api_base: String,
    /// Model used when the caller does not override it
    default_model: String,
    client: Client,
}

impl OpenAIProvider {
    /// Create a provider for Groq's OpenAI-compatible API.
    ///
    /// # Example
    /// ```
    /// use helmsman::providers::openai::OpenAIProvider;
    /// use helmsman::providers::LLMProvider;
    ///
    /// let provider = OpenAIProvider::new("gsk-xxx");
    /// assert_eq!(provider.name(), "openai-compatible");
    /// ```
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, GROQ_API_URL)
    }

    /// Create a provider with a custom base URL (trailing slash removed).
    pub fn with_base_url(api_key: &str, api_base: &str) -> Self {
        Self::with_client(api_key, api_base, Client::new())
    }

    /// Create a provider with a custom HTTP client.
    pub fn with_client(api_key: &str, api_base: &str, client: Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            client,
        }
    }

    /// Override the model used when `chat` receives no model.
    pub fn with_default_model(mut self, model: &str) -> Self {
        self.default_model = model.to_string();
        self
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

fn convert_messages(messages: Vec<Message>) -> Vec<WireMessage> {
    messages
        .into_iter()
        .map(|msg| {
            let role = match msg.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            }
            .to_string();

            let tool_calls = msg.tool_calls.map(|tcs| {
                tcs.into_iter()
                    .map(|tc| WireToolCallRequest {
                        id: tc.id,
                        r#type: "function".to_string(),
                        function: WireFunctionCall {
                            name: tc.name,
                            arguments: tc.arguments,
                        },
                    })
                    .collect()
            });

            WireMessage {
                role,
                content: if msg.content.is_empty() && tool_calls.is_some() {
                    None
                } else {
                    Some(msg.content)
                },
                tool_calls,
                tool_call_id: msg.tool_call_id,
            }
        })
        .collect()
}

fn convert_tools(tools: Vec<ToolDefinition>) -> Vec<WireTool> {
    tools
        .into_iter()
        .map(|t| WireTool {
            r#type: "function".to_string(),
            function: WireFunctionDef {
                name: t.name,
                description: t.description,
                parameters: t.parameters,
            },
        })
        .collect()
}

fn convert_response(response: ChatResponse) -> LLMResponse {
    let (content, tool_calls) = match response.choices.into_iter().next() {
        Some(c) => {
            let content = c.message.content.unwrap_or_default();
            let tool_calls: Vec<LLMToolCall> = c
                .message
                .tool_calls
                .map(|tcs| {
                    tcs.into_iter()
                        .map(|tc| {
                            LLMToolCall::new(&tc.id, &tc.function.name, &tc.function.arguments)
                        })
                        .collect()
                })
                .unwrap_or_default();
            (content, tool_calls)
        }
        None => (String::new(), Vec::new()),
    };

    let mut llm_response = if tool_calls.is_empty() {
        LLMResponse::text(&content)
    } else {
        LLMResponse::with_tools(&content, tool_calls)
    };

    if let Some(usage) = response.usage {
        llm_response =
            llm_response.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
    }

    llm_response
}

/// Classify a transport-level reqwest failure.
fn classify_transport_error(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

/// Classify a non-success HTTP response.
///
/// Some gateways report rate limiting in the error body of a non-429
/// response, so the error type/code is checked before the status.
fn classify_error_body(status: u16, body: &str) -> ProviderError {
    if let Ok(parsed) = serde_json::from_str::<WireErrorResponse>(body) {
        let kind = parsed
            .error
            .r#type
            .as_deref()
            .or(parsed.error.code.as_deref())
            .unwrap_or_default()
            .to_lowercase();
        let message = parsed.error.message;
        if kind.contains("rate_limit") {
            return ProviderError::RateLimit(message);
        }
        if kind.contains("overloaded") {
            return ProviderError::Overloaded(message);
        }
        return parse_provider_error(status, &message);
    }
    parse_provider_error(status, body)
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse> {
        let model = model.unwrap_or(&self.default_model);
        let wire_tools = if tools.is_empty() {
            None
        } else {
            Some(convert_tools(tools))
        };

        let request = ChatRequest {
            model: model.to_string(),
            messages: convert_messages(messages),
            tools: wire_tools,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        debug!(model = model, "Chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| HelmError::Provider(classify_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(HelmError::Provider(classify_error_body(
                status.as_u16(),
                &error_text,
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            HelmError::Provider(ProviderError::Unknown(format!(
                "Failed to parse chat response: {}",
                e
            )))
        })?;

        Ok(convert_response(body))
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

// ============================================================================
// Tests
// ============================================================================
