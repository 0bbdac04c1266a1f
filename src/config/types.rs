//! Configuration type definitions for Helmsman
//!
//! All types implement serde traits for JSON serialization and have defaults
//! matching the production policy, so an empty `{}` config is valid apart
//! from credentials.

use serde::{Deserialize, Serialize};

use crate::providers::RetryPolicy;

/// Main configuration struct for Helmsman
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Coding agent and router bounds
    pub agent: AgentConfig,
    /// Model service credentials and retry policy
    pub providers: ProvidersConfig,
    /// Persistence store endpoint and credential
    pub store: StoreConfig,
    /// Job lifecycle timings
    pub job: JobConfig,
    /// Built-in tool limits
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
    pub dispatcher: DispatcherConfig,
}

// ============================================================================
// Agent Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model used by the coding agent
    pub model: String,
    /// Model used for one-shot title generation
    pub title_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Cap on agent invocations per run
    pub max_iter: usize,
    /// Router turn count at which a run is force-stopped
    pub max_turns: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.1-8b-instant".to_string(),
            title_model: "llama-3.1-8b-instant".to_string(),
            max_tokens: 4096,
            temperature: 0.6,
            max_iter: 10,
            max_turns: 20,
        }
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Groq (OpenAI-compatible) endpoint
    pub groq: ProviderConfig,
    /// Backoff policy applied to every model call
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    /// Override the default API base URL
    pub api_base: Option<String>,
}

// ============================================================================
// Store Configuration
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the query/mutation API
    pub base_url: Option<String>,
    /// Internal credential sent with every store call
    pub internal_key: Option<String>,
}

impl StoreConfig {
    /// The internal key, if set to something non-blank.
    pub fn internal_key(&self) -> Option<&str> {
        self.internal_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

// ============================================================================
// Job Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Delay before the first store read, to let upstream writes land
    pub sync_delay_ms: u64,
    /// Number of recent messages fetched for context
    pub history_limit: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            sync_delay_ms: 1000,
            history_limit: 10,
        }
    }
}

// ============================================================================
// Tools Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Characters of extracted text returned per fetched URL
    pub fetch_max_chars: usize,
    /// URLs accepted per `fetch_urls` call
    pub fetch_max_urls: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            fetch_max_chars: crate::tools::web::DEFAULT_MAX_FETCH_CHARS,
            fetch_max_urls: crate::tools::web::DEFAULT_MAX_URLS,
        }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Component,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Append logs to this file instead of stderr
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Component,
            level: "info".to_string(),
            file: None,
        }
    }
}

// ============================================================================
// Dispatcher Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Capacity of the inbound and outbound bus channels
    pub buffer_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { buffer_size: 100 }
    }
}
