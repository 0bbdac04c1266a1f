//! Tool types for Helmsman
//!
//! This module defines the core types for tool execution: the `Tool` trait
//! every capability implements, the `ToolContext` passed to each call, and
//! the `ToolOutput` a tool hands back to the model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;

/// Broad kind of effect a tool has. Recorded on every execution log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Reads project files.
    FilesystemRead,
    /// Creates, overwrites, moves or deletes project files.
    FilesystemWrite,
    /// Reads from the network.
    NetworkRead,
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FilesystemRead => write!(f, "filesystem_read"),
            Self::FilesystemWrite => write!(f, "filesystem_write"),
            Self::NetworkRead => write!(f, "network_read"),
        }
    }
}

/// Result of one tool call, as handed back to the model.
///
/// A tool either answers with plain text or with a structured
/// `{success, data | error}` object.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Success(Value),
    Failure(String),
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        ToolOutput::Text(content.into())
    }

    pub fn success(data: Value) -> Self {
        ToolOutput::Success(data)
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ToolOutput::Failure(error.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutput::Failure(_))
    }

    /// Render the result as the tool message content sent to the model.
    ///
    /// # Example
    /// ```
    /// use helmsman::tools::ToolOutput;
    /// use serde_json::json;
    ///
    /// assert_eq!(ToolOutput::text("plain").for_llm(), "plain");
    /// assert_eq!(
    ///     ToolOutput::success(json!(3)).for_llm(),
    ///     r#"{"data":3,"success":true}"#
    /// );
    /// ```
    pub fn for_llm(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Success(data) => json!({ "success": true, "data": data }).to_string(),
            ToolOutput::Failure(error) => {
                json!({ "success": false, "error": error }).to_string()
            }
        }
    }
}

/// Trait that all tools must implement.
///
/// Tools with side effects must be safe to re-execute: writes are upserts
/// keyed by path, never appends.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use helmsman::tools::{Tool, ToolCategory, ToolContext, ToolOutput};
/// use helmsman::error::Result;
///
/// struct Ping;
///
/// #[async_trait]
/// impl Tool for Ping {
///     fn name(&self) -> &str { "ping" }
///     fn description(&self) -> &str { "Answers pong" }
///     fn parameters(&self) -> Value {
///         serde_json::json!({ "type": "object", "properties": {} })
///     }
///     fn category(&self) -> ToolCategory { ToolCategory::NetworkRead }
///     async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
///         Ok(ToolOutput::text("pong"))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to call the tool.
    fn name(&self) -> &str;

    /// Description sent to the model to help it decide when to call the tool.
    fn description(&self) -> &str;

    /// JSON schema of the accepted arguments.
    fn parameters(&self) -> Value;

    fn category(&self) -> ToolCategory;

    /// Whether the tool can only run with `ToolContext::project_id` set.
    ///
    /// The registry refuses to run such a tool without a project; that is a
    /// caller bug, not something the model can recover from.
    fn requires_project(&self) -> bool {
        false
    }

    /// Execute the tool with the given arguments.
    ///
    /// An `Err` is reported back to the model as a failure result; it does
    /// not end the run.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput>;
}

/// Context provided to tools during execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Project whose files the file tools operate on
    pub project_id: Option<String>,
    /// Conversation the run is answering
    pub conversation_id: Option<String>,
}

impl ToolContext {
    /// Create a new empty tool context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope file tools to a project.
    ///
    /// # Example
    /// ```
    /// use helmsman::tools::ToolContext;
    ///
    /// let ctx = ToolContext::new().with_project("proj_1");
    /// assert_eq!(ctx.project_id.as_deref(), Some("proj_1"));
    /// ```
    pub fn with_project(mut self, project_id: &str) -> Self {
        self.project_id = Some(project_id.to_string());
        self
    }

    pub fn with_conversation(mut self, conversation_id: &str) -> Self {
        self.conversation_id = Some(conversation_id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_context_builder_chain() {
        let ctx = ToolContext::new()
            .with_project("p1")
            .with_conversation("c1");
        assert_eq!(ctx.project_id.as_deref(), Some("p1"));
        assert_eq!(ctx.conversation_id.as_deref(), Some("c1"));
        assert!(ToolContext::default().project_id.is_none());
    }

    #[test]
    fn test_tool_output_rendering() {
        let failure = ToolOutput::failure("File not found: a.rs");
        assert!(failure.is_error());
        let rendered: Value = serde_json::from_str(&failure.for_llm()).unwrap();
        assert_eq!(rendered["success"], false);
        assert_eq!(rendered["error"], "File not found: a.rs");

        let success = ToolOutput::success(json!({"path": "a.rs"}));
        assert!(!success.is_error());
        let rendered: Value = serde_json::from_str(&success.for_llm()).unwrap();
        assert_eq!(rendered["data"]["path"], "a.rs");
    }

    #[test]
    fn test_tool_category_display() {
        assert_eq!(ToolCategory::FilesystemRead.to_string(), "filesystem_read");
        assert_eq!(
            serde_json::to_string(&ToolCategory::NetworkRead).unwrap(),
            "\"network_read\""
        );
    }
}
