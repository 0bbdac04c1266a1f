//! Tool registry for Helmsman
//!
//! This module provides the `ToolRegistry` struct for managing and executing
//! tools. Tools can be registered, looked up by name, and executed with
//! context.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{HelmError, Result};
use crate::providers::ToolDefinition;

use super::{Tool, ToolContext, ToolOutput};

/// A registry that holds and manages tools.
///
/// Failures of an individual tool never escape the registry: they come back
/// as [`ToolOutput::Failure`] so the agent can show them to the model. The
/// only error `execute_with_context` returns is a miscall
/// ([`HelmError::ToolContext`]) or a cancellation raised by a tool.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        info!(tool = %name, category = %tool.category(), "Registering tool");
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Execute a tool by name with a specific context.
    ///
    /// # Example
    /// ```
    /// use helmsman::tools::{ToolContext, ToolRegistry};
    /// use serde_json::json;
    ///
    /// # tokio_test::block_on(async {
    /// let registry = ToolRegistry::new();
    /// let output = registry
    ///     .execute_with_context("missing", json!({}), &ToolContext::new())
    ///     .await
    ///     .unwrap();
    /// assert!(output.is_error());
    /// # });
    /// ```
    pub async fn execute_with_context(
        &self,
        name: &str,
        args: Value,
        ctx: &ToolContext,
    ) -> Result<ToolOutput> {
        let tool = match self.tools.get(name) {
            Some(t) => t,
            None => {
                warn!(tool = name, "Model requested unknown tool");
                return Ok(ToolOutput::failure(format!("Tool not found: {}", name)));
            }
        };

        if tool.requires_project() && ctx.project_id.is_none() {
            return Err(HelmError::ToolContext(format!(
                "Tool '{}' requires a project id in its context",
                name
            )));
        }

        let start = Instant::now();

        match tool.execute(args, ctx).await {
            Ok(output) => {
                info!(
                    tool = name,
                    category = %tool.category(),
                    is_error = output.is_error(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool executed"
                );
                Ok(output)
            }
            Err(e @ (HelmError::Cancelled(_) | HelmError::ToolContext(_))) => Err(e),
            Err(e) => {
                warn!(
                    tool = name,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool execution failed"
                );
                Ok(ToolOutput::failure(e.to_string()))
            }
        }
    }

    /// Tool definitions for the provider, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition::new(t.name(), t.description(), t.parameters()))
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolCategory;
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the message back"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {"message": {"type": "string"}}})
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::NetworkRead
        }
        async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
            match args.get("message").and_then(Value::as_str) {
                Some(m) => Ok(ToolOutput::text(m)),
                None => Err(HelmError::Tool("Missing 'message' parameter".into())),
            }
        }
    }

    struct ProjectScoped;

    #[async_trait]
    impl Tool for ProjectScoped {
        fn name(&self) -> &str {
            "scoped"
        }
        fn description(&self) -> &str {
            "Needs a project"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::FilesystemRead
        }
        fn requires_project(&self) -> bool {
            true
        }
        async fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
            Ok(ToolOutput::text(ctx.project_id.clone().unwrap_or_default()))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(Echo));
        registry.register(Box::new(ProjectScoped));
        registry
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.has("echo"));
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["echo", "scoped"]);
    }

    #[test]
    fn test_definitions_sorted() {
        let defs = registry().definitions();
        assert_eq!(defs[0].name, "echo");
        assert_eq!(defs[1].name, "scoped");
    }

    #[tokio::test]
    async fn test_execute_success() {
        let output = registry()
            .execute_with_context("echo", json!({"message": "hi"}), &ToolContext::new())
            .await
            .unwrap();
        assert_eq!(output, ToolOutput::text("hi"));
    }

    #[tokio::test]
    async fn test_tool_error_becomes_failure_output() {
        let output = registry()
            .execute_with_context("echo", json!({}), &ToolContext::new())
            .await
            .unwrap();
        assert!(output.is_error());
        assert!(output.for_llm().contains("Missing 'message' parameter"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_failure_output() {
        let output = registry()
            .execute_with_context("nope", json!({}), &ToolContext::new())
            .await
            .unwrap();
        assert_eq!(output, ToolOutput::failure("Tool not found: nope"));
    }

    #[tokio::test]
    async fn test_missing_project_is_fatal() {
        let err = registry()
            .execute_with_context("scoped", json!({}), &ToolContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HelmError::ToolContext(_)));

        let ok = registry()
            .execute_with_context("scoped", json!({}), &ToolContext::new().with_project("p9"))
            .await
            .unwrap();
        assert_eq!(ok, ToolOutput::text("p9"));
    }
}
