//! Tools module - capabilities the coding agent can call
//!
//! - `Tool` trait: the interface every capability implements
//! - `ToolContext`: execution context (project, conversation)
//! - `ToolOutput`: plain text or a structured `{success, data | error}` result
//! - `ToolRegistry`: lookup, definitions for the provider, and execution that
//!   turns tool failures into results the model can read
//!
//! # Built-in Tools
//!
//! - `list_files`, `read_files`, `write_file`, `create_folder`,
//!   `rename_file`, `delete_files`: project files through a `FileStore`
//! - `fetch_urls`: readable text of web pages
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use helmsman::store::InMemoryStore;
//! use helmsman::tools::{ToolContext, ToolRegistry};
//! use helmsman::tools::filesystem::file_tools;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let mut registry = ToolRegistry::new();
//! for tool in file_tools(Arc::new(InMemoryStore::new())) {
//!     registry.register(tool);
//! }
//!
//! let ctx = ToolContext::new().with_project("proj_1");
//! let output = registry
//!     .execute_with_context("write_file", json!({"path": "a.txt", "content": "hi"}), &ctx)
//!     .await
//!     .unwrap();
//! assert!(!output.is_error());
//! # });
//! ```

pub mod filesystem;
mod registry;
mod types;
pub mod web;

use std::sync::Arc;

use crate::config::ToolsConfig;
use crate::store::FileStore;

pub use registry::ToolRegistry;
pub use types::{Tool, ToolCategory, ToolContext, ToolOutput};

/// Registry with every built-in tool of the coding agent.
pub fn coding_tools(store: Arc<dyn FileStore>, config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in filesystem::file_tools(store) {
        registry.register(tool);
    }
    registry.register(Box::new(
        web::FetchUrlsTool::new()
            .with_max_chars(config.fetch_max_chars)
            .with_max_urls(config.fetch_max_urls),
    ));
    registry
}
