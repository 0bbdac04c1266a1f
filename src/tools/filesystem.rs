//! Project file tools for Helmsman
//!
//! These tools operate on the files of the project bound to the run
//! (`ToolContext::project_id`) through a [`FileStore`]. Paths are
//! project-relative and `/`-separated; `..` segments are rejected.
//!
//! Every mutating tool is an upsert or an idempotent delete, so a step that
//! is executed twice leaves the project in the same state.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{HelmError, Result};
use crate::store::{normalize_path, FileStore};

use super::{Tool, ToolCategory, ToolContext, ToolOutput};

/// Upper bound on paths accepted by the multi-file tools in one call.
const MAX_PATHS_PER_CALL: usize = 20;

fn project_id(ctx: &ToolContext) -> Result<&str> {
    ctx.project_id
        .as_deref()
        .ok_or_else(|| HelmError::ToolContext("No project bound to this run".to_string()))
}

fn string_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| HelmError::Tool(format!("Missing '{}' argument", key)))
}

fn checked_path(path: &str) -> Result<String> {
    normalize_path(path)
        .ok_or_else(|| HelmError::SecurityViolation(format!("Invalid project path: '{}'", path)))
}

fn path_list_arg(args: &Value, key: &str) -> Result<Vec<String>> {
    let items = args
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| HelmError::Tool(format!("Missing '{}' argument", key)))?;
    if items.is_empty() {
        return Err(HelmError::Tool(format!("'{}' must not be empty", key)));
    }
    if items.len() > MAX_PATHS_PER_CALL {
        return Err(HelmError::Tool(format!(
            "At most {} paths per call",
            MAX_PATHS_PER_CALL
        )));
    }
    items
        .iter()
        .map(|v| {
            v.as_str()
                .ok_or_else(|| HelmError::Tool(format!("'{}' must be a list of strings", key)))
                .and_then(checked_path)
        })
        .collect()
}

/// Lists every file and folder in the project.
pub struct ListFilesTool {
    store: Arc<dyn FileStore>,
}

impl ListFilesTool {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List all files and folders in the project. Optionally restrict to a folder."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "folder": {
                    "type": "string",
                    "description": "Only list entries under this folder"
                }
            }
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::FilesystemRead
    }

    fn requires_project(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let project = project_id(ctx)?;
        let folder = match args.get("folder").and_then(Value::as_str) {
            Some(f) if !f.trim().is_empty() => Some(checked_path(f)?),
            _ => None,
        };

        let entries: Vec<Value> = self
            .store
            .list_files(project)
            .await?
            .into_iter()
            .filter(|f| match &folder {
                Some(prefix) => f.path.starts_with(&format!("{}/", prefix)),
                None => true,
            })
            .map(|f| json!({ "path": f.path, "type": f.kind }))
            .collect();

        Ok(ToolOutput::success(json!(entries)))
    }
}

/// Reads one or more files.
pub struct ReadFilesTool {
    store: Arc<dyn FileStore>,
}

impl ReadFilesTool {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadFilesTool {
    fn name(&self) -> &str {
        "read_files"
    }

    fn description(&self) -> &str {
        "Read the contents of one or more project files."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "paths": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Project-relative file paths"
                }
            },
            "required": ["paths"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::FilesystemRead
    }

    fn requires_project(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let project = project_id(ctx)?;
        let paths = path_list_arg(&args, "paths")?;

        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let entry = match self.store.read_file(project, &path).await? {
                Some(file) if file.is_folder() => {
                    json!({ "path": path, "error": "Path is a folder" })
                }
                Some(file) => json!({ "path": path, "content": file.content.unwrap_or_default() }),
                None => json!({ "path": path, "error": "File not found" }),
            };
            results.push(entry);
        }

        Ok(ToolOutput::success(json!(results)))
    }
}

/// Creates a file or overwrites its content.
pub struct WriteFileTool {
    store: Arc<dyn FileStore>,
}

impl WriteFileTool {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create a file or replace its entire content. Missing parent folders are created."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Project-relative file path" },
                "content": { "type": "string", "description": "Full new file content" }
            },
            "required": ["path", "content"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::FilesystemWrite
    }

    fn requires_project(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let project = project_id(ctx)?;
        let path = checked_path(string_arg(&args, "path")?)?;
        let content = string_arg(&args, "content")?;

        self.store.upsert_file(project, &path, content).await?;

        Ok(ToolOutput::success(
            json!({ "path": path, "bytes": content.len() }),
        ))
    }
}

/// Creates a folder (and its parents).
pub struct CreateFolderTool {
    store: Arc<dyn FileStore>,
}

impl CreateFolderTool {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateFolderTool {
    fn name(&self) -> &str {
        "create_folder"
    }

    fn description(&self) -> &str {
        "Create a folder in the project. Succeeds if it already exists."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Project-relative folder path" }
            },
            "required": ["path"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::FilesystemWrite
    }

    fn requires_project(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let project = project_id(ctx)?;
        let path = checked_path(string_arg(&args, "path")?)?;
        self.store.create_folder(project, &path).await?;
        Ok(ToolOutput::success(json!({ "path": path })))
    }
}

/// Renames or moves a file or folder.
pub struct RenameFileTool {
    store: Arc<dyn FileStore>,
}

impl RenameFileTool {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RenameFileTool {
    fn name(&self) -> &str {
        "rename_file"
    }

    fn description(&self) -> &str {
        "Rename or move a file or folder within the project."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "from": { "type": "string", "description": "Current path" },
                "to": { "type": "string", "description": "New path" }
            },
            "required": ["from", "to"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::FilesystemWrite
    }

    fn requires_project(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let project = project_id(ctx)?;
        let from = checked_path(string_arg(&args, "from")?)?;
        let to = checked_path(string_arg(&args, "to")?)?;

        // A repeated move whose source is gone but destination exists already happened.
        if self.store.read_file(project, &from).await?.is_none()
            && self.store.read_file(project, &to).await?.is_some()
        {
            return Ok(ToolOutput::success(json!({ "from": from, "to": to })));
        }

        self.store.rename_file(project, &from, &to).await?;
        Ok(ToolOutput::success(json!({ "from": from, "to": to })))
    }
}

/// Deletes files or folders.
pub struct DeleteFilesTool {
    store: Arc<dyn FileStore>,
}

impl DeleteFilesTool {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteFilesTool {
    fn name(&self) -> &str {
        "delete_files"
    }

    fn description(&self) -> &str {
        "Delete one or more files or folders (folders are deleted with their contents)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "paths": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Project-relative paths to delete"
                }
            },
            "required": ["paths"]
        })
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::FilesystemWrite
    }

    fn requires_project(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let project = project_id(ctx)?;
        let paths = path_list_arg(&args, "paths")?;

        let mut deleted = Vec::new();
        let mut missing = Vec::new();
        for path in paths {
            if self.store.delete_file(project, &path).await? {
                deleted.push(path);
            } else {
                missing.push(path);
            }
        }

        Ok(ToolOutput::success(
            json!({ "deleted": deleted, "missing": missing }),
        ))
    }
}

/// All project file tools backed by `store`.
pub fn file_tools(store: Arc<dyn FileStore>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(ListFilesTool::new(Arc::clone(&store))),
        Box::new(ReadFilesTool::new(Arc::clone(&store))),
        Box::new(WriteFileTool::new(Arc::clone(&store))),
        Box::new(CreateFolderTool::new(Arc::clone(&store))),
        Box::new(RenameFileTool::new(Arc::clone(&store))),
        Box::new(DeleteFilesTool::new(store)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn ctx() -> ToolContext {
        ToolContext::new().with_project("p1")
    }

    async fn store_with_files() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.upsert_file("p1", "src/main.rs", "fn main() {}").await.unwrap();
        store.upsert_file("p1", "README.md", "# demo").await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_list_files_tool() {
        let store = store_with_files().await;
        let tool = ListFilesTool::new(store);

        let output = tool.execute(json!({}), &ctx()).await.unwrap();
        let ToolOutput::Success(entries) = output else {
            panic!("expected success");
        };
        let paths: Vec<&str> = entries
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["README.md", "src", "src/main.rs"]);

        let output = tool.execute(json!({"folder": "src"}), &ctx()).await.unwrap();
        assert!(output.for_llm().contains("src/main.rs"));
        assert!(!output.for_llm().contains("README.md"));
    }

    #[tokio::test]
    async fn test_read_files_reports_missing_inline() {
        let store = store_with_files().await;
        let tool = ReadFilesTool::new(store);

        let output = tool
            .execute(json!({"paths": ["src/main.rs", "nope.rs", "src"]}), &ctx())
            .await
            .unwrap();
        let ToolOutput::Success(results) = output else {
            panic!("expected success");
        };
        assert_eq!(results[0]["content"], "fn main() {}");
        assert_eq!(results[1]["error"], "File not found");
        assert_eq!(results[2]["error"], "Path is a folder");
    }

    #[tokio::test]
    async fn test_read_files_missing_paths_argument() {
        let tool = ReadFilesTool::new(Arc::new(InMemoryStore::new()));
        let err = tool.execute(json!({}), &ctx()).await.unwrap_err();
        assert!(err.to_string().contains("Missing 'paths' argument"));
    }

    #[tokio::test]
    async fn test_write_file_twice_is_upsert() {
        let store = Arc::new(InMemoryStore::new());
        let tool = WriteFileTool::new(store.clone());
        let args = json!({"path": "src/lib.rs", "content": "pub fn a() {}"});

        tool.execute(args.clone(), &ctx()).await.unwrap();
        tool.execute(args, &ctx()).await.unwrap();

        let files = store.list_files("p1").await.unwrap();
        assert_eq!(files.len(), 2);
        let file = store.read_file("p1", "src/lib.rs").await.unwrap().unwrap();
        assert_eq!(file.content.as_deref(), Some("pub fn a() {}"));
    }

    #[tokio::test]
    async fn test_write_file_rejects_traversal() {
        let tool = WriteFileTool::new(Arc::new(InMemoryStore::new()));
        let err = tool
            .execute(json!({"path": "../etc/passwd", "content": "x"}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, HelmError::SecurityViolation(_)));
    }

    #[tokio::test]
    async fn test_create_folder_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let tool = CreateFolderTool::new(store.clone());
        tool.execute(json!({"path": "assets/img"}), &ctx()).await.unwrap();
        tool.execute(json!({"path": "assets/img"}), &ctx()).await.unwrap();
        assert_eq!(store.list_files("p1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rename_file_repeat_is_noop() {
        let store = store_with_files().await;
        let tool = RenameFileTool::new(store.clone());
        let args = json!({"from": "README.md", "to": "docs/README.md"});

        tool.execute(args.clone(), &ctx()).await.unwrap();
        let again = tool.execute(args, &ctx()).await.unwrap();

        assert!(!again.is_error());
        assert!(store.read_file("p1", "docs/README.md").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_files_reports_missing() {
        let store = store_with_files().await;
        let tool = DeleteFilesTool::new(store);
        let output = tool
            .execute(json!({"paths": ["README.md", "ghost.md"]}), &ctx())
            .await
            .unwrap();
        let ToolOutput::Success(summary) = output else {
            panic!("expected success");
        };
        assert_eq!(summary["deleted"], json!(["README.md"]));
        assert_eq!(summary["missing"], json!(["ghost.md"]));
    }

    #[tokio::test]
    async fn test_tools_without_project_fail() {
        let tool = ListFilesTool::new(Arc::new(InMemoryStore::new()));
        let err = tool.execute(json!({}), &ToolContext::new()).await.unwrap_err();
        assert!(matches!(err, HelmError::ToolContext(_)));
    }

    #[test]
    fn test_file_tools_names() {
        let tools = file_tools(Arc::new(InMemoryStore::new()));
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "list_files",
                "read_files",
                "write_file",
                "create_folder",
                "rename_file",
                "delete_files"
            ]
        );
        assert!(tools.iter().all(|t| t.requires_project()));
    }
}
