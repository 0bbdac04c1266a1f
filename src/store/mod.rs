//! Store module - persistence collaborators
//!
//! The engine never owns conversation or project state. It reads and
//! requests single-field upserts through two narrow traits:
//!
//! - [`ConversationStore`]: conversation snapshot, recent history, title and
//!   message-content updates
//! - [`FileStore`]: project files used by the file tools
//!
//! [`InMemoryStore`] implements both for local runs and tests;
//! [`RemoteStore`] talks to a query/mutation HTTP API.

pub mod memory;
pub mod remote;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::InMemoryStore;
pub use remote::RemoteStore;
pub use types::{
    normalize_path, ConversationSnapshot, FileKind, HistoryEntry, HistoryRole, ProjectFile,
    DEFAULT_CONVERSATION_TITLE,
};

/// Conversation persistence as consumed by the job controller.
///
/// Writes are keyed upserts: repeating one with the same value leaves the
/// stored state unchanged.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get_conversation_by_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationSnapshot>>;

    /// Up to `limit` most recent messages, oldest first.
    async fn get_recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>>;

    async fn update_conversation_title(&self, conversation_id: &str, title: &str) -> Result<()>;

    async fn update_message_content(&self, message_id: &str, content: &str) -> Result<()>;
}

/// Project file persistence as consumed by the file tools.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Every file and folder in the project, sorted by path.
    async fn list_files(&self, project_id: &str) -> Result<Vec<ProjectFile>>;

    async fn read_file(&self, project_id: &str, path: &str) -> Result<Option<ProjectFile>>;

    /// Create or overwrite a file. Missing parent folders are created.
    async fn upsert_file(&self, project_id: &str, path: &str, content: &str) -> Result<()>;

    /// Create a folder if it does not exist yet.
    async fn create_folder(&self, project_id: &str, path: &str) -> Result<()>;

    /// Move a file or folder (and everything under it).
    async fn rename_file(&self, project_id: &str, from: &str, to: &str) -> Result<()>;

    /// Delete a file or folder. Returns `false` if nothing was there.
    async fn delete_file(&self, project_id: &str, path: &str) -> Result<bool>;
}
