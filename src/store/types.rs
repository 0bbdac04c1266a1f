//! Records exchanged with the persistence store.

use serde::{Deserialize, Serialize};

/// Title given to a conversation before anything has been said in it.
pub const DEFAULT_CONVERSATION_TITLE: &str = "New conversation";

/// Conversation state read once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    pub conversation_id: String,
    pub title: String,
    pub is_default_title: bool,
}

impl ConversationSnapshot {
    /// Build a snapshot, deriving `is_default_title` from the title.
    pub fn new(conversation_id: &str, title: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            title: title.to_string(),
            is_default_title: title == DEFAULT_CONVERSATION_TITLE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

impl HistoryRole {
    /// Upper-case label used when rendering history into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            HistoryRole::User => "USER",
            HistoryRole::Assistant => "ASSISTANT",
        }
    }
}

/// One stored conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub role: HistoryRole,
    pub content: String,
    pub sequence: u64,
}

impl HistoryEntry {
    pub fn new(id: &str, role: HistoryRole, content: &str, sequence: u64) -> Self {
        Self {
            id: id.to_string(),
            role,
            content: content.to_string(),
            sequence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

/// A file or folder inside a project, addressed by its `/`-separated path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub path: String,
    pub kind: FileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ProjectFile {
    pub fn file(path: &str, content: &str) -> Self {
        Self {
            path: path.to_string(),
            kind: FileKind::File,
            content: Some(content.to_string()),
        }
    }

    pub fn folder(path: &str) -> Self {
        Self {
            path: path.to_string(),
            kind: FileKind::Folder,
            content: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }
}

/// Normalise a project path: no leading/trailing slashes, no empty or `.`
/// segments. Returns `None` for paths that are empty or climb with `..`.
pub fn normalize_path(path: &str) -> Option<String> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment.trim() {
            "" | "." => continue,
            ".." => return None,
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
