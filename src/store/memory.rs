//! In-process store used by `helmsman run` and the test suites.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{HelmError, Result};

use super::types::{normalize_path, ConversationSnapshot, HistoryEntry, ProjectFile};
use super::{ConversationStore, FileStore};

/// Conversation and project state held in memory.
///
/// Every write is an upsert keyed by id or path. `write_count` counts the
/// write calls received so tests can tell "written twice with the same
/// value" apart from "never written".
#[derive(Debug, Default)]
pub struct InMemoryStore {
    conversations: RwLock<HashMap<String, ConversationSnapshot>>,
    messages: RwLock<HashMap<String, Vec<HistoryEntry>>>,
    projects: RwLock<HashMap<String, BTreeMap<String, ProjectFile>>>,
    writes: AtomicUsize,
}

fn bad_path(path: &str) -> HelmError {
    HelmError::Store(format!("Invalid path: {}", path))
}

/// Folder paths above `path`, outermost first.
fn ancestors(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').collect();
    (1..segments.len())
        .map(|n| segments[..n].join("/"))
        .collect()
}

fn is_under(candidate: &str, root: &str) -> bool {
    candidate == root
        || (candidate.starts_with(root) && candidate.as_bytes().get(root.len()) == Some(&b'/'))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_conversation(&self, snapshot: ConversationSnapshot) {
        self.conversations
            .write()
            .await
            .insert(snapshot.conversation_id.clone(), snapshot);
    }

    /// Append a message to a conversation's history.
    pub async fn insert_message(&self, conversation_id: &str, entry: HistoryEntry) {
        let mut messages = self.messages.write().await;
        let history = messages.entry(conversation_id.to_string()).or_default();
        history.push(entry);
        history.sort_by_key(|e| e.sequence);
    }

    pub async fn conversation(&self, conversation_id: &str) -> Option<ConversationSnapshot> {
        self.conversations.read().await.get(conversation_id).cloned()
    }

    /// Current content of a stored message.
    pub async fn message_content(&self, message_id: &str) -> Option<String> {
        self.messages
            .read()
            .await
            .values()
            .flatten()
            .find(|e| e.id == message_id)
            .map(|e| e.content.clone())
    }

    /// Number of messages stored for a conversation.
    pub async fn message_count(&self, conversation_id: &str) -> usize {
        self.messages
            .read()
            .await
            .get(conversation_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn get_conversation_by_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationSnapshot>> {
        Ok(self.conversation(conversation_id).await)
    }

    async fn get_recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let messages = self.messages.read().await;
        let history = messages.get(conversation_id).cloned().unwrap_or_default();
        let skip = history.len().saturating_sub(limit);
        Ok(history.into_iter().skip(skip).collect())
    }

    async fn update_conversation_title(&self, conversation_id: &str, title: &str) -> Result<()> {
        self.record_write();
        let mut conversations = self.conversations.write().await;
        let snapshot = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| HelmError::NotFound(format!("Conversation {}", conversation_id)))?;
        *snapshot = ConversationSnapshot::new(conversation_id, title);
        Ok(())
    }

    async fn update_message_content(&self, message_id: &str, content: &str) -> Result<()> {
        self.record_write();
        let mut messages = self.messages.write().await;
        let entry = messages
            .values_mut()
            .flatten()
            .find(|e| e.id == message_id)
            .ok_or_else(|| HelmError::NotFound(format!("Message {}", message_id)))?;
        entry.content = content.to_string();
        Ok(())
    }
}

#[async_trait]
impl FileStore for InMemoryStore {
    async fn list_files(&self, project_id: &str) -> Result<Vec<ProjectFile>> {
        Ok(self
            .projects
            .read()
            .await
            .get(project_id)
            .map(|files| files.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn read_file(&self, project_id: &str, path: &str) -> Result<Option<ProjectFile>> {
        let path = normalize_path(path).ok_or_else(|| bad_path(path))?;
        Ok(self
            .projects
            .read()
            .await
            .get(project_id)
            .and_then(|files| files.get(&path).cloned()))
    }

    async fn upsert_file(&self, project_id: &str, path: &str, content: &str) -> Result<()> {
        let path = normalize_path(path).ok_or_else(|| bad_path(path))?;
        self.record_write();
        let mut projects = self.projects.write().await;
        let files = projects.entry(project_id.to_string()).or_default();

        if files.get(&path).is_some_and(ProjectFile::is_folder) {
            return Err(HelmError::Store(format!("{} is a folder", path)));
        }
        for folder in ancestors(&path) {
            match files.get(&folder) {
                Some(existing) if !existing.is_folder() => {
                    return Err(HelmError::Store(format!("{} is a file", folder)));
                }
                Some(_) => {}
                None => {
                    files.insert(folder.clone(), ProjectFile::folder(&folder));
                }
            }
        }
        files.insert(path.clone(), ProjectFile::file(&path, content));
        Ok(())
    }

    async fn create_folder(&self, project_id: &str, path: &str) -> Result<()> {
        let path = normalize_path(path).ok_or_else(|| bad_path(path))?;
        self.record_write();
        let mut projects = self.projects.write().await;
        let files = projects.entry(project_id.to_string()).or_default();

        let mut chain = ancestors(&path);
        chain.push(path);
        for folder in chain {
            match files.get(&folder) {
                Some(existing) if !existing.is_folder() => {
                    return Err(HelmError::Store(format!("{} is a file", folder)));
                }
                Some(_) => {}
                None => {
                    files.insert(folder.clone(), ProjectFile::folder(&folder));
                }
            }
        }
        Ok(())
    }

    async fn rename_file(&self, project_id: &str, from: &str, to: &str) -> Result<()> {
        let from = normalize_path(from).ok_or_else(|| bad_path(from))?;
        let to = normalize_path(to).ok_or_else(|| bad_path(to))?;
        if from == to {
            return Ok(());
        }
        if is_under(&to, &from) {
            return Err(HelmError::Store(format!("Cannot move {} into itself", from)));
        }

        self.record_write();
        let mut projects = self.projects.write().await;
        let files = projects
            .get_mut(project_id)
            .ok_or_else(|| HelmError::NotFound(from.clone()))?;
        if !files.contains_key(&from) {
            return Err(HelmError::NotFound(from));
        }
        if files.contains_key(&to) {
            return Err(HelmError::Store(format!("{} already exists", to)));
        }

        let moved: Vec<String> = files
            .keys()
            .filter(|p| is_under(p, &from))
            .cloned()
            .collect();
        for old in moved {
            if let Some(mut file) = files.remove(&old) {
                let new_path = format!("{}{}", to, &old[from.len()..]);
                file.path = new_path.clone();
                files.insert(new_path, file);
            }
        }
        for folder in ancestors(&to) {
            files
                .entry(folder.clone())
                .or_insert_with(|| ProjectFile::folder(&folder));
        }
        Ok(())
    }

    async fn delete_file(&self, project_id: &str, path: &str) -> Result<bool> {
        let path = normalize_path(path).ok_or_else(|| bad_path(path))?;
        self.record_write();
        let mut projects = self.projects.write().await;
        let Some(files) = projects.get_mut(project_id) else {
            return Ok(false);
        };
        let before = files.len();
        files.retain(|p, _| !is_under(p, &path));
        Ok(files.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{HistoryRole, DEFAULT_CONVERSATION_TITLE};

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_conversation(ConversationSnapshot::new("c1", DEFAULT_CONVERSATION_TITLE))
            .await;
        for n in 1..=12u64 {
            let role = if n % 2 == 1 {
                HistoryRole::User
            } else {
                HistoryRole::Assistant
            };
            store
                .insert_message("c1", HistoryEntry::new(&format!("m{n}"), role, "text", n))
                .await;
        }
        store
    }

    #[tokio::test]
    async fn test_recent_messages_bounded_oldest_first() {
        let store = seeded().await;
        let recent = store.get_recent_messages("c1", 10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first().unwrap().id, "m3");
        assert_eq!(recent.last().unwrap().id, "m12");
    }

    #[tokio::test]
    async fn test_missing_conversation_is_none() {
        let store = InMemoryStore::new();
        assert!(store.get_conversation_by_id("nope").await.unwrap().is_none());
        assert!(store.get_recent_messages("nope", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_message_content_is_upsert() {
        let store = seeded().await;
        store.update_message_content("m12", "answer").await.unwrap();
        store.update_message_content("m12", "answer").await.unwrap();

        assert_eq!(store.message_content("m12").await.as_deref(), Some("answer"));
        assert_eq!(store.message_count("c1").await, 12);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_update_unknown_message_is_not_found() {
        let store = seeded().await;
        let err = store.update_message_content("ghost", "x").await.unwrap_err();
        assert!(matches!(err, HelmError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_title_clears_default_flag() {
        let store = seeded().await;
        store.update_conversation_title("c1", "Login bug").await.unwrap();
        let snapshot = store.conversation("c1").await.unwrap();
        assert_eq!(snapshot.title, "Login bug");
        assert!(!snapshot.is_default_title);
    }

    #[tokio::test]
    async fn test_upsert_file_creates_parents_and_overwrites() {
        let store = InMemoryStore::new();
        store.upsert_file("p1", "src/lib/mod.rs", "v1").await.unwrap();
        store.upsert_file("p1", "/src/lib/mod.rs", "v2").await.unwrap();

        let paths: Vec<String> = store
            .list_files("p1")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(paths, vec!["src", "src/lib", "src/lib/mod.rs"]);

        let file = store.read_file("p1", "src/lib/mod.rs").await.unwrap().unwrap();
        assert_eq!(file.content.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_upsert_over_folder_fails() {
        let store = InMemoryStore::new();
        store.create_folder("p1", "src").await.unwrap();
        assert!(store.upsert_file("p1", "src", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_rename_moves_children() {
        let store = InMemoryStore::new();
        store.upsert_file("p1", "old/a.rs", "a").await.unwrap();
        store.upsert_file("p1", "old/b.rs", "b").await.unwrap();
        store.upsert_file("p1", "older.rs", "c").await.unwrap();

        store.rename_file("p1", "old", "new").await.unwrap();

        assert!(store.read_file("p1", "new/a.rs").await.unwrap().is_some());
        assert!(store.read_file("p1", "old/a.rs").await.unwrap().is_none());
        assert!(store.read_file("p1", "older.rs").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rename_into_itself_rejected() {
        let store = InMemoryStore::new();
        store.create_folder("p1", "a").await.unwrap();
        assert!(store.rename_file("p1", "a", "a/b").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryStore::new();
        store.upsert_file("p1", "dir/x.rs", "x").await.unwrap();
        assert!(store.delete_file("p1", "dir").await.unwrap());
        assert!(!store.delete_file("p1", "dir").await.unwrap());
        assert!(store.list_files("p1").await.unwrap().is_empty());
    }
}
