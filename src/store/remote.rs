//! HTTP store client.
//!
//! Talks to a query/mutation API of the shape
//! `POST {base_url}/api/{query|mutation}` with body
//! `{"path": "system:fnName", "args": {...}, "format": "json"}` and replies
//! `{"status": "success", "value": ...}` or
//! `{"status": "error", "errorMessage": "..."}`. The internal credential is
//! sent as `internalKey` inside `args` on every call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{HelmError, Result};

use super::types::{ConversationSnapshot, FileKind, HistoryEntry, HistoryRole, ProjectFile};
use super::{ConversationStore, FileStore};

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy)]
enum CallKind {
    Query,
    Mutation,
}

impl CallKind {
    fn endpoint(&self) -> &'static str {
        match self {
            CallKind::Query => "query",
            CallKind::Mutation => "mutation",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum ApiReply {
    Success {
        #[serde(default)]
        value: Value,
    },
    Error {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

#[derive(Debug, Deserialize)]
struct RemoteConversation {
    #[serde(rename = "_id")]
    id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct RemoteMessage {
    #[serde(rename = "_id")]
    id: String,
    role: HistoryRole,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    path: String,
    #[serde(rename = "type")]
    kind: FileKind,
    #[serde(default)]
    content: Option<String>,
}

impl From<RemoteFile> for ProjectFile {
    fn from(file: RemoteFile) -> Self {
        ProjectFile {
            path: file.path,
            kind: file.kind,
            content: file.content,
        }
    }
}

/// Store backed by the remote query/mutation API.
pub struct RemoteStore {
    base_url: String,
    internal_key: String,
    client: Client,
}

impl RemoteStore {
    /// Create a client for `base_url` authenticated with `internal_key`.
    pub fn new(base_url: &str, internal_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(base_url, internal_key, client))
    }

    pub fn with_client(base_url: &str, internal_key: &str, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            internal_key: internal_key.to_string(),
            client,
        }
    }

    fn request_body(&self, path: &str, args: Value) -> Value {
        let mut args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        args.insert(
            "internalKey".to_string(),
            Value::String(self.internal_key.clone()),
        );
        json!({ "path": path, "args": args, "format": "json" })
    }

    async fn call(&self, kind: CallKind, path: &str, args: Value) -> Result<Value> {
        let url = format!("{}/api/{}", self.base_url, kind.endpoint());
        debug!(path = path, kind = kind.endpoint(), "Store call");

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(path, args))
            .send()
            .await
            .map_err(|e| HelmError::Store(format!("{} request failed: {}", path, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HelmError::Store(format!("{} body unreadable: {}", path, e)))?;

        let reply: ApiReply = serde_json::from_str(&text).map_err(|_| {
            HelmError::Store(format!("{} failed with HTTP {}: {}", path, status, text))
        })?;

        match reply {
            ApiReply::Success { value } => Ok(value),
            ApiReply::Error { error_message } => {
                Err(HelmError::Store(format!("{}: {}", path, error_message)))
            }
        }
    }

    async fn query<T: DeserializeOwned>(&self, path: &str, args: Value) -> Result<T> {
        let value = self.call(CallKind::Query, path, args).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn mutation(&self, path: &str, args: Value) -> Result<Value> {
        self.call(CallKind::Mutation, path, args).await
    }
}

#[async_trait]
impl ConversationStore for RemoteStore {
    async fn get_conversation_by_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationSnapshot>> {
        let conversation: Option<RemoteConversation> = self
            .query(
                "system:getConversationById",
                json!({ "conversationId": conversation_id }),
            )
            .await?;
        Ok(conversation.map(|c| ConversationSnapshot::new(&c.id, &c.title)))
    }

    async fn get_recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let messages: Vec<RemoteMessage> = self
            .query(
                "system:getRecentMessages",
                json!({ "conversationId": conversation_id, "limit": limit }),
            )
            .await?;
        Ok(messages
            .into_iter()
            .enumerate()
            .map(|(i, m)| HistoryEntry::new(&m.id, m.role, &m.content, i as u64))
            .collect())
    }

    async fn update_conversation_title(&self, conversation_id: &str, title: &str) -> Result<()> {
        self.mutation(
            "system:updateConversationTitle",
            json!({ "conversationId": conversation_id, "title": title }),
        )
        .await?;
        Ok(())
    }

    async fn update_message_content(&self, message_id: &str, content: &str) -> Result<()> {
        self.mutation(
            "system:updateMessageContent",
            json!({ "messageId": message_id, "content": content }),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl FileStore for RemoteStore {
    async fn list_files(&self, project_id: &str) -> Result<Vec<ProjectFile>> {
        let files: Vec<RemoteFile> = self
            .query("system:getProjectFiles", json!({ "projectId": project_id }))
            .await?;
        let mut files: Vec<ProjectFile> = files.into_iter().map(ProjectFile::from).collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    async fn read_file(&self, project_id: &str, path: &str) -> Result<Option<ProjectFile>> {
        let file: Option<RemoteFile> = self
            .query(
                "system:getFileByPath",
                json!({ "projectId": project_id, "path": path }),
            )
            .await?;
        Ok(file.map(ProjectFile::from))
    }

    async fn upsert_file(&self, project_id: &str, path: &str, content: &str) -> Result<()> {
        self.mutation(
            "system:upsertFileByPath",
            json!({ "projectId": project_id, "path": path, "content": content }),
        )
        .await?;
        Ok(())
    }

    async fn create_folder(&self, project_id: &str, path: &str) -> Result<()> {
        self.mutation(
            "system:createFolderByPath",
            json!({ "projectId": project_id, "path": path }),
        )
        .await?;
        Ok(())
    }

    async fn rename_file(&self, project_id: &str, from: &str, to: &str) -> Result<()> {
        self.mutation(
            "system:renameFileByPath",
            json!({ "projectId": project_id, "from": from, "to": to }),
        )
        .await?;
        Ok(())
    }

    async fn delete_file(&self, project_id: &str, path: &str) -> Result<bool> {
        let deleted = self
            .mutation(
                "system:deleteFileByPath",
                json!({ "projectId": project_id, "path": path }),
            )
            .await?;
        Ok(deleted.as_bool().unwrap_or(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_injects_internal_key() {
        let store = RemoteStore::with_client("https://db.example.com/", "secret", Client::new());
        let body = store.request_body(
            "system:getRecentMessages",
            json!({ "conversationId": "c1", "limit": 10 }),
        );

        assert_eq!(store.base_url, "https://db.example.com");
        assert_eq!(body["path"], "system:getRecentMessages");
        assert_eq!(body["format"], "json");
        assert_eq!(body["args"]["internalKey"], "secret");
        assert_eq!(body["args"]["limit"], 10);
    }

    #[test]
    fn test_api_reply_parsing() {
        let ok: ApiReply =
            serde_json::from_str(r#"{"status":"success","value":{"_id":"c1","title":"t"}}"#)
                .unwrap();
        assert!(matches!(ok, ApiReply::Success { .. }));

        let null: ApiReply = serde_json::from_str(r#"{"status":"success","value":null}"#).unwrap();
        match null {
            ApiReply::Success { value } => assert!(value.is_null()),
            other => panic!("unexpected {other:?}"),
        }

        let err: ApiReply =
            serde_json::from_str(r#"{"status":"error","errorMessage":"Unauthorized"}"#).unwrap();
        match err {
            ApiReply::Error { error_message } => assert_eq!(error_message, "Unauthorized"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_remote_message_shape() {
        let messages: Vec<RemoteMessage> = serde_json::from_str(
            r#"[{"_id":"m1","role":"user","content":"hi","_creationTime":1.0},
                {"_id":"m2","role":"assistant"}]"#,
        )
        .unwrap();
        assert_eq!(messages[0].role, HistoryRole::User);
        assert_eq!(messages[1].content, "");
    }

    #[test]
    fn test_remote_file_shape() {
        let file: RemoteFile =
            serde_json::from_str(r#"{"path":"src","type":"folder"}"#).unwrap();
        let file = ProjectFile::from(file);
        assert!(file.is_folder());
        assert!(file.content.is_none());
    }
}
