//! Single-job command against an in-memory project.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use helmsman::bus::JobStatus;
use helmsman::config::Config;
use helmsman::jobs::{JobSettings, MessageJob};
use helmsman::store::{
    ConversationSnapshot, FileStore, HistoryEntry, HistoryRole, InMemoryStore,
    DEFAULT_CONVERSATION_TITLE,
};

use super::common::build_controller;

const LOCAL_CONVERSATION: &str = "local-conversation";
const LOCAL_USER_MESSAGE: &str = "local-user-message";
const LOCAL_REPLY: &str = "local-reply";
/// The in-memory store does not authenticate.
const LOCAL_INTERNAL_KEY: &str = "local";

pub(crate) async fn cmd_run(message: String, project: String, json: bool) -> Result<()> {
    let config = Config::load().with_context(|| "Failed to load configuration")?;

    let store = Arc::new(InMemoryStore::new());
    store
        .insert_conversation(ConversationSnapshot::new(
            LOCAL_CONVERSATION,
            DEFAULT_CONVERSATION_TITLE,
        ))
        .await;
    store
        .insert_message(
            LOCAL_CONVERSATION,
            HistoryEntry::new(LOCAL_USER_MESSAGE, HistoryRole::User, &message, 1),
        )
        .await;
    store
        .insert_message(
            LOCAL_CONVERSATION,
            HistoryEntry::new(LOCAL_REPLY, HistoryRole::Assistant, "", 2),
        )
        .await;

    let mut settings = JobSettings::from_config(&config);
    settings
        .internal_key
        .get_or_insert_with(|| LOCAL_INTERNAL_KEY.to_string());

    let controller = build_controller(&config, settings, store.clone(), store.clone())?;
    let job = MessageJob::new(LOCAL_REPLY, LOCAL_CONVERSATION, &project, &message);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let report = controller.run(&job, &cancel).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(conversation) = store.conversation(LOCAL_CONVERSATION).await {
        if !conversation.is_default_title {
            println!("Title: {}", conversation.title);
            println!();
        }
    }

    match report.status {
        JobStatus::Completed | JobStatus::Failed => {
            let reply = store.message_content(LOCAL_REPLY).await.unwrap_or_default();
            println!("{}", reply);
        }
        JobStatus::Cancelled => println!("Cancelled."),
    }
    if let Some(error) = &report.error {
        eprintln!();
        eprintln!("Error: {}", error);
    }

    let files = store.list_files(&project).await?;
    if !files.is_empty() {
        println!();
        println!("Project files:");
        for file in files {
            let marker = if file.is_folder() { "/" } else { "" };
            println!("  {}{}", file.path, marker);
        }
    }

    Ok(())
}
