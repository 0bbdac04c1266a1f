//! System prompt assembly for the coding agent.
//!
//! [`ContextBuilder`] appends a bounded slice of the conversation to a base
//! prompt so the model can see what was said before without answering it
//! again.

use crate::store::HistoryEntry;

/// Base system prompt of the coding agent.
pub const CODING_AGENT_SYSTEM_PROMPT: &str = r#"You are Helmsman, an expert AI coding assistant working inside the user's project.

You can inspect and change project files with your tools:
- list_files to see the project layout
- read_files before changing anything you have not read
- write_file to create a file or replace its full content
- create_folder, rename_file and delete_files to reorganise the project
- fetch_urls to read documentation or issues on the web

Work in small verified steps. When a task needs file changes, make them with the tools rather than pasting code for the user to apply.
When you are done, reply with a short summary of what you did or the answer to the question. Do not call tools in your final reply."#;

/// System prompt of the one-shot title generator.
pub const TITLE_GENERATOR_SYSTEM_PROMPT: &str = r#"Generate a short title (3 to 6 words) for a conversation that starts with the user's message below.
Reply with the title only: no quotes, no punctuation at the end, no explanation."#;

const HISTORY_HEADER: &str =
    "## Previous Conversation (for context only - do NOT repeat these responses):";
const CURRENT_REQUEST: &str = "## Current Request:\nRespond ONLY to the user's new message below. Do not repeat or reference your previous responses.";

/// Builds the system prompt from a base template and recent history.
///
/// # Example
///
/// ```rust
/// use helmsman::agent::ContextBuilder;
/// use helmsman::store::{HistoryEntry, HistoryRole};
///
/// let builder = ContextBuilder::new("You are helpful.");
/// let history = vec![
///     HistoryEntry::new("m1", HistoryRole::User, "fix bug", 1),
///     HistoryEntry::new("m2", HistoryRole::Assistant, "done", 2),
/// ];
/// let prompt = builder.build(&history, "m3");
/// assert!(prompt.contains("USER: fix bug\n\nASSISTANT: done"));
/// ```
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    template: String,
}

impl ContextBuilder {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Builder over [`CODING_AGENT_SYSTEM_PROMPT`].
    pub fn coding() -> Self {
        Self::new(CODING_AGENT_SYSTEM_PROMPT)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render the system prompt.
    ///
    /// The entry whose id is `current_message_id` and entries with blank
    /// content are left out. If nothing remains the template is returned
    /// unchanged.
    pub fn build(&self, history: &[HistoryEntry], current_message_id: &str) -> String {
        let rendered: Vec<String> = history
            .iter()
            .filter(|entry| entry.id != current_message_id)
            .filter(|entry| !entry.content.trim().is_empty())
            .map(|entry| format!("{}: {}", entry.role.label(), entry.content))
            .collect();

        if rendered.is_empty() {
            return self.template.clone();
        }

        format!(
            "{}\n\n{}\n{}\n\n{}",
            self.template,
            HISTORY_HEADER,
            rendered.join("\n\n"),
            CURRENT_REQUEST
        )
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::coding()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HistoryRole;

    const BASE: &str = "BASE PROMPT";

    #[test]
    fn test_self_and_empty_entries_excluded() {
        let history = vec![
            HistoryEntry::new("1", HistoryRole::User, "hi", 1),
            HistoryEntry::new("2", HistoryRole::Assistant, "", 2),
        ];
        let prompt = ContextBuilder::new(BASE).build(&history, "1");
        assert_eq!(prompt, BASE);
    }

    #[test]
    fn test_whitespace_only_entry_excluded() {
        let history = vec![HistoryEntry::new("1", HistoryRole::Assistant, " \n\t ", 1)];
        assert_eq!(ContextBuilder::new(BASE).build(&history, "9"), BASE);
    }

    #[test]
    fn test_history_rendered_after_template() {
        let history = vec![
            HistoryEntry::new("1", HistoryRole::User, "fix bug", 1),
            HistoryEntry::new("2", HistoryRole::Assistant, "done", 2),
        ];
        let prompt = ContextBuilder::new(BASE).build(&history, "3");

        assert!(prompt.starts_with(BASE));
        assert!(prompt.contains("USER: fix bug\n\nASSISTANT: done"));
        let header = prompt.find(HISTORY_HEADER).unwrap();
        let entries = prompt.find("USER: fix bug").unwrap();
        let request = prompt.find("## Current Request:").unwrap();
        assert!(header < entries && entries < request);
    }

    #[test]
    fn test_empty_history_is_template() {
        assert_eq!(ContextBuilder::new(BASE).build(&[], "x"), BASE);
    }

    #[test]
    fn test_order_preserved() {
        let history = vec![
            HistoryEntry::new("a", HistoryRole::User, "one", 1),
            HistoryEntry::new("b", HistoryRole::Assistant, "two", 2),
            HistoryEntry::new("c", HistoryRole::User, "three", 3),
        ];
        let prompt = ContextBuilder::coding().build(&history, "d");
        let one = prompt.find("USER: one").unwrap();
        let three = prompt.find("USER: three").unwrap();
        assert!(one < three);
        assert!(prompt.starts_with(CODING_AGENT_SYSTEM_PROMPT));
    }
}
