//! What one agent invocation produced, and the run-wide log of those results.

use serde::{Deserialize, Serialize};

use crate::session::Role;

/// A single item emitted by the agent in one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Text {
        role: Role,
        content: String,
    },
    ToolCall {
        id: String,
        name: String,
        /// JSON-encoded arguments exactly as the model sent them
        arguments: String,
    },
}

impl OutputItem {
    pub fn assistant_text(content: &str) -> Self {
        OutputItem::Text {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }

    pub fn tool_call(id: &str, name: &str, arguments: &str) -> Self {
        OutputItem::ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }
}

/// Ordered outputs of one agent invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentTurnResult {
    pub outputs: Vec<OutputItem>,
}

impl AgentTurnResult {
    pub fn new(outputs: Vec<OutputItem>) -> Self {
        Self { outputs }
    }

    /// Whether the turn contains an assistant `Text` item.
    pub fn has_assistant_text(&self) -> bool {
        self.assistant_text().is_some()
    }

    pub fn has_tool_call(&self) -> bool {
        self.outputs
            .iter()
            .any(|item| matches!(item, OutputItem::ToolCall { .. }))
    }

    /// Content of the last assistant `Text` item in this turn.
    pub fn assistant_text(&self) -> Option<&str> {
        self.outputs.iter().rev().find_map(|item| match item {
            OutputItem::Text {
                role: Role::Assistant,
                content,
            } => Some(content.as_str()),
            _ => None,
        })
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.outputs.iter().filter_map(|item| match item {
            OutputItem::ToolCall {
                id,
                name,
                arguments,
            } => Some((id.as_str(), name.as_str(), arguments.as_str())),
            _ => None,
        })
    }
}

/// Append-only sequence of turn results for one run.
///
/// Turns are only ever pushed; nothing hands out mutable access to a turn
/// once it is recorded.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunHistory {
    turns: Vec<AgentTurnResult>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: AgentTurnResult) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&AgentTurnResult> {
        self.turns.last()
    }

    pub fn turns(&self) -> &[AgentTurnResult] {
        &self.turns
    }

    /// Most recent assistant text anywhere in the run.
    pub fn latest_assistant_text(&self) -> Option<&str> {
        self.turns.iter().rev().find_map(AgentTurnResult::assistant_text)
    }
}

impl FromIterator<AgentTurnResult> for RunHistory {
    fn from_iter<I: IntoIterator<Item = AgentTurnResult>>(iter: I) -> Self {
        Self {
            turns: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_classification() {
        let text_only = AgentTurnResult::new(vec![OutputItem::assistant_text("done")]);
        assert!(text_only.has_assistant_text());
        assert!(!text_only.has_tool_call());

        let mixed = AgentTurnResult::new(vec![
            OutputItem::assistant_text("let me look"),
            OutputItem::tool_call("c1", "list_files", "{}"),
        ]);
        assert!(mixed.has_assistant_text());
        assert!(mixed.has_tool_call());
        assert_eq!(mixed.tool_calls().count(), 1);
    }

    #[test]
    fn test_user_text_is_not_assistant_text() {
        let turn = AgentTurnResult::new(vec![OutputItem::Text {
            role: Role::User,
            content: "hi".into(),
        }]);
        assert!(!turn.has_assistant_text());
    }

    #[test]
    fn test_latest_assistant_text_scans_backward() {
        let history: RunHistory = vec![
            AgentTurnResult::new(vec![OutputItem::assistant_text("first")]),
            AgentTurnResult::new(vec![OutputItem::assistant_text("second")]),
            AgentTurnResult::new(vec![OutputItem::tool_call("c1", "read_files", "{}")]),
        ]
        .into_iter()
        .collect();

        assert_eq!(history.len(), 3);
        assert_eq!(history.latest_assistant_text(), Some("second"));
    }

    #[test]
    fn test_output_item_serialization() {
        let json = serde_json::to_value(OutputItem::tool_call("c1", "list_files", "{}")).unwrap();
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["name"], "list_files");
    }
}
