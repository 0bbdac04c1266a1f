//! Turn-by-turn routing for the agent network.
//!
//! After every agent invocation the router looks at the run history and
//! decides whether to invoke the agent again or stop. It never calls the
//! model itself, which keeps the decision a pure function of the history.

use serde::{Deserialize, Serialize};

use super::output::RunHistory;

/// Answer used when a run stops without the agent ever producing text.
pub const FALLBACK_ANSWER: &str =
    "I processed your request. Let me know if you need anything else!";

/// Default router turn bound.
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Turns that always run before the router considers stopping.
const MIN_TURNS: usize = 2;

/// Why a run reached [`RouterState::Done`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The last turn was assistant text with no tool call
    Completed,
    /// The router turn bound was reached
    TurnLimit,
    /// The network's agent-invocation cap was reached
    IterationLimit,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Completed => write!(f, "completed"),
            StopReason::TurnLimit => write!(f, "turn_limit"),
            StopReason::IterationLimit => write!(f, "iteration_limit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    Running,
    Done(StopReason),
}

impl RouterState {
    pub fn is_done(&self) -> bool {
        matches!(self, RouterState::Done(_))
    }
}

/// Decides continuation after each appended turn.
#[derive(Debug, Clone, Copy)]
pub struct Router {
    max_turns: usize,
}

impl Router {
    pub fn new(max_turns: usize) -> Self {
        Self { max_turns }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Next state given the history so far.
    ///
    /// Only the last turn is inspected. The first two turns always run, so
    /// a lone tool call or an early reply never ends the run.
    pub fn decide(&self, history: &RunHistory) -> RouterState {
        if history.len() < MIN_TURNS {
            return RouterState::Running;
        }

        let completed = history
            .last()
            .is_some_and(|turn| turn.has_assistant_text() && !turn.has_tool_call());

        if completed {
            RouterState::Done(StopReason::Completed)
        } else if history.len() >= self.max_turns {
            RouterState::Done(StopReason::TurnLimit)
        } else {
            RouterState::Running
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

/// The answer a finished run reports.
///
/// The most recent assistant text in the run, or [`FALLBACK_ANSWER`] if
/// there was none.
pub fn final_answer(history: &RunHistory) -> String {
    history
        .latest_assistant_text()
        .unwrap_or(FALLBACK_ANSWER)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::output::{AgentTurnResult, OutputItem};

    fn text(content: &str) -> AgentTurnResult {
        AgentTurnResult::new(vec![OutputItem::assistant_text(content)])
    }

    fn tool_call() -> AgentTurnResult {
        AgentTurnResult::new(vec![OutputItem::tool_call("c", "list_files", "{}")])
    }

    fn text_and_tool(content: &str) -> AgentTurnResult {
        AgentTurnResult::new(vec![
            OutputItem::assistant_text(content),
            OutputItem::tool_call("c", "read_files", "{}"),
        ])
    }

    #[test]
    fn test_short_history_always_continues() {
        let router = Router::default();
        let single_text: RunHistory = vec![text("hi")].into_iter().collect();
        let single_tool: RunHistory = vec![tool_call()].into_iter().collect();

        assert_eq!(router.decide(&single_text), RouterState::Running);
        assert_eq!(router.decide(&single_tool), RouterState::Running);
        assert_eq!(router.decide(&RunHistory::new()), RouterState::Running);
    }

    #[test]
    fn test_text_only_turn_completes() {
        let history: RunHistory = vec![tool_call(), text("Done, file written.")]
            .into_iter()
            .collect();
        assert_eq!(
            Router::default().decide(&history),
            RouterState::Done(StopReason::Completed)
        );
        assert_eq!(final_answer(&history), "Done, file written.");
    }

    #[test]
    fn test_text_with_tool_call_continues() {
        let history: RunHistory = vec![tool_call(), text_and_tool("checking")]
            .into_iter()
            .collect();
        assert_eq!(Router::default().decide(&history), RouterState::Running);
    }

    #[test]
    fn test_only_last_turn_matters() {
        let history: RunHistory = vec![text("early"), text("also early"), tool_call()]
            .into_iter()
            .collect();
        assert_eq!(Router::default().decide(&history), RouterState::Running);
    }

    #[test]
    fn test_turn_limit_forces_stop_with_fallback() {
        let history: RunHistory = (0..20).map(|_| tool_call()).collect();
        assert_eq!(
            Router::default().decide(&history),
            RouterState::Done(StopReason::TurnLimit)
        );
        assert_eq!(final_answer(&history), FALLBACK_ANSWER);
    }

    #[test]
    fn test_turn_limit_keeps_earlier_text() {
        let mut history: RunHistory = (0..19).map(|_| tool_call()).collect();
        history.push(text_and_tool("partial progress"));
        assert!(Router::default().decide(&history).is_done());
        assert_eq!(final_answer(&history), "partial progress");
    }

    #[test]
    fn test_answer_returned_verbatim() {
        let answer = "  Indented answer\nwith lines  ";
        let history: RunHistory = vec![tool_call(), text(answer)].into_iter().collect();
        assert_eq!(final_answer(&history), answer);
    }

    #[test]
    fn test_custom_turn_bound() {
        let router = Router::new(3);
        let history: RunHistory = (0..3).map(|_| tool_call()).collect();
        assert_eq!(router.decide(&history), RouterState::Done(StopReason::TurnLimit));
    }
}
