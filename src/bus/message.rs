//! Event types carried by the message bus
//!
//! Inbound events arrive as JSON in the shape the durable event transport
//! uses:
//!
//! ```json
//! {"name": "message/sent", "data": {"messageId": "m1", "conversationId": "c1",
//!  "projectId": "p1", "message": "Add a README"}}
//! {"name": "message/cancel", "data": {"messageId": "m1"}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::StopReason;

/// An event consumed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum InboundEvent {
    #[serde(rename = "message/sent")]
    MessageSent(MessageSent),
    #[serde(rename = "message/cancel")]
    MessageCancel(MessageCancel),
}

impl InboundEvent {
    /// Message id the event is correlated by.
    pub fn message_id(&self) -> &str {
        match self {
            InboundEvent::MessageSent(sent) => &sent.message_id,
            InboundEvent::MessageCancel(cancel) => &cancel.message_id,
        }
    }

    /// Parse one JSON-encoded event.
    pub fn from_json(raw: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// A user message that needs an assistant reply.
///
/// `message_id` identifies the assistant message whose content the job
/// fills in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSent {
    pub message_id: String,
    pub conversation_id: String,
    pub project_id: String,
    pub message: String,
}

impl MessageSent {
    pub fn new(message_id: &str, conversation_id: &str, project_id: &str, message: &str) -> Self {
        Self {
            message_id: message_id.to_string(),
            conversation_id: conversation_id.to_string(),
            project_id: project_id.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCancel {
    pub message_id: String,
}

impl MessageCancel {
    pub fn new(message_id: &str) -> Self {
        Self {
            message_id: message_id.to_string(),
        }
    }
}

/// Terminal state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// The answer was persisted
    Completed,
    /// A fatal error ended the run; the apology was written if possible
    Failed,
    /// A correlated cancel event stopped the run
    Cancelled,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Published on the outbound side of the bus when a job ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: String,
    pub message_id: String,
    pub conversation_id: String,
    pub status: JobStatus,
    /// Text persisted as the assistant message, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    pub turns: usize,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    fn base(job_id: &str, message_id: &str, conversation_id: &str, status: JobStatus) -> Self {
        Self {
            job_id: job_id.to_string(),
            message_id: message_id.to_string(),
            conversation_id: conversation_id.to_string(),
            status,
            answer: None,
            error: None,
            stop_reason: None,
            turns: 0,
            finished_at: Utc::now(),
        }
    }

    pub fn completed(
        job_id: &str,
        message_id: &str,
        conversation_id: &str,
        answer: &str,
        stop_reason: StopReason,
        turns: usize,
    ) -> Self {
        Self {
            answer: Some(answer.to_string()),
            stop_reason: Some(stop_reason),
            turns,
            ..Self::base(job_id, message_id, conversation_id, JobStatus::Completed)
        }
    }

    /// `answer` is the apology when it was persisted.
    pub fn failed(
        job_id: &str,
        message_id: &str,
        conversation_id: &str,
        error: &str,
        answer: Option<&str>,
    ) -> Self {
        Self {
            error: Some(error.to_string()),
            answer: answer.map(str::to_string),
            ..Self::base(job_id, message_id, conversation_id, JobStatus::Failed)
        }
    }

    pub fn cancelled(job_id: &str, message_id: &str, conversation_id: &str) -> Self {
        Self::base(job_id, message_id, conversation_id, JobStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_sent() {
        let raw = r#"{"name":"message/sent","data":{"messageId":"m1","conversationId":"c1","projectId":"p1","message":"hello"}}"#;
        let event = InboundEvent::from_json(raw).unwrap();
        assert_eq!(
            event,
            InboundEvent::MessageSent(MessageSent::new("m1", "c1", "p1", "hello"))
        );
        assert_eq!(event.message_id(), "m1");
    }

    #[test]
    fn test_parse_message_cancel() {
        let raw = r#"{"name":"message/cancel","data":{"messageId":"m9"}}"#;
        let event = InboundEvent::from_json(raw).unwrap();
        assert_eq!(event, InboundEvent::MessageCancel(MessageCancel::new("m9")));
    }

    #[test]
    fn test_unknown_event_rejected() {
        let raw = r#"{"name":"message/edited","data":{"messageId":"m1"}}"#;
        assert!(InboundEvent::from_json(raw).is_err());
    }

    #[test]
    fn test_missing_field_rejected() {
        let raw = r#"{"name":"message/sent","data":{"messageId":"m1"}}"#;
        assert!(InboundEvent::from_json(raw).is_err());
    }

    #[test]
    fn test_report_serialization() {
        let report = JobReport::completed("j1", "m1", "c1", "done", StopReason::Completed, 2);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["stopReason"], "completed");
        assert_eq!(json["messageId"], "m1");
        assert!(json.get("error").is_none());

        let cancelled = serde_json::to_value(JobReport::cancelled("j1", "m1", "c1")).unwrap();
        assert_eq!(cancelled["status"], "cancelled");
        assert!(cancelled.get("answer").is_none());
    }

    #[test]
    fn test_report_line_parses_back() {
        let line = r#"{"jobId":"j1","messageId":"m1","conversationId":"c1","status":"completed","answer":"done","stopReason":"iteration_limit","turns":10,"finishedAt":"2026-01-01T00:00:00Z"}"#;
        let report: JobReport = serde_json::from_str(line).unwrap();
        assert_eq!(report.status, JobStatus::Completed);
        assert_eq!(report.stop_reason, Some(StopReason::IterationLimit));
        assert_eq!(report.turns, 10);
        assert!(report.error.is_none());
    }
}
