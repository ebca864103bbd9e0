//! Execution context passed into each step.
//!
//! The context tells the executor why the step is running and carries the
//! payload that triggered it. It is never persisted with the operation; it
//! travels inside queue messages and sync-driver loops.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why this step is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    /// Triggered by a new user message
    UserInput,
    /// Triggered by a completed tool invocation
    ToolResult,
    /// Triggered by a human decision on a paused operation
    HumanDecision,
}

/// Optional session binding for executors that keep per-conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    #[serde(default)]
    pub data: Value,
}

/// Input to a single step execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub phase: ExecutionPhase,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub session: Option<SessionInfo>,
}

impl ExecutionContext {
    pub fn new(phase: ExecutionPhase, payload: Value) -> Self {
        Self {
            phase,
            payload,
            session: None,
        }
    }

    pub fn user_input(payload: Value) -> Self {
        Self::new(ExecutionPhase::UserInput, payload)
    }

    pub fn tool_result(payload: Value) -> Self {
        Self::new(ExecutionPhase::ToolResult, payload)
    }

    pub fn human_decision(payload: Value) -> Self {
        Self::new(ExecutionPhase::HumanDecision, payload)
    }

    pub fn with_session(mut self, session: SessionInfo) -> Self {
        self.session = Some(session);
        self
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::user_input(Value::Null)
    }
}

/// Verdict a human gave on a paused operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

/// Input supplied when resuming an operation that waited for a human.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanInput {
    #[serde(default)]
    pub decision: Option<ApprovalDecision>,
    /// Free-form message appended to the transcript as a user turn.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl HumanInput {
    pub fn approval(decision: ApprovalDecision) -> Self {
        Self {
            decision: Some(decision),
            message: None,
            data: Value::Null,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            decision: None,
            message: Some(message.into()),
            data: Value::Null,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// JSON payload handed to the next step's `human_decision` context.
    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "decision": self.decision,
            "message": self.message,
            "data": self.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_phase_serde_names() {
        assert_eq!(
            serde_json::to_string(&ExecutionPhase::HumanDecision).unwrap(),
            "\"human_decision\""
        );
        let parsed: ExecutionPhase = serde_json::from_str("\"tool_result\"").unwrap();
        assert_eq!(parsed, ExecutionPhase::ToolResult);
    }

    #[test]
    fn test_context_round_trip_with_session() {
        let context = ExecutionContext::tool_result(json!({"tool": "search", "output": [1, 2]}))
            .with_session(SessionInfo {
                session_id: "sess-42".to_string(),
                data: json!({"cwd": "/tmp"}),
            });

        let encoded = serde_json::to_value(&context).unwrap();
        let decoded: ExecutionContext = serde_json::from_value(encoded).unwrap();

        assert_eq!(decoded.phase, ExecutionPhase::ToolResult);
        assert_eq!(decoded.session.unwrap().session_id, "sess-42");
    }

    #[test]
    fn test_context_defaults_missing_fields() {
        let decoded: ExecutionContext = serde_json::from_value(json!({"phase": "user_input"})).unwrap();
        assert_eq!(decoded.phase, ExecutionPhase::UserInput);
        assert!(decoded.payload.is_null());
        assert!(decoded.session.is_none());
    }

    #[test]
    fn test_human_input_payload_shape() {
        let input = HumanInput::approval(ApprovalDecision::Approved)
            .with_data(json!({"ticket": "OPS-1"}));
        let payload = input.to_payload();

        assert_eq!(payload["decision"], json!("approved"));
        assert_eq!(payload["message"], json!(null));
        assert_eq!(payload["data"]["ticket"], json!("OPS-1"));
    }
}
