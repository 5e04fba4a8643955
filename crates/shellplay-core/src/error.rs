//! Structured errors, serializable so controllers can parse them

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ScreenNotFound,
    WorkflowInvalid,
    WorkflowNotFound,
    Timeout,
    PlayerGone,
    Io,
    Unknown,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            suggestions: Vec::new(),
            context: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn screen_not_found(screen_id: &str) -> Self {
        Self::new(
            ErrorCode::ScreenNotFound,
            format!("No screen with id: {}", screen_id),
        )
    }

    pub fn workflow_invalid(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::WorkflowInvalid, reason)
    }

    pub fn workflow_not_found(name: &str) -> Self {
        Self::new(
            ErrorCode::WorkflowNotFound,
            format!("Workflow not found: {}", name),
        )
        .with_suggestions(vec![
            "Pass a path to a workflow JSON file".to_string(),
            "Run `sp list` to see imported workflows".to_string(),
        ])
    }

    pub fn player_gone() -> Self {
        Self::new(ErrorCode::PlayerGone, "Player thread has shut down")
            .with_suggestions(vec!["Restart playback with `sp play`".to_string()])
    }

    pub fn timeout(what: &str, timeout_ms: u64) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Timeout after {}ms waiting for: {}", timeout_ms, what),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::new(ErrorCode::Unknown, e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::Io, e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorCode::WorkflowInvalid, format!("Malformed workflow JSON: {}", e))
            .with_context(serde_json::json!({ "line": e.line(), "column": e.column() }))
    }
}
