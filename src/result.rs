//! Normalized task outcome shared by every task and the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback message for failures that carry no detail.
const UNKNOWN_FAILURE: &str = "task failed without a message";

/// Outcome of a single task execution.
///
/// Success carries the produced artifact (a file path, a recipient address, ...)
/// and an empty message. Failure carries a non-empty message and no artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskResult {
    /// The task produced its artifact.
    Success { artifact: String },

    /// The task gave up.
    Failed { message: String },
}

/// Status half of a [`TaskResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Success,
    Failed,
}

impl TaskResult {
    /// Build a successful result.
    pub fn success(artifact: impl Into<String>) -> Self {
        Self::Success {
            artifact: artifact.into(),
        }
    }

    /// Build a failed result. Blank messages are replaced so a failure is never silent.
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            UNKNOWN_FAILURE.to_string()
        } else {
            message
        };
        Self::Failed { message }
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Success { .. } => TaskStatus::Success,
            Self::Failed { .. } => TaskStatus::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The artifact reference, present only on success.
    pub fn artifact(&self) -> Option<&str> {
        match self {
            Self::Success { artifact } => Some(artifact),
            Self::Failed { .. } => None,
        }
    }

    /// Human-readable detail: empty on success.
    pub fn message(&self) -> &str {
        match self {
            Self::Success { .. } => "",
            Self::Failed { message } => message,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failed => f.write_str("failed"),
        }
    }
}
