//! Error types and the failure taxonomy.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure classification used by the failure handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing source document, malformed structured payload, bad prompt data.
    Input,
    /// The generative service was unavailable or answered garbage.
    Service,
    /// Rendering or delivery failed.
    Io,
    /// The diagnostic/retry machinery itself broke.
    Handler,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Input => "input",
            Self::Service => "service",
            Self::Io => "io",
            Self::Handler => "handler",
        };
        f.write_str(s)
    }
}

/// Errors raised inside a task's fallible body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("document not found: {reference}")]
    NotFound { reference: String },

    #[error("failed to read document {reference}: {message}")]
    Parse { reference: String, message: String },

    #[error("invalid structured payload: {0}")]
    Payload(String),

    #[error("failed to render prompt '{template}': {message}")]
    Prompt { template: String, message: String },

    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    #[error("text service error: {0}")]
    Service(String),

    #[error("failed to render {kind}: {message}")]
    Render { kind: String, message: String },

    #[error("failed to deliver email to {recipient}: {message}")]
    Delivery { recipient: String, message: String },
}

impl TaskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. }
            | Self::Parse { .. }
            | Self::Payload(_)
            | Self::Prompt { .. }
            | Self::MissingInput(_) => ErrorKind::Input,
            Self::Service(_) => ErrorKind::Service,
            Self::Render { .. } | Self::Delivery { .. } => ErrorKind::Io,
        }
    }
}

/// Failures of the failure handler itself. Always terminal.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("diagnosis of '{task}' failure unavailable: {source}")]
    Diagnosis {
        task: String,
        #[source]
        source: TaskError,
    },

    #[error("recovery for '{task}' received inputs recorded for '{found}'")]
    InputMismatch { task: &'static str, found: &'static str },
}

impl HandlerError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Handler
    }
}

/// Workflow graph validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("entry node not registered: {0}")]
    MissingEntry(NodeId),

    #[error("node registered more than once: {0}")]
    DuplicateNode(NodeId),

    #[error("node has no transition: {0}")]
    MissingTransition(NodeId),

    #[error("node has more than one transition: {0}")]
    DuplicateTransition(NodeId),

    #[error("transition declared for unregistered node: {0}")]
    UnknownNode(NodeId),

    #[error("branch '{label}' of {from} targets unregistered node {to}")]
    InvalidBranch {
        from: NodeId,
        label: &'static str,
        to: NodeId,
    },

    #[error("node is unreachable from the entry point: {0}")]
    Unreachable(NodeId),

    #[error("node has no path to termination: {0}")]
    NoTerminalPath(NodeId),

    #[error("cycle detected through node {0}")]
    Cycle(NodeId),
}
