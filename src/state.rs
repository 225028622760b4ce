//! Workflow state threaded through one run.

use crate::node::NodeId;
use crate::result::TaskResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable inputs of one application run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Source resume reference
    pub resume_file: String,

    /// Target role
    pub job_role: String,

    /// Target role description
    pub job_description: String,

    /// Target organization
    pub company: String,

    /// Where the application email goes
    pub receiver_email: String,

    #[serde(default)]
    pub generate_cover_letter: bool,

    #[serde(default)]
    pub send_email: bool,
}

/// Run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    ResumeDone,
    CoverLetterDone,
    /// Dispatch finished; the run's success marker.
    Completed,
    Failed,
}

impl RunStatus {
    /// Status written when `node` succeeds.
    pub fn done(node: NodeId) -> Self {
        match node {
            NodeId::Resume => Self::ResumeDone,
            NodeId::CoverLetter => Self::CoverLetterDone,
            NodeId::Dispatch => Self::Completed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::ResumeDone => "resume_done",
            Self::CoverLetterDone => "cover_letter_done",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// State of one run.
///
/// Inputs are read-only. Outputs are written only through [`WorkflowState::record`],
/// and only the field owned by the recording node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowState {
    application: Application,
    refined_resume_path: Option<String>,
    cover_letter_path: Option<String>,
    delivered_to: Option<String>,
    status: RunStatus,
    error_message: Option<String>,
}

impl WorkflowState {
    pub fn new(application: Application) -> Self {
        Self {
            application,
            refined_resume_path: None,
            cover_letter_path: None,
            delivered_to: None,
            status: RunStatus::Pending,
            error_message: None,
        }
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn refined_resume_path(&self) -> Option<&str> {
        self.refined_resume_path.as_deref()
    }

    pub fn cover_letter_path(&self) -> Option<&str> {
        self.cover_letter_path.as_deref()
    }

    pub fn delivered_to(&self) -> Option<&str> {
        self.delivered_to.as_deref()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.status == RunStatus::Failed
    }

    /// Merge the outcome of `node` into the state.
    ///
    /// Success writes the node's output and done status. Failure writes only the
    /// status and message; earlier outputs stay as they were.
    pub fn record(&mut self, node: NodeId, result: TaskResult) {
        match result {
            TaskResult::Success { artifact } => {
                let slot = match node {
                    NodeId::Resume => &mut self.refined_resume_path,
                    NodeId::CoverLetter => &mut self.cover_letter_path,
                    NodeId::Dispatch => &mut self.delivered_to,
                };
                *slot = Some(artifact);
                self.status = RunStatus::done(node);
            }
            TaskResult::Failed { message } => self.fail(message),
        }
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error_message = Some(message.into());
    }

    /// Mark a run that ended without failing as completed.
    pub(crate) fn finish(&mut self) {
        if !self.is_failed() {
            self.status = RunStatus::Completed;
        }
    }
}
