//! Task nodes: engine-facing adapters that run a task and merge its result.

use crate::cover_letter::{CoverLetterInputs, CoverLetterTask};
use crate::dispatch::{DispatchInputs, DispatchTask};
use crate::error::TaskError;
use crate::failure::FailureHandler;
use crate::resume::{ResumeInputs, ResumeTask};
use crate::result::TaskResult;
use crate::services::Services;
use crate::state::WorkflowState;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Pipeline stage identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    Resume,
    CoverLetter,
    Dispatch,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::CoverLetter => "cover_letter",
            Self::Dispatch => "dispatch",
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workflow node. Executing a node never fails; failures land in the state.
pub trait Node {
    fn id(&self) -> NodeId;

    fn execute(&self, state: &mut WorkflowState);
}

/// What nodes need to construct their tasks.
#[derive(Debug, Clone)]
pub struct NodeEnv {
    pub services: Services,
    pub resume_dir: PathBuf,
    pub cover_letter_dir: PathBuf,
}

/// Builds a node's task from the state fields it reads.
pub type BindTask = fn(&WorkflowState, &NodeEnv) -> Result<Box<dyn Task>, TaskError>;

/// Node backed by a [`Task`].
pub struct TaskNode {
    id: NodeId,
    bind: BindTask,
    env: Arc<NodeEnv>,
    handler: Arc<dyn FailureHandler>,
}

impl TaskNode {
    pub fn new(
        id: NodeId,
        bind: BindTask,
        env: Arc<NodeEnv>,
        handler: Arc<dyn FailureHandler>,
    ) -> Self {
        Self {
            id,
            bind,
            env,
            handler,
        }
    }

    pub fn resume(env: Arc<NodeEnv>, handler: Arc<dyn FailureHandler>) -> Self {
        Self::new(NodeId::Resume, bind_resume, env, handler)
    }

    pub fn cover_letter(env: Arc<NodeEnv>, handler: Arc<dyn FailureHandler>) -> Self {
        Self::new(NodeId::CoverLetter, bind_cover_letter, env, handler)
    }

    pub fn dispatch(env: Arc<NodeEnv>, handler: Arc<dyn FailureHandler>) -> Self {
        Self::new(NodeId::Dispatch, bind_dispatch, env, handler)
    }
}

impl Node for TaskNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn execute(&self, state: &mut WorkflowState) {
        tracing::info!(node = %self.id, "Running node");

        let result = match (self.bind)(state, &self.env) {
            Ok(task) => task.run(self.handler.as_ref()),
            Err(e) => {
                tracing::error!(node = %self.id, error = %e, "Node inputs unavailable");
                TaskResult::failed(e.to_string())
            }
        };

        if let TaskResult::Failed { ref message } = result {
            tracing::warn!(node = %self.id, message = %message, "Node failed");
        }
        state.record(self.id, result);
    }
}

fn bind_resume(state: &WorkflowState, env: &NodeEnv) -> Result<Box<dyn Task>, TaskError> {
    let app = state.application();
    let inputs = ResumeInputs {
        resume_file: app.resume_file.clone(),
        job_role: app.job_role.clone(),
        job_description: app.job_description.clone(),
        output_dir: env.resume_dir.clone(),
    };
    Ok(Box::new(ResumeTask::new(inputs, env.services.clone())))
}

fn bind_cover_letter(state: &WorkflowState, env: &NodeEnv) -> Result<Box<dyn Task>, TaskError> {
    let app = state.application();
    let refined_resume_path = state
        .refined_resume_path()
        .ok_or(TaskError::MissingInput("refined_resume_path"))?;

    let inputs = CoverLetterInputs {
        refined_resume_path: refined_resume_path.to_string(),
        job_role: app.job_role.clone(),
        job_description: app.job_description.clone(),
        company: app.company.clone(),
        output_dir: env.cover_letter_dir.clone(),
    };
    Ok(Box::new(CoverLetterTask::new(inputs, env.services.clone())))
}

fn bind_dispatch(state: &WorkflowState, env: &NodeEnv) -> Result<Box<dyn Task>, TaskError> {
    let app = state.application();
    let resume_path = state
        .refined_resume_path()
        .ok_or(TaskError::MissingInput("refined_resume_path"))?;

    let inputs = DispatchInputs {
        resume_path: resume_path.to_string(),
        position: app.job_role.clone(),
        job_description: app.job_description.clone(),
        company: app.company.clone(),
        receiver_email: app.receiver_email.clone(),
        attach_cover_letter: app.generate_cover_letter,
        cover_letter_path: state.cover_letter_path().map(str::to_string),
    };
    Ok(Box::new(DispatchTask::new(inputs, env.services.clone())))
}
