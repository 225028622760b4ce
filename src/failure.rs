//! Failure handling: diagnose, decide on a single retry, package the outcome.
//!
//! [`FailureHandler::handle`] is the only place that decides whether a failed
//! task gets another attempt. Tasks hand it their error together with a
//! [`RecoveryAction`], an explicit record of the original inputs and a plain
//! function that rebuilds an equivalent task from them.
//!
//! The recovery path calls [`Task::attempt`] on the rebuilt task, never
//! [`Task::run`], so a second failure is terminal and cannot recurse.

use crate::config::RecoveryConfig;
use crate::cover_letter::CoverLetterInputs;
use crate::dispatch::DispatchInputs;
use crate::error::{HandlerError, TaskError};
use crate::resume::ResumeInputs;
use crate::result::TaskResult;
use crate::services::{Services, TextGenerator};
use crate::task::Task;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Rebuilds a task from recorded inputs.
pub type Rebuild = fn(&TaskInputs, &Services) -> Result<Box<dyn Task>, HandlerError>;

/// Original inputs of a task, kept so recovery is inspectable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskInputs {
    Resume(ResumeInputs),
    CoverLetter(CoverLetterInputs),
    Dispatch(DispatchInputs),
}

impl TaskInputs {
    pub fn task_name(&self) -> &'static str {
        match self {
            Self::Resume(_) => crate::resume::ResumeTask::NAME,
            Self::CoverLetter(_) => crate::cover_letter::CoverLetterTask::NAME,
            Self::Dispatch(_) => crate::dispatch::DispatchTask::NAME,
        }
    }
}

/// How to re-attempt a failed task.
#[derive(Clone)]
pub struct RecoveryAction {
    task: &'static str,
    inputs: TaskInputs,
    services: Services,
    rebuild: Rebuild,
}

impl RecoveryAction {
    pub fn new(task: &'static str, inputs: TaskInputs, services: Services, rebuild: Rebuild) -> Self {
        Self {
            task,
            inputs,
            services,
            rebuild,
        }
    }

    pub fn task(&self) -> &'static str {
        self.task
    }

    pub fn inputs(&self) -> &TaskInputs {
        &self.inputs
    }

    /// Construct the equivalent task without running it.
    pub fn rebuild(&self) -> Result<Box<dyn Task>, HandlerError> {
        (self.rebuild)(&self.inputs, &self.services)
    }

    /// Rebuild and attempt once.
    ///
    /// The outer `Err` means the recovery machinery broke; the inner result is
    /// the outcome of the re-attempt.
    pub fn invoke(&self) -> Result<Result<String, TaskError>, HandlerError> {
        let task = self.rebuild()?;
        Ok(task.attempt())
    }
}

impl fmt::Debug for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryAction")
            .field("task", &self.task)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// Decides what happens after a task error.
pub trait FailureHandler {
    /// Handle `error` raised by `task`.
    ///
    /// `Ok` is the final task outcome: success only when the single recovery
    /// attempt succeeded. `Err` means the handler itself failed.
    fn handle(
        &self,
        error: TaskError,
        task: &str,
        recovery: RecoveryAction,
    ) -> Result<TaskResult, HandlerError>;
}

/// Default handler: classify, log, optionally diagnose, retry at most once.
pub struct DiagnosticHandler {
    policy: RecoveryConfig,
    diagnoser: Option<Arc<dyn TextGenerator>>,
}

impl DiagnosticHandler {
    pub fn new(policy: RecoveryConfig) -> Self {
        Self {
            policy,
            diagnoser: None,
        }
    }

    /// Ask `diagnoser` to explain each failure before deciding.
    pub fn with_diagnoser(mut self, diagnoser: Arc<dyn TextGenerator>) -> Self {
        self.diagnoser = Some(diagnoser);
        self
    }

    fn diagnose(&self, task: &str, error: &TaskError) -> Result<Option<String>, HandlerError> {
        let Some(diagnoser) = &self.diagnoser else {
            return Ok(None);
        };

        let prompt = format!(
            "A step of an automated job application pipeline failed.\n\
             Task: {task}\n\
             Error kind: {kind}\n\
             Error: {error}\n\
             In one or two sentences, explain the most likely cause and whether retrying could help.",
            kind = error.kind(),
        );

        let completion = diagnoser
            .send_query(&prompt)
            .map_err(|source| HandlerError::Diagnosis {
                task: task.to_string(),
                source,
            })?;

        let diagnosis = completion.response.trim();
        Ok((!diagnosis.is_empty()).then(|| diagnosis.to_string()))
    }
}

impl Default for DiagnosticHandler {
    fn default() -> Self {
        Self::new(RecoveryConfig::default())
    }
}

impl fmt::Debug for DiagnosticHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticHandler")
            .field("policy", &self.policy)
            .field("diagnose", &self.diagnoser.is_some())
            .finish()
    }
}

impl FailureHandler for DiagnosticHandler {
    fn handle(
        &self,
        error: TaskError,
        task: &str,
        recovery: RecoveryAction,
    ) -> Result<TaskResult, HandlerError> {
        let kind = error.kind();
        tracing::error!(
            task,
            kind = %kind,
            error = %error,
            inputs = ?recovery.inputs(),
            "Task failed"
        );

        let diagnosis = self.diagnose(task, &error)?;
        if let Some(ref diagnosis) = diagnosis {
            tracing::info!(task, diagnosis = %diagnosis, "Failure diagnosed");
        }

        if !self.policy.retries(kind) {
            tracing::debug!(task, kind = %kind, "No retry for this kind of failure");
            return Ok(TaskResult::failed(resolve_message(
                task,
                &error,
                diagnosis.as_deref(),
            )));
        }

        tracing::warn!(task, "Retrying once via recovery action");
        match recovery.invoke()? {
            Ok(artifact) => {
                tracing::info!(task, artifact = %artifact, "Recovery succeeded");
                Ok(TaskResult::success(artifact))
            }
            Err(second) => {
                tracing::error!(task, kind = %second.kind(), error = %second, "Recovery failed");
                Ok(TaskResult::failed(resolve_message(
                    task,
                    &second,
                    diagnosis.as_deref(),
                )))
            }
        }
    }
}

/// Most specific non-empty message: the error itself, then the diagnosis.
fn resolve_message(task: &str, error: &TaskError, diagnosis: Option<&str>) -> String {
    let from_error = error.to_string();
    if !from_error.trim().is_empty() {
        return from_error;
    }

    match diagnosis {
        Some(d) if !d.trim().is_empty() => d.to_string(),
        _ => format!("task '{task}' failed"),
    }
}
