//! Resume refinement task.

use crate::error::{HandlerError, TaskError};
use crate::failure::{RecoveryAction, TaskInputs};
use crate::prompt::PromptKey;
use crate::services::{ArtifactKind, Services};
use crate::task::{extract_payload, require, LatexPayload, Task};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

/// Inputs of a resume refinement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeInputs {
    /// Source resume (LaTeX)
    pub resume_file: String,
    pub job_role: String,
    pub job_description: String,
    /// Where the refined resume is rendered
    pub output_dir: PathBuf,
}

/// Tailors a LaTeX resume to a role and renders it.
pub struct ResumeTask {
    inputs: ResumeInputs,
    services: Services,
}

impl ResumeTask {
    pub const NAME: &'static str = "resume";

    pub fn new(inputs: ResumeInputs, services: Services) -> Self {
        Self { inputs, services }
    }

    /// [`crate::failure::Rebuild`] for resume refinement.
    pub fn rebuild(inputs: &TaskInputs, services: &Services) -> Result<Box<dyn Task>, HandlerError> {
        match inputs {
            TaskInputs::Resume(inputs) => Ok(Box::new(Self::new(inputs.clone(), services.clone()))),
            other => Err(HandlerError::InputMismatch {
                task: Self::NAME,
                found: other.task_name(),
            }),
        }
    }
}

impl Task for ResumeTask {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn attempt(&self) -> Result<String, TaskError> {
        let resume_latex = self.services.documents.extract(&self.inputs.resume_file)?;

        let prompt = self.services.prompts.render(
            PromptKey::Resume,
            &json!({
                "resume_latex_code": resume_latex,
                "job_description": self.inputs.job_description,
                "position": self.inputs.job_role,
            }),
        )?;

        let completion = self.services.generator.send_query(&prompt)?;
        let payload: LatexPayload = extract_payload(&completion.response)?;
        require("latex_code", &payload.latex_code)?;

        self.services.renderer.render(
            &payload.latex_code,
            ArtifactKind::Resume,
            &self.inputs.output_dir,
        )
    }

    fn recovery(&self) -> RecoveryAction {
        RecoveryAction::new(
            Self::NAME,
            TaskInputs::Resume(self.inputs.clone()),
            self.services.clone(),
            Self::rebuild,
        )
    }
}
