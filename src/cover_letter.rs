//! Cover letter generation task.

use crate::error::{HandlerError, TaskError};
use crate::failure::{RecoveryAction, TaskInputs};
use crate::prompt::PromptKey;
use crate::services::{ArtifactKind, Services};
use crate::task::{extract_payload, require, LatexPayload, Task};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

/// Inputs of a cover letter generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverLetterInputs {
    pub refined_resume_path: String,
    pub job_role: String,
    pub job_description: String,
    pub company: String,
    pub output_dir: PathBuf,
}

/// Writes a cover letter from the refined resume and renders it.
pub struct CoverLetterTask {
    inputs: CoverLetterInputs,
    services: Services,
}

impl CoverLetterTask {
    pub const NAME: &'static str = "cover_letter";

    pub fn new(inputs: CoverLetterInputs, services: Services) -> Self {
        Self { inputs, services }
    }

    pub fn rebuild(inputs: &TaskInputs, services: &Services) -> Result<Box<dyn Task>, HandlerError> {
        match inputs {
            TaskInputs::CoverLetter(inputs) => {
                Ok(Box::new(Self::new(inputs.clone(), services.clone())))
            }
            other => Err(HandlerError::InputMismatch {
                task: Self::NAME,
                found: other.task_name(),
            }),
        }
    }
}

impl Task for CoverLetterTask {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn attempt(&self) -> Result<String, TaskError> {
        let resume_text = self
            .services
            .documents
            .extract(&self.inputs.refined_resume_path)?;

        let prompt = self.services.prompts.render(
            PromptKey::CoverLetter,
            &json!({
                "resume_text": resume_text,
                "job_description": self.inputs.job_description,
                "company": self.inputs.company,
                "position": self.inputs.job_role,
            }),
        )?;

        let completion = self.services.generator.send_query(&prompt)?;
        let payload: LatexPayload = extract_payload(&completion.response)?;
        require("latex_code", &payload.latex_code)?;

        self.services.renderer.render(
            &payload.latex_code,
            ArtifactKind::CoverLetter,
            &self.inputs.output_dir,
        )
    }

    fn recovery(&self) -> RecoveryAction {
        RecoveryAction::new(
            Self::NAME,
            TaskInputs::CoverLetter(self.inputs.clone()),
            self.services.clone(),
            Self::rebuild,
        )
    }
}
