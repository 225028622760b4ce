//! Email dispatch task.
//!
//! Delivery is not idempotent. If a failure happens after the mailer accepted
//! the message, the recovery attempt sends it a second time.

use crate::error::{HandlerError, TaskError};
use crate::failure::{RecoveryAction, TaskInputs};
use crate::prompt::PromptKey;
use crate::services::{OutgoingEmail, Services};
use crate::task::{extract_payload, require, EmailPayload, Task};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

/// Inputs of an email dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchInputs {
    pub resume_path: String,
    pub position: String,
    pub job_description: String,
    pub company: String,
    pub receiver_email: String,
    pub attach_cover_letter: bool,
    pub cover_letter_path: Option<String>,
}

impl DispatchInputs {
    fn attachments(&self) -> Result<Vec<PathBuf>, TaskError> {
        let mut attachments = vec![PathBuf::from(&self.resume_path)];
        if self.attach_cover_letter {
            let path = self
                .cover_letter_path
                .as_ref()
                .ok_or(TaskError::MissingInput("cover_letter_path"))?;
            attachments.push(PathBuf::from(path));
        }
        Ok(attachments)
    }
}

/// Drafts an application email and sends it with the resume attached.
///
/// The artifact is the recipient address.
pub struct DispatchTask {
    inputs: DispatchInputs,
    services: Services,
}

impl DispatchTask {
    pub const NAME: &'static str = "dispatch";

    pub fn new(inputs: DispatchInputs, services: Services) -> Self {
        Self { inputs, services }
    }

    pub fn rebuild(inputs: &TaskInputs, services: &Services) -> Result<Box<dyn Task>, HandlerError> {
        match inputs {
            TaskInputs::Dispatch(inputs) => Ok(Box::new(Self::new(inputs.clone(), services.clone()))),
            other => Err(HandlerError::InputMismatch {
                task: Self::NAME,
                found: other.task_name(),
            }),
        }
    }
}

impl Task for DispatchTask {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn attempt(&self) -> Result<String, TaskError> {
        let attachments = self.inputs.attachments()?;
        let resume_text = self.services.documents.extract(&self.inputs.resume_path)?;

        let prompt = self.services.prompts.render(
            PromptKey::Email,
            &json!({
                "resume_text": resume_text,
                "job_description": self.inputs.job_description,
                "position": self.inputs.position,
                "company": self.inputs.company,
            }),
        )?;

        let completion = self.services.generator.send_query(&prompt)?;
        let draft: EmailPayload = extract_payload(&completion.response)?;
        require("email_subject", &draft.email_subject)?;
        require("html_code", &draft.html_code)?;

        let email = OutgoingEmail {
            recipient: self.inputs.receiver_email.clone(),
            subject: draft.email_subject,
            body: draft.html_code,
            attachments,
        };
        self.services.mailer.deliver(&email)?;

        tracing::info!(recipient = %email.recipient, attachments = email.attachments.len(), "Email sent");
        Ok(email.recipient)
    }

    fn recovery(&self) -> RecoveryAction {
        RecoveryAction::new(
            Self::NAME,
            TaskInputs::Dispatch(self.inputs.clone()),
            self.services.clone(),
            Self::rebuild,
        )
    }
}
