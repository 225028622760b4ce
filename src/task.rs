//! The task contract and structured-payload helpers.

use crate::error::TaskError;
use crate::failure::{FailureHandler, RecoveryAction};
use crate::result::TaskResult;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// One unit of external, fallible work bound to its inputs at construction.
pub trait Task {
    /// Task category, used for diagnostics.
    fn name(&self) -> &'static str;

    /// The fallible body. Returns the artifact reference on success.
    fn attempt(&self) -> Result<String, TaskError>;

    /// A recovery action that rebuilds an equivalent task from the same inputs.
    fn recovery(&self) -> RecoveryAction;

    /// Execute the task. Never fails: errors are handed to `handler` and come back
    /// as a [`TaskResult`].
    fn run(&self, handler: &dyn FailureHandler) -> TaskResult {
        let error = match self.attempt() {
            Ok(artifact) => return TaskResult::success(artifact),
            Err(error) => error,
        };

        match handler.handle(error, self.name(), self.recovery()) {
            Ok(result) => result,
            Err(secondary) => {
                tracing::error!(
                    severity = "critical",
                    task = self.name(),
                    error = %secondary,
                    "Diagnostic handling failed"
                );
                TaskResult::failed(secondary.to_string())
            }
        }
    }
}

/// `{ "latex_code": ... }` returned for rendered documents.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LatexPayload {
    pub latex_code: String,
}

/// `{ "email_subject": ..., "html_code": ... }` returned for email drafts.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EmailPayload {
    pub email_subject: String,
    pub html_code: String,
}

/// Locate the JSON object embedded in free text and deserialize it.
///
/// The object spans from the first `{` to the last `}`.
pub fn extract_payload<T: DeserializeOwned>(raw: &str) -> Result<T, TaskError> {
    let span = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => {
            return Err(TaskError::Payload(
                "no JSON object found in service response".to_string(),
            ))
        }
    };

    serde_json::from_str(span).map_err(|e| TaskError::Payload(e.to_string()))
}

/// Reject blank required payload fields.
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), TaskError> {
    if value.trim().is_empty() {
        return Err(TaskError::Payload(format!("'{field}' is empty")));
    }
    Ok(())
}
