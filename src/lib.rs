//! # jobflow
//!
//! Job application pipeline: tailor a resume, optionally write a cover letter,
//! and email the result.
//!
//! Each stage calls an external text-generation service and may fail. Failures
//! go through a single [`FailureHandler`] that may retry the stage once; a
//! stage that still fails ends the run with `status == failed` and an error
//! message. The engine never returns an error from a run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jobflow::{build_workflow, Application, PipelineConfig, Services, WorkflowState};
//! # fn services() -> Services { unimplemented!() }
//!
//! let engine = build_workflow(&PipelineConfig::default(), services())?;
//!
//! let execution = engine.run(WorkflowState::new(Application {
//!     resume_file: "resume.tex".into(),
//!     job_role: "Engineer".into(),
//!     job_description: "Build reliable pipelines.".into(),
//!     company: "Acme".into(),
//!     receiver_email: "hiring@acme.example".into(),
//!     generate_cover_letter: true,
//!     send_email: true,
//! }));
//!
//! match execution.state.error_message() {
//!     Some(message) => eprintln!("failed: {message}"),
//!     None => println!("sent to {:?}", execution.state.delivered_to()),
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## YAML Configuration
//!
//! ```yaml
//! resume_dir: out/resumes
//! cover_letter_dir: out/letters
//! recovery:
//!   retry: [input, service, io]
//!   diagnose: false
//! prompts:
//!   email: |
//!     Draft an email for {{position}} at {{company}} ...
//! ```

pub mod config;
mod cover_letter;
mod dispatch;
mod engine;
mod error;
mod failure;
mod node;
mod prompt;
mod result;
mod resume;
mod services;
mod state;
mod task;
mod workflow;

#[cfg(test)]
mod test_support;

pub use config::{PipelineConfig, RecoveryConfig};
pub use cover_letter::{CoverLetterInputs, CoverLetterTask};
pub use dispatch::{DispatchInputs, DispatchTask};
pub use engine::{Engine, Execution, Next, Router, Transition, END};
pub use error::{ErrorKind, HandlerError, TaskError, WorkflowError};
pub use failure::{DiagnosticHandler, FailureHandler, Rebuild, RecoveryAction, TaskInputs};
pub use node::{BindTask, Node, NodeEnv, NodeId, TaskNode};
pub use prompt::{PromptBook, PromptKey, PromptTemplates};
pub use result::{TaskResult, TaskStatus};
pub use resume::{ResumeInputs, ResumeTask};
pub use services::{
    ArtifactKind, Completion, DocumentSource, FsDocuments, Mailer, OutgoingEmail, Renderer,
    Services, TextGenerator,
};
pub use state::{Application, RunStatus, WorkflowState};
pub use task::{extract_payload, Task};
pub use workflow::{
    build_workflow, build_workflow_with_handler, route_after_cover_letter, route_after_dispatch,
    route_after_resume, TRANSITIONS,
};
