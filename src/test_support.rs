//! In-memory collaborators for tests.

use crate::cover_letter::CoverLetterInputs;
use crate::dispatch::DispatchInputs;
use crate::error::TaskError;
use crate::resume::ResumeInputs;
use crate::services::{
    ArtifactKind, Completion, DocumentSource, Mailer, OutgoingEmail, Renderer, Services,
    TextGenerator,
};
use crate::state::Application;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub(crate) const SOURCE_RESUME: &str = "\\documentclass{article}\\begin{document}Rust engineer\\end{document}";

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Replies in order; errors once the script runs out.
pub(crate) struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, TaskError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, TaskError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn send_query(&self, prompt: &str) -> Result<Completion, TaskError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TaskError::Service("no scripted reply".to_string())));
        reply.map(|response| Completion { response })
    }
}

/// Documents and rendered artifacts share one in-memory file map, so a rendered
/// resume can be read back by later tasks.
pub(crate) struct Workspace {
    files: Mutex<HashMap<String, String>>,
    extracts: Mutex<usize>,
    render_failures: Mutex<usize>,
    renders: Mutex<Vec<ArtifactKind>>,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            extracts: Mutex::new(0),
            render_failures: Mutex::new(0),
            renders: Mutex::new(Vec::new()),
        }
    }

    /// A workspace holding `r.tex`.
    pub fn with_resume() -> Self {
        let workspace = Self::new();
        workspace.insert("r.tex", SOURCE_RESUME);
        workspace
    }

    pub fn insert(&self, reference: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(reference.to_string(), content.to_string());
    }

    pub fn get(&self, reference: &str) -> Option<String> {
        self.files.lock().unwrap().get(reference).cloned()
    }

    /// Number of `extract` calls so far, found or not.
    pub fn extracts(&self) -> usize {
        *self.extracts.lock().unwrap()
    }

    /// Fail the next `n` renders.
    pub fn fail_renders(&self, n: usize) {
        *self.render_failures.lock().unwrap() = n;
    }

    pub fn renders(&self) -> Vec<ArtifactKind> {
        self.renders.lock().unwrap().clone()
    }
}

impl DocumentSource for Workspace {
    fn extract(&self, reference: &str) -> Result<String, TaskError> {
        *self.extracts.lock().unwrap() += 1;
        self.get(reference).ok_or_else(|| TaskError::NotFound {
            reference: reference.to_string(),
        })
    }
}

impl Renderer for Workspace {
    fn render(
        &self,
        content: &str,
        kind: ArtifactKind,
        destination: &Path,
    ) -> Result<String, TaskError> {
        self.renders.lock().unwrap().push(kind);
        {
            let mut failures = self.render_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(TaskError::Render {
                    kind: kind.to_string(),
                    message: "latex compilation failed".to_string(),
                });
            }
        }

        let path = destination
            .join(format!("{}.pdf", kind.as_str()))
            .display()
            .to_string();
        self.insert(&path, content);
        Ok(path)
    }
}

/// Records delivered email; can be told to fail.
pub(crate) struct FakeMailer {
    failures: Mutex<usize>,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl FakeMailer {
    pub fn new() -> Self {
        Self {
            failures: Mutex::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next `n` deliveries.
    pub fn fail_deliveries(&self, n: usize) {
        *self.failures.lock().unwrap() = n;
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for FakeMailer {
    fn deliver(&self, email: &OutgoingEmail) -> Result<(), TaskError> {
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(TaskError::Delivery {
                recipient: email.recipient.clone(),
                message: "connection refused".to_string(),
            });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub(crate) fn services(
    workspace: Arc<Workspace>,
    generator: Arc<ScriptedGenerator>,
    mailer: Arc<FakeMailer>,
) -> Services {
    Services::new(workspace.clone(), generator, workspace, mailer)
}

/// A chatty reply wrapping `{"latex_code": code}`.
pub(crate) fn latex_reply(code: &str) -> Result<String, TaskError> {
    Ok(format!(
        "Here is the document you asked for:\n{}\nLet me know if you need changes.",
        json!({ "latex_code": code })
    ))
}

pub(crate) fn email_reply() -> Result<String, TaskError> {
    Ok(json!({
        "email_subject": "Application: Engineer",
        "html_code": "<p>Hello Acme team</p>",
    })
    .to_string())
}

pub(crate) fn application(generate_cover_letter: bool, send_email: bool) -> Application {
    Application {
        resume_file: "r.tex".to_string(),
        job_role: "Engineer".to_string(),
        job_description: "Build reliable pipelines in Rust.".to_string(),
        company: "Acme".to_string(),
        receiver_email: "x@y.com".to_string(),
        generate_cover_letter,
        send_email,
    }
}

pub(crate) fn resume_inputs() -> ResumeInputs {
    ResumeInputs {
        resume_file: "r.tex".to_string(),
        job_role: "Engineer".to_string(),
        job_description: "Build reliable pipelines in Rust.".to_string(),
        output_dir: PathBuf::from("out/resumes"),
    }
}

pub(crate) fn cover_letter_inputs() -> CoverLetterInputs {
    CoverLetterInputs {
        refined_resume_path: "out/resumes/resume.pdf".to_string(),
        job_role: "Engineer".to_string(),
        job_description: "Build reliable pipelines in Rust.".to_string(),
        company: "Acme".to_string(),
        output_dir: PathBuf::from("out/letters"),
    }
}

pub(crate) fn dispatch_inputs() -> DispatchInputs {
    DispatchInputs {
        resume_path: "out/resumes/resume.pdf".to_string(),
        position: "Engineer".to_string(),
        job_description: "Build reliable pipelines in Rust.".to_string(),
        company: "Acme".to_string(),
        receiver_email: "x@y.com".to_string(),
        attach_cover_letter: false,
        cover_letter_path: None,
    }
}
