//! External collaborators and the bundle injected into tasks.

use crate::error::TaskError;
use crate::prompt::{PromptBook, PromptTemplates};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extracts text from a document reference.
pub trait DocumentSource: Send + Sync {
    fn extract(&self, reference: &str) -> Result<String, TaskError>;
}

/// Response from a generative text service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub response: String,
}

/// Generative text service connector.
///
/// Output is free text; callers locate any structured payload themselves.
pub trait TextGenerator: Send + Sync {
    fn send_query(&self, prompt: &str) -> Result<Completion, TaskError>;
}

/// Kind of document handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Resume,
    CoverLetter,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::CoverLetter => "cover_letter",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders generated markup into a document and returns its reference.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        content: &str,
        kind: ArtifactKind,
        destination: &Path,
    ) -> Result<String, TaskError>;
}

/// An email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub recipient: String,
    pub subject: String,
    /// HTML body.
    pub body: String,
    pub attachments: Vec<PathBuf>,
}

/// Delivers email with attachments.
pub trait Mailer: Send + Sync {
    fn deliver(&self, email: &OutgoingEmail) -> Result<(), TaskError>;
}

/// Collaborators injected into every task at construction.
#[derive(Clone)]
pub struct Services {
    pub documents: Arc<dyn DocumentSource>,
    pub generator: Arc<dyn TextGenerator>,
    pub renderer: Arc<dyn Renderer>,
    pub mailer: Arc<dyn Mailer>,
    pub prompts: Arc<PromptBook>,
}

impl Services {
    /// Bundle collaborators with the default prompt templates.
    pub fn new(
        documents: Arc<dyn DocumentSource>,
        generator: Arc<dyn TextGenerator>,
        renderer: Arc<dyn Renderer>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            documents,
            generator,
            renderer,
            mailer,
            prompts: Arc::new(PromptBook::default()),
        }
    }

    pub fn with_prompts(mut self, templates: PromptTemplates) -> Self {
        self.prompts = Arc::new(PromptBook::new(templates));
        self
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

/// Reads plain-text and LaTeX documents from the local filesystem.
///
/// Only UTF-8 content is accepted; anything else fails with
/// [`TaskError::Parse`]. The cover-letter and dispatch stages read the
/// renderer's output back, so pairing this source with a renderer that writes
/// PDFs needs a text-extracting [`DocumentSource`] instead, or a renderer whose
/// artifacts are text-readable.
#[derive(Debug, Clone, Default)]
pub struct FsDocuments {
    root: Option<PathBuf>,
}

impl FsDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative references against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, reference: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(reference),
            None => PathBuf::from(reference),
        }
    }
}

impl DocumentSource for FsDocuments {
    fn extract(&self, reference: &str) -> Result<String, TaskError> {
        let path = self.resolve(reference);
        if !path.is_file() {
            return Err(TaskError::NotFound {
                reference: reference.to_string(),
            });
        }

        std::fs::read_to_string(&path).map_err(|e| TaskError::Parse {
            reference: reference.to_string(),
            message: e.to_string(),
        })
    }
}
