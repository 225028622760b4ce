//! Prompt templates for the generative text service.

use crate::error::TaskError;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use std::fmt;

const RESUME_TEMPLATE: &str = r#"You are an expert technical recruiter and LaTeX typesetter.
Tailor the following LaTeX resume for the position of {{position}}.

Job description:
{{job_description}}

Resume (LaTeX):
{{resume_latex_code}}

Keep every fact truthful, reorder and rephrase to match the role, and keep the document compilable.
Respond with a single JSON object: {"latex_code": "<the complete tailored LaTeX document>"}"#;

const COVER_LETTER_TEMPLATE: &str = r#"Write a one-page cover letter in LaTeX for the position of {{position}} at {{company}}.

Job description:
{{job_description}}

Candidate resume:
{{resume_text}}

Respond with a single JSON object: {"latex_code": "<the complete LaTeX document>"}"#;

const EMAIL_TEMPLATE: &str = r#"Draft a short, professional application email for the position of {{position}} at {{company}}.
The resume is attached; do not repeat it, highlight the two or three most relevant strengths.

Job description:
{{job_description}}

Candidate resume:
{{resume_text}}

Respond with a single JSON object: {"email_subject": "<subject line>", "html_code": "<HTML email body>"}"#;

/// Which prompt to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKey {
    Resume,
    CoverLetter,
    Email,
}

impl PromptKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resume => "resume_generator",
            Self::CoverLetter => "cover_letter_generator",
            Self::Email => "email_generator",
        }
    }
}

impl fmt::Display for PromptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Template sources, overridable from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    pub resume: String,
    pub cover_letter: String,
    pub email: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            resume: RESUME_TEMPLATE.to_string(),
            cover_letter: COVER_LETTER_TEMPLATE.to_string(),
            email: EMAIL_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    pub fn get(&self, key: PromptKey) -> &str {
        match key {
            PromptKey::Resume => &self.resume,
            PromptKey::CoverLetter => &self.cover_letter,
            PromptKey::Email => &self.email,
        }
    }

    /// Check that every template parses.
    pub fn compile_all(&self) -> Result<(), handlebars::TemplateError> {
        for key in [PromptKey::Resume, PromptKey::CoverLetter, PromptKey::Email] {
            handlebars::Template::compile(self.get(key))?;
        }
        Ok(())
    }
}

/// Renders prompts. Strict: a template referencing a missing variable fails.
pub struct PromptBook {
    templates: PromptTemplates,
    handlebars: Handlebars<'static>,
}

impl PromptBook {
    pub fn new(templates: PromptTemplates) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // Prompts are plain text, not HTML.
        handlebars.register_escape_fn(handlebars::no_escape);

        Self {
            templates,
            handlebars,
        }
    }

    /// Render the prompt for `key` with `data`.
    pub fn render<T: Serialize>(&self, key: PromptKey, data: &T) -> Result<String, TaskError> {
        self.handlebars
            .render_template(self.templates.get(key), data)
            .map_err(|e| TaskError::Prompt {
                template: key.to_string(),
                message: e.to_string(),
            })
    }
}

impl Default for PromptBook {
    fn default() -> Self {
        Self::new(PromptTemplates::default())
    }
}

impl fmt::Debug for PromptBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptBook")
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}
