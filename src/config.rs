//! Pipeline configuration loaded from YAML.

use crate::error::ErrorKind;
use crate::prompt::PromptTemplates;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`PipelineConfig::resume_dir`].
pub const RESUME_DIR_ENV: &str = "RESUME_DIR";

/// Environment variable overriding [`PipelineConfig::cover_letter_dir`].
pub const COVER_LETTER_DIR_ENV: &str = "COVER_LETTER_DIR";

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where refined resumes are rendered
    pub resume_dir: PathBuf,

    /// Where cover letters are rendered
    pub cover_letter_dir: PathBuf,

    /// Failure handler policy
    pub recovery: RecoveryConfig,

    /// Prompt template overrides
    pub prompts: PromptTemplates,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resume_dir: PathBuf::from("."),
            cover_letter_dir: PathBuf::from("."),
            recovery: RecoveryConfig::default(),
            prompts: PromptTemplates::default(),
        }
    }
}

/// Which failures get their single recovery attempt, and whether to diagnose first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Error kinds that get one retry through the recovery action
    pub retry: Vec<ErrorKind>,

    /// Ask the text service to diagnose each failure before deciding
    pub diagnose: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            retry: vec![ErrorKind::Input, ErrorKind::Service, ErrorKind::Io],
            diagnose: false,
        }
    }
}

impl RecoveryConfig {
    /// Whether failures of `kind` get a retry. Handler failures never do.
    pub fn retries(&self, kind: ErrorKind) -> bool {
        kind != ErrorKind::Handler && self.retry.contains(&kind)
    }
}

impl PipelineConfig {
    /// Apply `RESUME_DIR` / `COVER_LETTER_DIR` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os(RESUME_DIR_ENV) {
            self.resume_dir = PathBuf::from(dir);
        }
        if let Some(dir) = std::env::var_os(COVER_LETTER_DIR_ENV) {
            self.cover_letter_dir = PathBuf::from(dir);
        }
        self
    }
}

/// Parse a configuration from a YAML string.
///
/// # Example
///
/// ```rust
/// use jobflow::config::parse_yaml;
///
/// let yaml = r#"
/// resume_dir: out/resumes
/// recovery:
///   retry: [service, io]
/// "#;
///
/// let config = parse_yaml(yaml).unwrap();
/// assert_eq!(config.resume_dir.to_str(), Some("out/resumes"));
/// assert!(!config.recovery.diagnose);
/// ```
pub fn parse_yaml(yaml: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig =
        serde_yaml::from_str(yaml).context("Failed to parse pipeline config YAML")?;

    validate(&config)?;

    Ok(config)
}

/// Load a configuration file, then apply environment overrides.
pub fn load_file(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_yaml(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config.with_env_overrides())
}

/// Validate a configuration.
fn validate(config: &PipelineConfig) -> Result<()> {
    if config.resume_dir.as_os_str().is_empty() {
        anyhow::bail!("resume_dir cannot be empty");
    }

    if config.cover_letter_dir.as_os_str().is_empty() {
        anyhow::bail!("cover_letter_dir cannot be empty");
    }

    if config.recovery.retry.contains(&ErrorKind::Handler) {
        anyhow::bail!("handler failures are never retried; remove 'handler' from recovery.retry");
    }

    config
        .prompts
        .compile_all()
        .context("Invalid prompt template")?;

    Ok(())
}
