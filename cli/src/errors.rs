//! Error types for dockhand
//!
//! Every variant here is fatal: it aborts the run and surfaces as exit code 1.
//! Conditions the pipeline tolerates (stopping an absent container, a failed
//! diagnostic probe) never become a `DeployError`; they are recorded as stage
//! warnings instead.

use thiserror::Error;

/// Main error type for dockhand
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Prompt error: {0}")]
    PromptError(String),

    #[error("Source error: {0}")]
    SourceError(String),

    #[error("Preflight error: {0}")]
    PreflightError(String),

    #[error("Remote error: {0}")]
    RemoteError(String),

    #[error("Archive error: {0}")]
    ArchiveError(String),

    #[error("Build error: {0}")]
    BuildError(String),

    #[error("Proxy error: {0}")]
    ProxyError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::PromptError(err.to_string())
    }
}
