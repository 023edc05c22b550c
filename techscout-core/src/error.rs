//! Error types for the techscout core.
//!
//! Uses `thiserror` for public API error types with one enum per domain
//! (configuration, text generation, artifacts, storage). The pipeline returns
//! [`ResearchError`]; store failures during a run are logged rather than
//! propagated, so `StoreError` surfaces only from direct store calls.

use crate::research::Phase;

/// Top-level error type for a research run.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{phase} phase failed: {source}")]
    Generation {
        phase: Phase,
        #[source]
        source: LlmError,
    },

    #[error("Artifact generation error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Research was cancelled")]
    Cancelled,

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl ResearchError {
    /// The underlying generation error, if this run failed inside a phase.
    pub fn llm_error(&self) -> Option<&LlmError> {
        match self {
            ResearchError::Generation { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The phase that failed, if the failure happened during generation.
    pub fn failed_phase(&self) -> Option<Phase> {
        match self {
            ResearchError::Generation { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Errors from the text-generation service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LlmError {
    /// The call could not be completed: network failure, timeout, or an
    /// envelope that does not have the expected shape.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The remote service answered with a non-success status.
    #[error("Upstream error {status_code}: {message}")]
    Upstream { status_code: u16, message: String },
}

impl LlmError {
    pub fn transport(message: impl Into<String>) -> Self {
        LlmError::Transport {
            message: message.into(),
        }
    }

    /// HTTP-like status of an upstream failure.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LlmError::Upstream { status_code, .. } => Some(*status_code),
            LlmError::Transport { .. } => None,
        }
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API credential not configured (set {var} or llm.api_key)")]
    MissingCredential { var: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration load error: {message}")]
    Load { message: String },
}

/// Errors raised while turning a completed analysis into artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to render {artifact}: {message}")]
    Render { artifact: String, message: String },

    #[error("Failed to serialize analysis data: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from the settings/history store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store data is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A type alias for results using the top-level `ResearchError`.
pub type Result<T> = std::result::Result<T, ResearchError>;
