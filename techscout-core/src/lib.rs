//! # TechScout Core
//!
//! Core library for the techscout research workflow.
//! Provides the four-phase research pipeline, prompt builders, the
//! text-generation clients, artifact assembly, the settings/history store,
//! configuration, and the credential-injecting proxy gateway.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod gateway;
pub mod history;
pub mod persistence;
pub mod providers;
pub mod research;
pub mod types;

// Re-export commonly used types at the crate root.
pub use artifacts::{
    AnalysisExport, ArtifactAssembler, ArtifactKind, ArtifactLabel, ArtifactRef, Renderer,
    SvgRenderer,
};
pub use config::{ConfigOverrides, DocumentFormat, TechScoutConfig, load_config};
pub use error::{ArtifactError, ConfigError, LlmError, ResearchError, Result, StoreError};
pub use history::{FileSessionStore, HistoryEntry, InMemorySessionStore, SessionStore, Settings};
pub use providers::{MockGenerator, TextGenerator, create_generator};
pub use research::{
    AnalysisSession, ChannelProgress, NoOpProgress, Phase, ProgressSink, ProgressUpdate,
    ResearchEvent, ResearchPipeline, SessionStatus,
};
pub use types::{Completion, GenerationParams, PhaseRequest, TokenUsage};
