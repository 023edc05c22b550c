//! Research workflow: four-phase technology analysis pipeline.
//!
//! Orchestrates a sequential research process:
//! 1. **Market research**: market landscape for the topic
//! 2. **Vendor analysis**: vendor ecosystem, grounded in the market research
//! 3. **Hype cycle**: maturity positioning, grounded in the market research
//! 4. **Summary**: executive whitepaper built from all three
//!
//! Each phase's output is threaded into later prompts. After the fourth phase
//! the artifacts are assembled and the run is recorded in history.

pub mod engine;
pub mod progress;
pub mod prompts;
pub mod session;

pub use engine::ResearchPipeline;
pub use progress::{
    ChannelProgress, NoOpProgress, ProgressSink, ProgressUpdate, RecordingProgress, ResearchEvent,
};
pub use prompts::{PriorOutputs, PromptSet, StandardPrompts};
pub use session::{AnalysisSession, Phase, PhasePolicy, SessionStatus};
