//! Research pipeline: runs the four phases and assembles the artifacts.
//!
//! Phases run strictly in sequence; each prompt is built only after the
//! previous phase's output has been recorded. The first failure aborts the
//! run: the session is marked failed, its outputs are dropped, a 0% progress
//! update is emitted and the error is returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::progress::{ProgressSink, ProgressUpdate, notify, notify_complete};
use super::prompts::{PriorOutputs, PromptSet, StandardPrompts};
use super::session::{AnalysisSession, Phase, SessionStatus};
use crate::artifacts::{ArtifactAssembler, Renderer};
use crate::config::{DEFAULT_ORGANIZATION, ResearchConfig};
use crate::error::{ConfigError, LlmError, ResearchError, Result};
use crate::history::{HistoryEntry, SessionStore, Settings};
use crate::providers::TextGenerator;
use crate::types::PhaseRequest;

/// Orchestrates a research run. Holds only shared, immutable collaborators,
/// so one pipeline can drive many sessions concurrently.
pub struct ResearchPipeline {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn SessionStore>,
    prompts: Arc<dyn PromptSet>,
    assembler: ArtifactAssembler,
    organization_name: Option<String>,
    model: Option<String>,
    phase_timeout: Duration,
}

impl ResearchPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn SessionStore>,
        config: &ResearchConfig,
    ) -> Self {
        Self {
            generator,
            store,
            prompts: Arc::new(StandardPrompts),
            assembler: ArtifactAssembler::default(),
            organization_name: config
                .organization_name
                .clone()
                .filter(|o| !o.trim().is_empty()),
            model: None,
            phase_timeout: Duration::from_secs(config.phase_timeout_secs),
        }
    }

    /// Replace the prompt source.
    pub fn with_prompts(mut self, prompts: Arc<dyn PromptSet>) -> Self {
        self.prompts = prompts;
        self
    }

    /// Replace the renderer used for documents and charts.
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.assembler = ArtifactAssembler::new(renderer);
        self
    }

    /// Use `model` for every phase, ahead of the stored settings.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = timeout;
        self
    }

    /// Create a pending session for `topic`.
    ///
    /// The organization name comes from the configuration, then the stored
    /// settings, then "Your Organization".
    pub async fn start_session(&self, topic: &str) -> Result<AnalysisSession> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ConfigError::Invalid {
                message: "research topic must not be blank".into(),
            }
            .into());
        }

        let organization = match &self.organization_name {
            Some(org) => org.clone(),
            None => self
                .settings()
                .await
                .organization_name
                .filter(|o| !o.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string()),
        };

        let session = AnalysisSession::new(topic, organization);
        info!(
            session_id = session.id.as_str(),
            topic = session.topic.as_str(),
            organization = session.organization.as_str(),
            "Research session started"
        );
        Ok(session)
    }

    /// Run the whole workflow for `topic` and return the completed session.
    pub async fn run_research(
        &self,
        topic: &str,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<AnalysisSession> {
        let mut session = self.start_session(topic).await?;
        self.drive(&mut session, progress, cancel).await?;
        Ok(session)
    }

    /// Drive a pending session to completion.
    ///
    /// On failure the session is left in `Failed` with its outputs cleared.
    pub async fn drive(
        &self,
        session: &mut AnalysisSession,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if session.status != SessionStatus::Pending {
            return Err(ResearchError::InvalidTransition {
                from: session.status.to_string(),
                to: "running".into(),
            });
        }

        let started = Instant::now();
        match self.execute(session, progress, cancel).await {
            Ok(()) => {
                info!(
                    session_id = session.id.as_str(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    artifacts = session.artifacts.len(),
                    "Research completed"
                );
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                if let Err(e) = session.fail(message.clone()) {
                    warn!(session_id = session.id.as_str(), error = %e, "Could not mark session failed");
                }
                warn!(
                    session_id = session.id.as_str(),
                    error = message.as_str(),
                    "Research failed"
                );
                notify(
                    progress,
                    ProgressUpdate::new(format!("Research failed: {}", message), 0),
                );
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        session: &mut AnalysisSession,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<()> {
        notify(
            progress,
            ProgressUpdate::new(format!("Initializing research for {}", session.topic), 10),
        );

        let model = match &self.model {
            Some(model) => Some(model.clone()),
            None => self.settings().await.model,
        };

        for phase in Phase::ALL {
            if cancel.is_cancelled() {
                info!(session_id = session.id.as_str(), %phase, "Research cancelled");
                return Err(ResearchError::Cancelled);
            }
            session.begin_phase(phase)?;
            let prompt = self.build_prompt(session, phase)?;
            let output = self.generate(session, phase, prompt, model.as_deref()).await?;
            session.record_phase(phase, output)?;
            notify(
                progress,
                ProgressUpdate::new(phase.completion_message(), phase.completion_percent()),
            );
        }

        if cancel.is_cancelled() {
            info!(session_id = session.id.as_str(), "Research cancelled before artifacts");
            return Err(ResearchError::Cancelled);
        }

        let artifacts = self.assembler.assemble(session)?;
        session.attach_artifacts(artifacts)?;
        session.complete()?;
        notify(progress, ProgressUpdate::new("Analysis complete", 100));

        if let Err(e) = self
            .store
            .append_history(HistoryEntry::from_session(session))
            .await
        {
            warn!(
                session_id = session.id.as_str(),
                error = %e,
                "Failed to record analysis in history"
            );
        }

        notify_complete(progress, session);
        Ok(())
    }

    /// Build the prompt for `phase` from the outputs already recorded.
    fn build_prompt(&self, session: &AnalysisSession, phase: Phase) -> Result<String> {
        let topic = session.topic.as_str();
        let prompt = match phase {
            Phase::MarketResearch => self.prompts.market_research(topic),
            Phase::VendorAnalysis => self
                .prompts
                .vendor_analysis(topic, session.require_output(Phase::MarketResearch)?),
            Phase::HypeCycle => self
                .prompts
                .hype_cycle(topic, session.require_output(Phase::MarketResearch)?),
            Phase::Summary => {
                let prior = PriorOutputs {
                    market_research: session.require_output(Phase::MarketResearch)?,
                    vendor_analysis: session.require_output(Phase::VendorAnalysis)?,
                    hype_cycle: session.require_output(Phase::HypeCycle)?,
                };
                self.prompts.summary(topic, &session.organization, &prior)
            }
        };
        Ok(prompt)
    }

    /// One generation call under the per-phase timeout.
    ///
    /// A blank completion fails the phase.
    async fn generate(
        &self,
        session: &AnalysisSession,
        phase: Phase,
        prompt: String,
        model: Option<&str>,
    ) -> Result<String> {
        let mut request = PhaseRequest::new(prompt, phase.params());
        if let Some(model) = model {
            request = request.with_model(model);
        }

        debug!(
            session_id = session.id.as_str(),
            %phase,
            prompt_chars = request.prompt_text.len(),
            max_tokens = request.max_output_tokens,
            "Starting phase"
        );

        let started = Instant::now();
        let completion =
            match tokio::time::timeout(self.phase_timeout, self.generator.complete(&request)).await
            {
                Ok(Ok(completion)) => completion,
                Ok(Err(source)) => return Err(ResearchError::Generation { phase, source }),
                Err(_) => {
                    return Err(ResearchError::Generation {
                        phase,
                        source: LlmError::transport(format!(
                            "no response within {}s",
                            self.phase_timeout.as_secs()
                        )),
                    });
                }
            };

        info!(
            session_id = session.id.as_str(),
            %phase,
            elapsed_ms = started.elapsed().as_millis() as u64,
            response_chars = completion.text.len(),
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "Phase completed"
        );
        if completion.text.trim().is_empty() {
            return Err(ResearchError::Generation {
                phase,
                source: LlmError::transport("empty completion"),
            });
        }
        Ok(completion.text)
    }

    /// Stored settings; a store failure reads as empty settings.
    async fn settings(&self) -> Settings {
        match self.store.get_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Failed to read settings; using defaults");
                Settings::default()
            }
        }
    }
}
