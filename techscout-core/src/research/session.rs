//! Analysis session state and lifecycle.
//!
//! A session moves `Pending -> Running(phase) -> Completed | Failed`. Phase
//! outputs are recorded in strict order and the session refuses every
//! mutation once it reaches a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::artifacts::{ArtifactLabel, ArtifactRef};
use crate::error::{ResearchError, Result};
use crate::types::GenerationParams;

/// One round trip to the text-generation service within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    MarketResearch,
    VendorAnalysis,
    HypeCycle,
    Summary,
}

/// Generation policy for a phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhasePolicy {
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Word limit stated in the prompt.
    pub max_words: u32,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 4] = [
        Phase::MarketResearch,
        Phase::VendorAnalysis,
        Phase::HypeCycle,
        Phase::Summary,
    ];

    /// 1-based position in the pipeline.
    pub fn index(self) -> usize {
        match self {
            Phase::MarketResearch => 1,
            Phase::VendorAnalysis => 2,
            Phase::HypeCycle => 3,
            Phase::Summary => 4,
        }
    }

    /// Phases that must have completed before this one starts.
    pub fn predecessors(self) -> &'static [Phase] {
        match self {
            Phase::MarketResearch => &[],
            Phase::VendorAnalysis => &[Phase::MarketResearch],
            Phase::HypeCycle => &[Phase::MarketResearch, Phase::VendorAnalysis],
            Phase::Summary => &[
                Phase::MarketResearch,
                Phase::VendorAnalysis,
                Phase::HypeCycle,
            ],
        }
    }

    pub fn policy(self) -> PhasePolicy {
        let (max_output_tokens, temperature, max_words) = match self {
            Phase::MarketResearch => (1200, 0.3, 800),
            Phase::VendorAnalysis => (1000, 0.3, 650),
            Phase::HypeCycle => (800, 0.2, 500),
            Phase::Summary => (1000, 0.2, 650),
        };
        PhasePolicy {
            max_output_tokens,
            temperature,
            max_words,
        }
    }

    pub fn params(self) -> GenerationParams {
        let policy = self.policy();
        GenerationParams::new(policy.max_output_tokens, policy.temperature)
    }

    /// Progress reported once this phase has finished.
    pub fn completion_percent(self) -> u8 {
        match self {
            Phase::MarketResearch => 30,
            Phase::VendorAnalysis => 50,
            Phase::HypeCycle => 70,
            Phase::Summary => 90,
        }
    }

    pub fn completion_message(self) -> &'static str {
        match self {
            Phase::MarketResearch => "Completing market landscape analysis",
            Phase::VendorAnalysis => "Analyzing vendor ecosystem",
            Phase::HypeCycle => "Generating hype cycle positioning",
            Phase::Summary => "Creating strategic whitepaper",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::MarketResearch => "market research",
            Phase::VendorAnalysis => "vendor analysis",
            Phase::HypeCycle => "hype-cycle",
            Phase::Summary => "summary",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "phase")]
pub enum SessionStatus {
    Pending,
    Running(Phase),
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    /// Short lowercase label: `pending`, `running`, `completed`, `failed`.
    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Running(_) => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Running(phase) => {
                write!(f, "running ({}/4: {})", phase.index(), phase)
            }
            other => f.write_str(other.label()),
        }
    }
}

/// One end-to-end invocation of the research workflow for a topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSession {
    /// `analysis_<epoch-millis>_<9 random alphanumerics>`.
    pub id: String,
    pub topic: String,
    /// Organization the analysis is written for.
    pub organization: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: SessionStatus,
    /// Phase outputs keyed in execution order.
    pub phase_outputs: BTreeMap<Phase, String>,
    /// Populated only once all four phases have succeeded.
    pub artifacts: BTreeMap<ArtifactLabel, ArtifactRef>,
    /// Failure message when `status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisSession {
    pub fn new(topic: impl Into<String>, organization: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_session_id(now),
            topic: topic.into(),
            organization: organization.into(),
            created_at: now,
            updated_at: now,
            status: SessionStatus::Pending,
            phase_outputs: BTreeMap::new(),
            artifacts: BTreeMap::new(),
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn phase_output(&self, phase: Phase) -> Option<&str> {
        self.phase_outputs.get(&phase).map(String::as_str)
    }

    /// Output of an earlier phase that a later prompt depends on.
    ///
    /// A missing output is an `InvalidTransition`, never an empty string.
    pub fn require_output(&self, phase: Phase) -> Result<&str> {
        self.phase_output(phase)
            .ok_or_else(|| ResearchError::InvalidTransition {
                from: self.status.to_string(),
                to: format!("read {} output", phase),
            })
    }

    /// Move into `Running(phase)`. Every predecessor must already be recorded
    /// and the phase itself must not be.
    pub fn begin_phase(&mut self, phase: Phase) -> Result<()> {
        self.ensure_mutable(&format!("running ({})", phase))?;
        let ready = phase
            .predecessors()
            .iter()
            .all(|p| self.phase_outputs.contains_key(p));
        if !ready || self.phase_outputs.contains_key(&phase) {
            return Err(self.invalid(format!("running ({})", phase)));
        }
        self.set_status(SessionStatus::Running(phase));
        Ok(())
    }

    /// Record the output of the phase currently running.
    pub fn record_phase(&mut self, phase: Phase, output: impl Into<String>) -> Result<()> {
        if self.status != SessionStatus::Running(phase) {
            return Err(self.invalid(format!("record {} output", phase)));
        }
        self.phase_outputs.insert(phase, output.into());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// True once every phase has recorded its output.
    pub fn all_phases_recorded(&self) -> bool {
        Phase::ALL.iter().all(|p| self.phase_outputs.contains_key(p))
    }

    pub fn attach_artifacts(
        &mut self,
        artifacts: BTreeMap<ArtifactLabel, ArtifactRef>,
    ) -> Result<()> {
        self.ensure_mutable("attach artifacts")?;
        if !self.all_phases_recorded() {
            return Err(self.invalid("attach artifacts".to_string()));
        }
        self.artifacts = artifacts;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self) -> Result<()> {
        self.ensure_mutable("completed")?;
        if !self.all_phases_recorded() || self.artifacts.is_empty() {
            return Err(self.invalid("completed".to_string()));
        }
        self.set_status(SessionStatus::Completed);
        Ok(())
    }

    /// Mark the session failed. Outputs computed before the failure are
    /// dropped along with any artifacts.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.ensure_mutable("failed")?;
        self.phase_outputs.clear();
        self.artifacts.clear();
        self.error = Some(error.into());
        self.set_status(SessionStatus::Failed);
        Ok(())
    }

    fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    fn ensure_mutable(&self, to: &str) -> Result<()> {
        if self.is_terminal() {
            return Err(self.invalid(to.to_string()));
        }
        Ok(())
    }

    fn invalid(&self, to: String) -> ResearchError {
        ResearchError::InvalidTransition {
            from: self.status.to_string(),
            to,
        }
    }
}

/// Build a session identifier: `analysis_<epoch-millis>_<9 random chars>`.
pub fn generate_session_id(now: DateTime<Utc>) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("analysis_{}_{}", now.timestamp_millis(), &random[..9])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ArtifactKind, ArtifactRef};
    use bytes::Bytes;

    fn session_with_outputs() -> AnalysisSession {
        let mut session = AnalysisSession::new("Edge AI", "Acme");
        for phase in Phase::ALL {
            session.begin_phase(phase).unwrap();
            session.record_phase(phase, format!("{} text", phase)).unwrap();
        }
        session
    }

    fn one_artifact(session: &AnalysisSession) -> BTreeMap<ArtifactLabel, ArtifactRef> {
        let mut map = BTreeMap::new();
        map.insert(
            ArtifactLabel::AnalysisData,
            ArtifactRef::new(
                &session.id,
                ArtifactKind::Data,
                "Edge AI_Analysis_Data.json",
                Bytes::from_static(b"{}"),
            ),
        );
        map
    }

    #[test]
    fn test_phase_order_and_policy() {
        assert_eq!(Phase::ALL.map(Phase::index), [1, 2, 3, 4]);
        assert!(Phase::MarketResearch < Phase::Summary);
        assert_eq!(Phase::HypeCycle.predecessors(), &[Phase::MarketResearch, Phase::VendorAnalysis]);
        assert_eq!(Phase::MarketResearch.policy().max_output_tokens, 1200);
        assert_eq!(Phase::HypeCycle.policy().max_words, 500);
        assert!((Phase::Summary.params().temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(Phase::ALL.map(Phase::completion_percent), [30, 50, 70, 90]);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::MarketResearch.to_string(), "market research");
        assert_eq!(Phase::HypeCycle.to_string(), "hype-cycle");
        assert_eq!(
            serde_json::to_string(&Phase::VendorAnalysis).unwrap(),
            "\"vendor_analysis\""
        );
    }

    #[test]
    fn test_session_id_format() {
        let session = AnalysisSession::new("Quantum Networking", "Acme");
        let parts: Vec<&str> = session.id.splitn(3, '_').collect();
        assert_eq!(parts[0], "analysis");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(session.id, AnalysisSession::new("Quantum Networking", "Acme").id);
    }

    #[test]
    fn test_session_lifecycle() {
        let mut session = session_with_outputs();
        assert_eq!(session.status, SessionStatus::Running(Phase::Summary));
        assert_eq!(
            session.phase_outputs.keys().copied().collect::<Vec<_>>(),
            Phase::ALL.to_vec()
        );

        let artifacts = one_artifact(&session);
        session.attach_artifacts(artifacts).unwrap();
        session.complete().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.is_terminal());
    }

    #[test]
    fn test_phase_out_of_order_rejected() {
        let mut session = AnalysisSession::new("Edge AI", "Acme");
        let err = session.begin_phase(Phase::VendorAnalysis).unwrap_err();
        assert!(matches!(err, ResearchError::InvalidTransition { .. }));
        assert_eq!(session.status, SessionStatus::Pending);
    }

    #[test]
    fn test_record_requires_running_phase() {
        let mut session = AnalysisSession::new("Edge AI", "Acme");
        session.begin_phase(Phase::MarketResearch).unwrap();
        assert!(session.record_phase(Phase::VendorAnalysis, "x").is_err());
        session.record_phase(Phase::MarketResearch, "market").unwrap();
        assert!(session.begin_phase(Phase::MarketResearch).is_err());
    }

    #[test]
    fn test_require_output_missing() {
        let session = AnalysisSession::new("Edge AI", "Acme");
        let err = session.require_output(Phase::MarketResearch).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid session transition: pending -> read market research output"
        );
    }

    #[test]
    fn test_fail_clears_outputs() {
        let mut session = AnalysisSession::new("Edge AI", "Acme");
        session.begin_phase(Phase::MarketResearch).unwrap();
        session.record_phase(Phase::MarketResearch, "market").unwrap();
        session.fail("boom").unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert!(session.phase_outputs.is_empty());
        assert_eq!(session.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_terminal_session_is_immutable() {
        let mut session = AnalysisSession::new("Edge AI", "Acme");
        session.fail("boom").unwrap();
        assert!(session.begin_phase(Phase::MarketResearch).is_err());
        assert!(session.fail("again").is_err());

        let mut done = session_with_outputs();
        let artifacts = one_artifact(&done);
        done.attach_artifacts(artifacts).unwrap();
        done.complete().unwrap();
        assert!(done.attach_artifacts(BTreeMap::new()).is_err());
        assert!(done.fail("late").is_err());
        assert_eq!(done.phase_outputs.len(), 4);
    }

    #[test]
    fn test_complete_requires_artifacts() {
        let mut session = session_with_outputs();
        assert!(session.complete().is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            SessionStatus::Running(Phase::VendorAnalysis).to_string(),
            "running (2/4: vendor analysis)"
        );
        assert_eq!(SessionStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn test_session_serializes_phase_keys() {
        let session = session_with_outputs();
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["phase_outputs"]["market_research"], "market research text");
        assert_eq!(json["status"]["state"], "running");
        assert_eq!(json["status"]["phase"], "summary");
    }
}
