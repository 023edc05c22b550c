//! End-to-end tests of the research pipeline against a scripted generator.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use async_trait::async_trait;
use techscout_core::artifacts::{AnalysisExport, ArtifactKind, Drawing, HypeStage, StageSource};
use techscout_core::config::ResearchConfig;
use techscout_core::research::{PriorOutputs, PromptSet, RecordingProgress, StandardPrompts};
use techscout_core::{
    ArtifactError, ArtifactLabel, ChannelProgress, FileSessionStore, HistoryEntry,
    InMemorySessionStore, LlmError, MockGenerator, Phase, ProgressSink, ProgressUpdate, Renderer,
    ResearchError, ResearchEvent, ResearchPipeline, SessionStatus, SessionStore, Settings,
    StoreError,
};

const MARKET: &str = "Serverless adoption keeps growing across cloud-native teams.";
const VENDOR: &str = "AWS Lambda, Azure Functions and Google Cloud Run lead the space.";
const HYPE: &str = "**ANALYSIS**\nCurrent Stage: Slope of Enlightenment\nTooling is maturing.";
const WHITEPAPER: &str = "**EXECUTIVE SUMMARY**\n\
Serverless is ready for event-driven workloads.\n\
Adopt it for new services first.\n\
**1. STRATEGIC CONTEXT**\n\
Context text.";

fn scripted() -> Arc<MockGenerator> {
    Arc::new(MockGenerator::with_texts([MARKET, VENDOR, HYPE, WHITEPAPER]))
}

/// Records which prompt builders were invoked.
#[derive(Default)]
struct RecordingPrompts {
    built: Mutex<Vec<&'static str>>,
}

impl RecordingPrompts {
    fn built(&self) -> Vec<&'static str> {
        self.built.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str) {
        self.built.lock().unwrap().push(name);
    }
}

impl PromptSet for RecordingPrompts {
    fn market_research(&self, topic: &str) -> String {
        self.record("market_research");
        StandardPrompts.market_research(topic)
    }

    fn vendor_analysis(&self, topic: &str, market_research: &str) -> String {
        self.record("vendor_analysis");
        StandardPrompts.vendor_analysis(topic, market_research)
    }

    fn hype_cycle(&self, topic: &str, market_research: &str) -> String {
        self.record("hype_cycle");
        StandardPrompts.hype_cycle(topic, market_research)
    }

    fn summary(&self, topic: &str, organization: &str, prior: &PriorOutputs<'_>) -> String {
        self.record("summary");
        StandardPrompts.summary(topic, organization, prior)
    }
}

/// Cancels the run once the given percentage is reported.
struct CancelAt {
    percent: u8,
    token: CancellationToken,
}

impl ProgressSink for CancelAt {
    fn on_progress(&self, update: &ProgressUpdate) {
        if update.percent_complete == self.percent {
            self.token.cancel();
        }
    }
}

struct PanickingSink;

impl ProgressSink for PanickingSink {
    fn on_progress(&self, _update: &ProgressUpdate) {
        panic!("observer bug");
    }
}

/// Fails every drawing it is asked to render.
struct BrokenRenderer;

impl Renderer for BrokenRenderer {
    fn render(&self, drawing: &Drawing) -> Result<Vec<u8>, ArtifactError> {
        Err(ArtifactError::Render {
            artifact: drawing.title.clone(),
            message: "disk full".into(),
        })
    }

    fn extension(&self, kind: ArtifactKind) -> &'static str {
        match kind {
            ArtifactKind::Data => "json",
            _ => "svg",
        }
    }
}

/// A store whose every call fails.
struct UnavailableStore;

fn unavailable() -> StoreError {
    StoreError::Io(std::io::Error::other("store offline"))
}

#[async_trait]
impl SessionStore for UnavailableStore {
    async fn get_settings(&self) -> Result<Settings, StoreError> {
        Err(unavailable())
    }

    async fn put_settings(&self, _settings: &Settings) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn append_history(&self, _entry: HistoryEntry) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn load_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        Err(unavailable())
    }
}

#[tokio::test]
async fn test_full_run_produces_four_outputs_and_four_artifacts() {
    let mock = scripted();
    let store = Arc::new(InMemorySessionStore::new());
    let pipeline = ResearchPipeline::new(mock.clone(), store.clone(), &ResearchConfig::default());
    let progress = RecordingProgress::new();

    let session = pipeline
        .run_research("Serverless Computing", &progress, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.phase_outputs.len(), 4);
    assert_eq!(session.phase_output(Phase::MarketResearch), Some(MARKET));
    assert_eq!(session.phase_output(Phase::Summary), Some(WHITEPAPER));
    assert_eq!(mock.call_count(), 4);

    let labels: Vec<ArtifactLabel> = session.artifacts.keys().copied().collect();
    assert_eq!(labels, ArtifactLabel::ALL.to_vec());
    let names: Vec<&str> = session
        .artifacts
        .values()
        .map(|a| a.file_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Serverless Computing_Executive_Summary.svg",
            "Serverless Computing_Hype_Cycle.svg",
            "Serverless Computing_Vendor_Landscape.svg",
            "Serverless Computing_Analysis_Data.json",
        ]
    );
    for artifact in session.artifacts.values() {
        assert!(artifact.size_bytes > 0);
        assert_eq!(artifact.size_bytes, artifact.payload.len());
        assert!(
            artifact
                .retrieval_handle
                .starts_with(&format!("artifact://{}/", session.id))
        );
    }

    assert_eq!(progress.percents(), vec![10, 30, 50, 70, 90, 100]);
    assert_eq!(progress.last().unwrap().message, "Analysis complete");
    assert_eq!(progress.completed_sessions(), vec![session.id.clone()]);
}

#[tokio::test]
async fn test_outputs_are_threaded_into_later_prompts() {
    let mock = scripted();
    let pipeline = ResearchPipeline::new(
        mock.clone(),
        Arc::new(InMemorySessionStore::new()),
        &ResearchConfig {
            organization_name: Some("Acme Corp".into()),
            ..Default::default()
        },
    );
    pipeline
        .run_research(
            "Serverless Computing",
            &RecordingProgress::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let prompts: Vec<String> = mock
        .requests()
        .into_iter()
        .map(|r| r.prompt_text)
        .collect();
    assert!(prompts[0].contains("Serverless Computing"));
    assert!(prompts[1].contains(MARKET));
    assert!(prompts[2].contains(MARKET));
    assert!(!prompts[2].contains(VENDOR));
    assert!(prompts[3].contains(MARKET));
    assert!(prompts[3].contains(VENDOR));
    assert!(prompts[3].contains(HYPE));
    assert!(prompts[3].contains("Acme Corp"));
}

#[tokio::test]
async fn test_analysis_data_artifact_carries_every_phase() {
    let pipeline = ResearchPipeline::new(
        scripted(),
        Arc::new(InMemorySessionStore::new()),
        &ResearchConfig::default(),
    );
    let session = pipeline
        .run_research("Serverless Computing", &RecordingProgress::new(), &CancellationToken::new())
        .await
        .unwrap();

    let data = &session.artifacts[&ArtifactLabel::AnalysisData];
    assert_eq!(data.media_type, "application/json");
    let export: AnalysisExport = serde_json::from_slice(&data.payload).unwrap();
    assert_eq!(export.metadata.id, session.id);
    assert_eq!(export.metadata.topic, "Serverless Computing");
    assert_eq!(export.metadata.hype_cycle_stage, HypeStage::SlopeOfEnlightenment);
    assert_eq!(export.metadata.stage_source, StageSource::Stated);
    assert_eq!(export.phases.vendor_analysis, VENDOR);
    assert_eq!(export.phases.summary, WHITEPAPER);

    let summary = String::from_utf8(
        session.artifacts[&ArtifactLabel::ExecutiveSummary]
            .payload
            .to_vec(),
    )
    .unwrap();
    assert!(summary.contains("Serverless is ready for event-driven workloads."));
    assert!(!summary.contains("Context text."));
}

#[tokio::test]
async fn test_failure_in_second_phase_stops_the_run() {
    let mock = Arc::new(MockGenerator::new());
    mock.push_text(MARKET);
    mock.push_failure(LlmError::Upstream {
        status_code: 529,
        message: "Overloaded".into(),
    });
    mock.push_text(HYPE);
    mock.push_text(WHITEPAPER);

    let prompts = Arc::new(RecordingPrompts::default());
    let store = Arc::new(InMemorySessionStore::new());
    let pipeline = ResearchPipeline::new(mock.clone(), store.clone(), &ResearchConfig::default())
        .with_prompts(prompts.clone());
    let progress = RecordingProgress::new();

    let mut session = pipeline.start_session("Serverless Computing").await.unwrap();
    let err = pipeline
        .drive(&mut session, &progress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.failed_phase(), Some(Phase::VendorAnalysis));
    assert_eq!(err.llm_error().and_then(LlmError::status_code), Some(529));
    assert_eq!(prompts.built(), vec!["market_research", "vendor_analysis"]);
    assert_eq!(mock.call_count(), 2);

    assert_eq!(session.status, SessionStatus::Failed);
    assert!(session.phase_outputs.is_empty());
    assert!(session.artifacts.is_empty());
    assert!(session.error.as_deref().unwrap().contains("Overloaded"));

    let last = progress.last().unwrap();
    assert_eq!(last.percent_complete, 0);
    assert!(last.message.starts_with("Research failed:"));
    assert_eq!(progress.percents(), vec![10, 30, 0]);
    assert!(progress.completed_sessions().is_empty());
    assert!(store.load_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_completion_fails_its_phase() {
    let mock = Arc::new(MockGenerator::with_texts([MARKET, "  \n\t ", HYPE, WHITEPAPER]));
    let store = Arc::new(InMemorySessionStore::new());
    let pipeline = ResearchPipeline::new(mock.clone(), store.clone(), &ResearchConfig::default());
    let progress = RecordingProgress::new();

    let mut session = pipeline.start_session("Serverless Computing").await.unwrap();
    let err = pipeline
        .drive(&mut session, &progress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.failed_phase(), Some(Phase::VendorAnalysis));
    assert_eq!(err.llm_error(), Some(&LlmError::transport("empty completion")));
    assert_eq!(mock.call_count(), 2);
    assert_eq!(session.status, SessionStatus::Failed);
    assert!(session.phase_outputs.is_empty());
    assert!(session.artifacts.is_empty());
    assert_eq!(progress.percents(), vec![10, 30, 0]);
    assert!(progress.completed_sessions().is_empty());
    assert!(store.load_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_first_completion_stops_before_any_later_prompt() {
    let mock = Arc::new(MockGenerator::with_texts(["", "   ", "", ""]));
    let prompts = Arc::new(RecordingPrompts::default());
    let pipeline = ResearchPipeline::new(
        mock.clone(),
        Arc::new(InMemorySessionStore::new()),
        &ResearchConfig::default(),
    )
    .with_prompts(prompts.clone());

    let err = pipeline
        .run_research("Serverless Computing", &RecordingProgress::new(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.failed_phase(), Some(Phase::MarketResearch));
    assert_eq!(prompts.built(), vec!["market_research"]);
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_render_failure_fails_the_run() {
    let mock = scripted();
    let store = Arc::new(InMemorySessionStore::new());
    let pipeline = ResearchPipeline::new(mock.clone(), store.clone(), &ResearchConfig::default())
        .with_renderer(Arc::new(BrokenRenderer));
    let progress = RecordingProgress::new();

    let mut session = pipeline.start_session("Serverless Computing").await.unwrap();
    let err = pipeline
        .drive(&mut session, &progress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ResearchError::Artifact(ArtifactError::Render { .. })));
    assert!(err.to_string().contains("disk full"));
    assert_eq!(mock.call_count(), 4);
    assert_eq!(session.status, SessionStatus::Failed);
    assert!(session.phase_outputs.is_empty());
    assert!(session.artifacts.is_empty());

    assert_eq!(progress.percents(), vec![10, 30, 50, 70, 90, 0]);
    assert!(progress.last().unwrap().message.starts_with("Research failed:"));
    assert!(progress.completed_sessions().is_empty());
    assert!(store.load_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unavailable_store_does_not_fail_the_run() {
    let pipeline = ResearchPipeline::new(
        scripted(),
        Arc::new(UnavailableStore),
        &ResearchConfig::default(),
    );
    let progress = RecordingProgress::new();

    let session = pipeline
        .run_research("Serverless Computing", &progress, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.organization, "Your Organization");
    assert_eq!(session.artifacts.len(), 4);
    assert_eq!(progress.percents(), vec![10, 30, 50, 70, 90, 100]);
    assert_eq!(progress.completed_sessions(), vec![session.id.clone()]);
}

#[tokio::test]
async fn test_cancelled_before_start_makes_no_calls() {
    let mock = scripted();
    let pipeline = ResearchPipeline::new(
        mock.clone(),
        Arc::new(InMemorySessionStore::new()),
        &ResearchConfig::default(),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline
        .run_research("Serverless Computing", &RecordingProgress::new(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ResearchError::Cancelled));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_cancel_between_phases() {
    let mock = scripted();
    let pipeline = ResearchPipeline::new(
        mock.clone(),
        Arc::new(InMemorySessionStore::new()),
        &ResearchConfig::default(),
    );
    let token = CancellationToken::new();
    let sink = CancelAt {
        percent: 30,
        token: token.clone(),
    };

    let mut session = pipeline.start_session("Serverless Computing").await.unwrap();
    let err = pipeline.drive(&mut session, &sink, &token).await.unwrap_err();

    assert!(matches!(err, ResearchError::Cancelled));
    assert_eq!(mock.call_count(), 1);
    assert_eq!(session.status, SessionStatus::Failed);
    assert!(session.phase_outputs.is_empty());
}

#[tokio::test]
async fn test_history_recorded_after_success() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileSessionStore::new(dir.path()));
    let pipeline = ResearchPipeline::new(scripted(), store.clone(), &ResearchConfig::default());

    let session = pipeline
        .run_research("Serverless Computing", &RecordingProgress::new(), &CancellationToken::new())
        .await
        .unwrap();

    let history = FileSessionStore::new(dir.path()).load_history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, session.id);
    assert_eq!(history[0].topic, "Serverless Computing");
    assert_eq!(history[0].status, SessionStatus::Completed);
    assert_eq!(history[0].artifact_count, 4);
}

#[tokio::test]
async fn test_channel_progress_streams_events_in_order() {
    let pipeline = ResearchPipeline::new(
        scripted(),
        Arc::new(InMemorySessionStore::new()),
        &ResearchConfig::default(),
    );
    let (sink, mut rx) = ChannelProgress::channel();

    let session = pipeline
        .run_research("Serverless Computing", &sink, &CancellationToken::new())
        .await
        .unwrap();
    drop(sink);

    let mut percents = Vec::new();
    let mut completed = None;
    while let Some(event) = rx.recv().await {
        match event {
            ResearchEvent::Progress(update) => {
                assert!(completed.is_none(), "progress after completion");
                percents.push(update.percent_complete);
            }
            ResearchEvent::Completed(done) => completed = Some(done),
        }
    }
    assert_eq!(percents, vec![10, 30, 50, 70, 90, 100]);
    assert_eq!(completed.unwrap().id, session.id);
}

#[tokio::test]
async fn test_panicking_observer_does_not_abort_run() {
    let pipeline = ResearchPipeline::new(
        scripted(),
        Arc::new(InMemorySessionStore::new()),
        &ResearchConfig::default(),
    );
    let session = pipeline
        .run_research("Serverless Computing", &PanickingSink, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.artifacts.len(), 4);
}

#[tokio::test]
async fn test_concurrent_sessions_share_one_pipeline() {
    let mock = Arc::new(MockGenerator::new());
    for _ in 0..2 {
        for text in [MARKET, VENDOR, HYPE, WHITEPAPER] {
            mock.push_text(text);
        }
    }
    let store = Arc::new(InMemorySessionStore::new());
    let pipeline = Arc::new(
        ResearchPipeline::new(mock.clone(), store.clone(), &ResearchConfig::default())
            .with_phase_timeout(Duration::from_secs(5)),
    );

    // Both sessions draw from one script; only the call total is checked.
    let a = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            pipeline
                .run_research("Edge AI", &RecordingProgress::new(), &CancellationToken::new())
                .await
                .map(|s| s.status)
        })
    };
    let b = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move {
            pipeline
                .run_research("Quantum Networking", &RecordingProgress::new(), &CancellationToken::new())
                .await
                .map(|s| s.status)
        })
    };

    assert_eq!(a.await.unwrap().unwrap(), SessionStatus::Completed);
    assert_eq!(b.await.unwrap().unwrap(), SessionStatus::Completed);
    assert_eq!(mock.call_count(), 8);
    assert_eq!(store.load_history().await.unwrap().len(), 2);
}
