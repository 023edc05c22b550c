//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use crate::ResearchArgs;
use crate::SettingsAction;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use techscout_core::artifacts::{ArtifactLabel, Renderer, SvgRenderer};
use techscout_core::config::{ConfigOverrides, DocumentFormat, ResearchConfig, TechScoutConfig};
use techscout_core::gateway::{self, GatewayState};
use techscout_core::{
    AnalysisSession, FileSessionStore, ProgressSink, ProgressUpdate, ResearchPipeline,
    SessionStore, TextGenerator,
};

/// Font family loaded from `research.font_dir` for PDF documents.
#[cfg(feature = "pdf")]
const PDF_FONT_NAME: &str = "LiberationSans";

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, workspace: &Path, quiet: bool) -> anyhow::Result<()> {
    match command {
        Commands::Research(args) => handle_research(args, workspace, quiet).await,
        Commands::History { json, limit } => handle_history(workspace, json, limit).await,
        Commands::Settings { action } => handle_settings(action, workspace).await,
        Commands::Config { action } => handle_config(action, workspace).await,
        Commands::Serve { bind } => handle_serve(bind, workspace).await,
    }
}

fn load(workspace: &Path, overrides: Option<&ConfigOverrides>) -> anyhow::Result<TechScoutConfig> {
    let config = techscout_core::config::load_config(Some(workspace), overrides)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    for warning in config.validate() {
        warn!("{}", warning);
    }
    Ok(config)
}

fn open_store(config: &TechScoutConfig) -> FileSessionStore {
    FileSessionStore::new(config.storage.resolve_data_dir())
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted; stopping after the current step...");
            token.cancel();
        }
    })
}

/// Prints progress lines to stderr.
struct ConsoleProgress {
    quiet: bool,
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&self, update: &ProgressUpdate) {
        if !self.quiet {
            eprintln!("[{:>3}%] {}", update.percent_complete, update.message);
        }
    }
}

/// Replace path separators so a topic cannot escape the output directory.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

fn select_renderer(research: &ResearchConfig) -> Arc<dyn Renderer> {
    match (research.document_format, &research.font_dir) {
        #[cfg(feature = "pdf")]
        (DocumentFormat::Pdf, Some(font_dir)) => Arc::new(
            techscout_core::artifacts::PdfRenderer::new(font_dir, PDF_FONT_NAME),
        ),
        (DocumentFormat::Pdf, _) => {
            info!("PDF output unavailable; rendering the summary as SVG");
            Arc::new(SvgRenderer)
        }
        (DocumentFormat::Svg, _) => Arc::new(SvgRenderer),
    }
}

/// A finished run and the files written for it.
pub(crate) struct ResearchOutcome {
    pub session: AnalysisSession,
    pub written: Vec<(ArtifactLabel, PathBuf)>,
}

/// Write every artifact of `session` into `out_dir`.
fn write_artifacts(
    session: &AnalysisSession,
    out_dir: &Path,
) -> anyhow::Result<Vec<(ArtifactLabel, PathBuf)>> {
    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::with_capacity(session.artifacts.len());
    for (label, artifact) in &session.artifacts {
        let path = out_dir.join(sanitize_file_name(&artifact.file_name));
        std::fs::write(&path, &artifact.payload)?;
        written.push((*label, path));
    }
    Ok(written)
}

/// Run the pipeline with `generator` and write the artifacts.
pub(crate) async fn execute_research(
    config: &TechScoutConfig,
    generator: Arc<dyn TextGenerator>,
    args: &ResearchArgs,
    quiet: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<ResearchOutcome> {
    let store = Arc::new(open_store(config));
    let mut pipeline = ResearchPipeline::new(generator, store, &config.research)
        .with_renderer(select_renderer(&config.research));
    if let Some(model) = &args.model {
        pipeline = pipeline.with_model(model.clone());
    }

    let progress = ConsoleProgress {
        quiet: quiet || args.json,
    };
    let session = pipeline
        .run_research(&args.topic, &progress, cancel)
        .await?;
    let written = write_artifacts(&session, &config.research.output_dir)?;
    Ok(ResearchOutcome { session, written })
}

async fn handle_research(args: ResearchArgs, workspace: &Path, quiet: bool) -> anyhow::Result<()> {
    let overrides = ConfigOverrides {
        provider: args.provider.clone(),
        model: args.model.clone(),
        gateway_url: args.gateway_url.clone(),
        organization_name: args.organization.clone(),
        output_dir: args.out.clone(),
        bind: None,
    };
    let config = load(workspace, Some(&overrides))?;
    let generator = techscout_core::create_generator(&config.llm)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel_on_ctrl_c(cancel.clone());
    let outcome = execute_research(&config, generator, &args, quiet, &cancel).await;
    ctrl_c.abort();
    let ResearchOutcome { session, written } = outcome?;

    if args.json {
        let artifacts: Vec<serde_json::Value> = written
            .iter()
            .map(|(label, path)| {
                let artifact = &session.artifacts[label];
                serde_json::json!({
                    "label": label.as_str(),
                    "path": path.display().to_string(),
                    "media_type": artifact.media_type,
                    "size_bytes": artifact.size_bytes,
                    "retrieval_handle": artifact.retrieval_handle,
                })
            })
            .collect();
        let report = serde_json::json!({
            "id": session.id,
            "topic": session.topic,
            "organization": session.organization,
            "status": session.status.label(),
            "artifacts": artifacts,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Analysis {} complete for \"{}\"", session.id, session.topic);
        for (label, path) in &written {
            println!("  {:<17} {}", label.as_str(), path.display());
        }
    }
    Ok(())
}

async fn handle_history(workspace: &Path, json: bool, limit: usize) -> anyhow::Result<()> {
    let config = load(workspace, None)?;
    let mut history = open_store(&config).load_history().await?;
    history.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }
    if history.is_empty() {
        println!("No analyses recorded yet.");
        return Ok(());
    }
    for entry in &history {
        println!(
            "{}  {:<9}  {} artifacts  {}  ({})",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.status.label(),
            entry.artifact_count,
            entry.topic,
            entry.id
        );
    }
    Ok(())
}

async fn handle_settings(action: SettingsAction, workspace: &Path) -> anyhow::Result<()> {
    let config = load(workspace, None)?;
    let store = open_store(&config);
    let mut settings = store.get_settings().await?;

    match action {
        SettingsAction::Show => {
            println!("Settings ({})", store.dir().display());
            println!(
                "  organization_name: {}",
                settings.organization_name.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  model:             {}",
                settings.model.as_deref().unwrap_or("(not set)")
            );
        }
        SettingsAction::SetOrganization { name } => {
            let name = name.trim();
            if name.is_empty() {
                anyhow::bail!("Organization name must not be blank");
            }
            settings.organization_name = Some(name.to_string());
            store.put_settings(&settings).await?;
            println!("Organization set to \"{}\"", name);
        }
        SettingsAction::ClearOrganization => {
            settings.organization_name = None;
            store.put_settings(&settings).await?;
            println!("Organization cleared");
        }
    }
    Ok(())
}

async fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load(workspace, None)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

async fn handle_serve(bind: Option<String>, workspace: &Path) -> anyhow::Result<()> {
    let overrides = ConfigOverrides {
        bind,
        ..Default::default()
    };
    let config = load(workspace, Some(&overrides))?;
    let state = GatewayState::from_config(&config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel_on_ctrl_c(cancel.clone());
    let result = gateway::run(state, cancel).await;
    ctrl_c.abort();
    result?;
    Ok(())
}
