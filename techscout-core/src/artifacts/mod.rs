//! Artifact assembly: turns a finished analysis into downloadable files.
//!
//! Four artifacts are produced, always in this order:
//! 1. **Executive_Summary**: document built from the whitepaper's summary section
//! 2. **Hype_Cycle**: curve chart with the technology's stage marked
//! 3. **Vendor_Landscape**: illustrative vendor quadrant
//! 4. **Analysis_Data**: pretty-printed JSON of every phase output
//!
//! File names are `<topic>_<Label>.<ext>` with the topic used verbatim.

pub mod charts;
pub mod render;
pub mod summary;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ArtifactError, Result};
use crate::research::{AnalysisSession, Phase};

pub use charts::{HypeStage, StageSource, detect_stage};
pub use render::{Drawing, Renderer, SvgRenderer};
pub use summary::extract_summary;

#[cfg(feature = "pdf")]
pub use render::PdfRenderer;

/// Identifies the tool that produced an analysis in exported data.
pub const GENERATOR: &str = concat!("techscout/", env!("CARGO_PKG_VERSION"));

/// Broad category of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Document,
    Image,
    Data,
}

/// Fixed label of each artifact a completed session carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArtifactLabel {
    #[serde(rename = "Executive_Summary")]
    ExecutiveSummary,
    #[serde(rename = "Hype_Cycle")]
    HypeCycle,
    #[serde(rename = "Vendor_Landscape")]
    VendorLandscape,
    #[serde(rename = "Analysis_Data")]
    AnalysisData,
}

impl ArtifactLabel {
    pub const ALL: [ArtifactLabel; 4] = [
        ArtifactLabel::ExecutiveSummary,
        ArtifactLabel::HypeCycle,
        ArtifactLabel::VendorLandscape,
        ArtifactLabel::AnalysisData,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactLabel::ExecutiveSummary => "Executive_Summary",
            ArtifactLabel::HypeCycle => "Hype_Cycle",
            ArtifactLabel::VendorLandscape => "Vendor_Landscape",
            ArtifactLabel::AnalysisData => "Analysis_Data",
        }
    }

    pub fn kind(self) -> ArtifactKind {
        match self {
            ArtifactLabel::ExecutiveSummary => ArtifactKind::Document,
            ArtifactLabel::HypeCycle | ArtifactLabel::VendorLandscape => ArtifactKind::Image,
            ArtifactLabel::AnalysisData => ArtifactKind::Data,
        }
    }
}

impl fmt::Display for ArtifactLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A produced artifact. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    pub file_name: String,
    pub media_type: String,
    pub size_bytes: usize,
    /// `artifact://<session-id>/<url-encoded file name>`.
    pub retrieval_handle: String,
    #[serde(skip)]
    pub payload: Bytes,
}

impl ArtifactRef {
    pub fn new(
        session_id: &str,
        kind: ArtifactKind,
        file_name: impl Into<String>,
        payload: Bytes,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            kind,
            media_type: media_type_for(&file_name).to_string(),
            size_bytes: payload.len(),
            retrieval_handle: retrieval_handle(session_id, &file_name),
            file_name,
            payload,
        }
    }
}

/// Build the retrieval handle for an artifact of a session.
pub fn retrieval_handle(session_id: &str, file_name: &str) -> String {
    format!(
        "artifact://{}/{}",
        session_id,
        urlencoding::encode(file_name)
    )
}

/// `<topic>_<Label>.<ext>`.
pub fn artifact_file_name(topic: &str, label: ArtifactLabel, extension: &str) -> String {
    format!("{}_{}.{}", topic, label.as_str(), extension)
}

fn media_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Exported analysis, written as the `Analysis_Data` artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisExport {
    pub metadata: ExportMetadata,
    pub phases: ExportPhases,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub id: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub generator: String,
    pub organization: String,
    pub hype_cycle_stage: HypeStage,
    pub stage_source: StageSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPhases {
    pub market_research: String,
    pub vendor_analysis: String,
    pub hype_cycle: String,
    pub summary: String,
}

/// Page size of the executive-summary document (A4 in points).
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const SUMMARY_WRAP_COLUMNS: usize = 95;

/// Builds the four artifacts for a session whose phases are all recorded.
pub struct ArtifactAssembler {
    renderer: Arc<dyn Renderer>,
}

impl Default for ArtifactAssembler {
    fn default() -> Self {
        Self::new(Arc::new(SvgRenderer))
    }
}

impl ArtifactAssembler {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }

    /// Produce every artifact for `session`.
    ///
    /// Reads the four phase outputs; a missing one is an invalid transition.
    /// Any render or serialization failure aborts the whole assembly.
    pub fn assemble(
        &self,
        session: &AnalysisSession,
    ) -> Result<BTreeMap<ArtifactLabel, ArtifactRef>> {
        let market = session.require_output(Phase::MarketResearch)?;
        let vendor = session.require_output(Phase::VendorAnalysis)?;
        let hype = session.require_output(Phase::HypeCycle)?;
        let whitepaper = session.require_output(Phase::Summary)?;

        let (stage, stage_source) = detect_stage(hype);
        debug!(
            session_id = session.id.as_str(),
            stage = stage.name(),
            ?stage_source,
            "Resolved hype-cycle stage"
        );

        let mut artifacts = BTreeMap::new();

        let summary = extract_summary(whitepaper);
        let document = self.summary_document(session, &summary);
        artifacts.insert(
            ArtifactLabel::ExecutiveSummary,
            self.render_artifact(session, ArtifactLabel::ExecutiveSummary, &document)?,
        );

        let hype_chart = charts::hype_cycle_drawing(&session.topic, stage, stage_source);
        artifacts.insert(
            ArtifactLabel::HypeCycle,
            self.render_artifact(session, ArtifactLabel::HypeCycle, &hype_chart)?,
        );

        let landscape = charts::vendor_landscape_drawing(&session.topic);
        artifacts.insert(
            ArtifactLabel::VendorLandscape,
            self.render_artifact(session, ArtifactLabel::VendorLandscape, &landscape)?,
        );

        let export = AnalysisExport {
            metadata: ExportMetadata {
                id: session.id.clone(),
                topic: session.topic.clone(),
                created_at: session.created_at,
                generator: GENERATOR.to_string(),
                organization: session.organization.clone(),
                hype_cycle_stage: stage,
                stage_source,
            },
            phases: ExportPhases {
                market_research: market.to_string(),
                vendor_analysis: vendor.to_string(),
                hype_cycle: hype.to_string(),
                summary: whitepaper.to_string(),
            },
        };
        let json = serde_json::to_vec_pretty(&export).map_err(ArtifactError::from)?;
        let label = ArtifactLabel::AnalysisData;
        artifacts.insert(
            label,
            ArtifactRef::new(
                &session.id,
                label.kind(),
                artifact_file_name(&session.topic, label, "json"),
                Bytes::from(json),
            ),
        );

        Ok(artifacts)
    }

    fn render_artifact(
        &self,
        session: &AnalysisSession,
        label: ArtifactLabel,
        drawing: &Drawing,
    ) -> std::result::Result<ArtifactRef, ArtifactError> {
        let payload = self.renderer.render(drawing).map_err(|e| match e {
            ArtifactError::Render { message, .. } => ArtifactError::Render {
                artifact: label.to_string(),
                message,
            },
            other => other,
        })?;
        let extension = self.renderer.extension(label.kind());
        Ok(ArtifactRef::new(
            &session.id,
            label.kind(),
            artifact_file_name(&session.topic, label, extension),
            Bytes::from(payload),
        ))
    }

    fn summary_document(&self, session: &AnalysisSession, summary: &str) -> Drawing {
        let mut doc = Drawing::new(
            PAGE_WIDTH,
            PAGE_HEIGHT,
            format!("{} Executive Summary", session.topic),
            ArtifactKind::Document,
        );
        doc.text(40.0, 60.0, 20.0, render::Rgb::ACCENT, "Enterprise Architecture Analysis");
        doc.text(
            40.0,
            95.0,
            16.0,
            render::Rgb::BLACK,
            format!("Technology: {}", session.topic),
        );
        doc.text(
            40.0,
            118.0,
            12.0,
            render::Rgb(128, 128, 128),
            format!("Prepared for: {}", session.organization),
        );
        doc.text(
            40.0,
            136.0,
            12.0,
            render::Rgb(128, 128, 128),
            format!("Generated: {}", session.created_at.format("%Y-%m-%d")),
        );
        doc.push(render::DrawCommand::Text {
            x: 40.0,
            y: 175.0,
            size: 14.0,
            color: render::Rgb::BLACK,
            bold: true,
            anchor: render::TextAnchor::Start,
            content: "Executive Summary".to_string(),
        });

        let body = if summary.is_empty() {
            "No summary available."
        } else {
            summary
        };
        let mut y = 200.0;
        for line in textwrap::wrap(body, SUMMARY_WRAP_COLUMNS) {
            doc.text(40.0, y, 11.0, render::Rgb::BLACK, line.into_owned());
            y += 16.0;
        }

        doc
    }
}
