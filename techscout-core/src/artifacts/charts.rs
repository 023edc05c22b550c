//! Hype-cycle and vendor-landscape chart drawings.
//!
//! Both charts are 800x600. The hype-cycle curve is fixed; only the marker
//! moves, to the stage named on the analysis' `Current Stage:` line. The
//! vendor landscape shows a fixed set of illustrative placements and is
//! labelled as such.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ArtifactKind;
use super::render::{DrawCommand, Drawing, Rgb, TextAnchor};

pub const CHART_WIDTH: f32 = 800.0;
pub const CHART_HEIGHT: f32 = 600.0;

/// The five stages of the hype cycle, in curve order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypeStage {
    InnovationTrigger,
    PeakOfInflatedExpectations,
    TroughOfDisillusionment,
    SlopeOfEnlightenment,
    PlateauOfProductivity,
}

/// Whether the stage was read from the analysis or defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageSource {
    Stated,
    Default,
}

/// Stage used when the analysis does not state one.
pub const DEFAULT_STAGE: HypeStage = HypeStage::TroughOfDisillusionment;

const STAGE_LINE_PREFIXES: [&str; 2] = ["current stage:", "current position:"];

impl HypeStage {
    pub const ALL: [HypeStage; 5] = [
        HypeStage::InnovationTrigger,
        HypeStage::PeakOfInflatedExpectations,
        HypeStage::TroughOfDisillusionment,
        HypeStage::SlopeOfEnlightenment,
        HypeStage::PlateauOfProductivity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HypeStage::InnovationTrigger => "Innovation Trigger",
            HypeStage::PeakOfInflatedExpectations => "Peak of Inflated Expectations",
            HypeStage::TroughOfDisillusionment => "Trough of Disillusionment",
            HypeStage::SlopeOfEnlightenment => "Slope of Enlightenment",
            HypeStage::PlateauOfProductivity => "Plateau of Productivity",
        }
    }

    /// Distinctive word used to recognise the stage in free text.
    fn keyword(self) -> &'static str {
        match self {
            HypeStage::InnovationTrigger => "trigger",
            HypeStage::PeakOfInflatedExpectations => "peak",
            HypeStage::TroughOfDisillusionment => "trough",
            HypeStage::SlopeOfEnlightenment => "slope",
            HypeStage::PlateauOfProductivity => "plateau",
        }
    }

    /// Marker position on the curve.
    fn marker(self) -> (f32, f32) {
        match self {
            HypeStage::InnovationTrigger => (140.0, 380.0),
            HypeStage::PeakOfInflatedExpectations => (200.0, 200.0),
            HypeStage::TroughOfDisillusionment => (400.0, 450.0),
            HypeStage::SlopeOfEnlightenment => (500.0, 375.0),
            HypeStage::PlateauOfProductivity => (680.0, 316.0),
        }
    }

    /// Anchor of the stage's caption.
    fn caption(self) -> (f32, f32) {
        match self {
            HypeStage::InnovationTrigger => (50.0, 550.0),
            HypeStage::PeakOfInflatedExpectations => (150.0, 150.0),
            HypeStage::TroughOfDisillusionment => (350.0, 500.0),
            HypeStage::SlopeOfEnlightenment => (550.0, 350.0),
            HypeStage::PlateauOfProductivity => (650.0, 370.0),
        }
    }

    /// Recognise a stage in a fragment of text. The earliest mention wins.
    pub fn from_text(fragment: &str) -> Option<HypeStage> {
        let lower = fragment.to_lowercase();
        HypeStage::ALL
            .iter()
            .filter_map(|stage| lower.find(stage.keyword()).map(|pos| (pos, *stage)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, stage)| stage)
    }
}

impl fmt::Display for HypeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Find the stage the hype-cycle analysis states.
///
/// Looks for the first line reading `Current Stage: <stage>` (or
/// `Current Position:`), tolerating markdown emphasis, list bullets and
/// heading marks. Falls back to [`DEFAULT_STAGE`].
pub fn detect_stage(hype_cycle_text: &str) -> (HypeStage, StageSource) {
    for line in hype_cycle_text.lines() {
        let stripped = line.trim_start_matches(|c: char| {
            c.is_whitespace() || c == '*' || c == '#' || c == '-' || c == '_'
        });
        let lower = stripped.to_lowercase();
        let Some(prefix) = STAGE_LINE_PREFIXES.iter().find(|p| lower.starts_with(*p)) else {
            continue;
        };
        if let Some(stage) = stripped.get(prefix.len()..).and_then(HypeStage::from_text) {
            return (stage, StageSource::Stated);
        }
    }
    (DEFAULT_STAGE, StageSource::Default)
}

/// The hype-cycle chart for `topic` with the marker at `stage`.
pub fn hype_cycle_drawing(topic: &str, stage: HypeStage, source: StageSource) -> Drawing {
    let mut drawing = Drawing::new(
        CHART_WIDTH,
        CHART_HEIGHT,
        format!("{} Hype Cycle", topic),
        ArtifactKind::Image,
    );
    let h = CHART_HEIGHT;

    drawing.heading(
        CHART_WIDTH / 2.0,
        40.0,
        22.0,
        Rgb::SLATE,
        format!("{}: Hype Cycle Position", topic),
    );

    drawing.push(DrawCommand::Polyline {
        points: vec![
            (100.0, h - 100.0),
            (200.0, h - 400.0),
            (400.0, h - 150.0),
            (600.0, h - 300.0),
            (700.0, h - 280.0),
        ],
        color: Rgb::ACCENT,
        width: 3.0,
    });

    for s in HypeStage::ALL {
        let (x, y) = s.caption();
        drawing.text(x, y, 14.0, Rgb(51, 51, 51), s.name());
    }

    let (mx, my) = stage.marker();
    drawing.push(DrawCommand::Circle {
        cx: mx,
        cy: my,
        r: 8.0,
        fill: Rgb::MARKER,
    });
    drawing.push(DrawCommand::Text {
        x: mx + 20.0,
        y: my + 5.0,
        size: 16.0,
        color: Rgb::MARKER,
        bold: true,
        anchor: TextAnchor::Start,
        content: topic.to_string(),
    });

    if source == StageSource::Default {
        drawing.push(DrawCommand::Text {
            x: CHART_WIDTH / 2.0,
            y: h - 10.0,
            size: 12.0,
            color: Rgb::GRAY,
            bold: false,
            anchor: TextAnchor::Middle,
            content: "Stage not stated in the analysis; default position shown".to_string(),
        });
    }

    drawing
}

/// An illustrative vendor position on the landscape quadrant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VendorPlacement {
    pub name: &'static str,
    /// Completeness of vision, 0..=1, left to right.
    pub vision: f32,
    /// Ability to execute, 0..=1, bottom to top.
    pub execution: f32,
}

/// Fixed placements drawn on every landscape. They are not derived from the
/// vendor analysis.
pub const ILLUSTRATIVE_VENDORS: [VendorPlacement; 5] = [
    VendorPlacement {
        name: "Vendor A",
        vision: 0.82,
        execution: 0.86,
    },
    VendorPlacement {
        name: "Vendor B",
        vision: 0.66,
        execution: 0.70,
    },
    VendorPlacement {
        name: "Vendor C",
        vision: 0.30,
        execution: 0.74,
    },
    VendorPlacement {
        name: "Vendor D",
        vision: 0.76,
        execution: 0.28,
    },
    VendorPlacement {
        name: "Vendor E",
        vision: 0.22,
        execution: 0.20,
    },
];

const PLOT_LEFT: f32 = 100.0;
const PLOT_TOP: f32 = 80.0;
const PLOT_SIZE_X: f32 = 600.0;
const PLOT_SIZE_Y: f32 = 440.0;

/// The vendor landscape quadrant for `topic`.
pub fn vendor_landscape_drawing(topic: &str) -> Drawing {
    let mut drawing = Drawing::new(
        CHART_WIDTH,
        CHART_HEIGHT,
        format!("{} Vendor Landscape", topic),
        ArtifactKind::Image,
    );

    drawing.heading(
        CHART_WIDTH / 2.0,
        40.0,
        22.0,
        Rgb::SLATE,
        format!("{}: Vendor Landscape", topic),
    );

    drawing.push(DrawCommand::Rect {
        x: PLOT_LEFT,
        y: PLOT_TOP,
        width: PLOT_SIZE_X,
        height: PLOT_SIZE_Y,
        fill: None,
        stroke: Some(Rgb::SLATE),
    });
    let mid_x = PLOT_LEFT + PLOT_SIZE_X / 2.0;
    let mid_y = PLOT_TOP + PLOT_SIZE_Y / 2.0;
    drawing.line((mid_x, PLOT_TOP), (mid_x, PLOT_TOP + PLOT_SIZE_Y), Rgb::GRID, 1.0);
    drawing.line((PLOT_LEFT, mid_y), (PLOT_LEFT + PLOT_SIZE_X, mid_y), Rgb::GRID, 1.0);

    let quadrants = [
        ("Challengers", PLOT_LEFT + 10.0, PLOT_TOP + 20.0),
        ("Leaders", mid_x + 10.0, PLOT_TOP + 20.0),
        ("Niche Players", PLOT_LEFT + 10.0, mid_y + 20.0),
        ("Visionaries", mid_x + 10.0, mid_y + 20.0),
    ];
    for (label, x, y) in quadrants {
        drawing.push(DrawCommand::Text {
            x,
            y,
            size: 14.0,
            color: Rgb::GRAY,
            bold: true,
            anchor: TextAnchor::Start,
            content: label.to_string(),
        });
    }

    drawing.push(DrawCommand::Text {
        x: mid_x,
        y: PLOT_TOP + PLOT_SIZE_Y + 30.0,
        size: 13.0,
        color: Rgb::SLATE,
        bold: false,
        anchor: TextAnchor::Middle,
        content: "Completeness of Vision".to_string(),
    });
    drawing.push(DrawCommand::Text {
        x: PLOT_LEFT - 10.0,
        y: mid_y,
        size: 13.0,
        color: Rgb::SLATE,
        bold: false,
        anchor: TextAnchor::End,
        content: "Ability to Execute".to_string(),
    });

    for vendor in ILLUSTRATIVE_VENDORS {
        let (x, y) = plot_point(vendor);
        drawing.push(DrawCommand::Circle {
            cx: x,
            cy: y,
            r: 7.0,
            fill: Rgb::ACCENT,
        });
        drawing.text(x + 12.0, y + 4.0, 12.0, Rgb::BLACK, vendor.name);
    }

    drawing.push(DrawCommand::Text {
        x: CHART_WIDTH / 2.0,
        y: CHART_HEIGHT - 15.0,
        size: 12.0,
        color: Rgb::GRAY,
        bold: false,
        anchor: TextAnchor::Middle,
        content: "Illustrative placements; not derived from the vendor analysis".to_string(),
    });

    drawing
}

fn plot_point(vendor: VendorPlacement) -> (f32, f32) {
    (
        PLOT_LEFT + vendor.vision.clamp(0.0, 1.0) * PLOT_SIZE_X,
        PLOT_TOP + (1.0 - vendor.execution.clamp(0.0, 1.0)) * PLOT_SIZE_Y,
    )
}
