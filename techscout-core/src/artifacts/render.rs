//! Drawing model and renderers.
//!
//! The assembler describes each document or chart as a [`Drawing`]: a page
//! size plus positioned text runs and simple shapes. A [`Renderer`] turns
//! that description into bytes. [`SvgRenderer`] handles every kind;
//! `PdfRenderer` (feature `pdf`) renders documents with genpdf.

use std::fmt::Write as _;

use super::ArtifactKind;
use crate::error::ArtifactError;

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const GRAY: Rgb = Rgb(127, 140, 141);
    pub const SLATE: Rgb = Rgb(52, 73, 94);
    pub const ACCENT: Rgb = Rgb(102, 126, 234);
    pub const MARKER: Rgb = Rgb(231, 76, 60);
    pub const GRID: Rgb = Rgb(189, 195, 199);

    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Horizontal anchoring of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

/// A single drawing instruction. Coordinates are in points, origin top-left.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Text {
        x: f32,
        y: f32,
        size: f32,
        color: Rgb,
        bold: bool,
        anchor: TextAnchor,
        content: String,
    },
    Polyline {
        points: Vec<(f32, f32)>,
        color: Rgb,
        width: f32,
    },
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
        fill: Rgb,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    },
}

/// A page to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    pub width: f32,
    pub height: f32,
    pub title: String,
    pub kind: ArtifactKind,
    pub commands: Vec<DrawCommand>,
}

impl Drawing {
    pub fn new(width: f32, height: f32, title: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            width,
            height,
            title: title.into(),
            kind,
            commands: Vec::new(),
        }
    }

    pub fn text(&mut self, x: f32, y: f32, size: f32, color: Rgb, content: impl Into<String>) {
        self.commands.push(DrawCommand::Text {
            x,
            y,
            size,
            color,
            bold: false,
            anchor: TextAnchor::Start,
            content: content.into(),
        });
    }

    /// Bold text centred on `x`.
    pub fn heading(&mut self, x: f32, y: f32, size: f32, color: Rgb, content: impl Into<String>) {
        self.commands.push(DrawCommand::Text {
            x,
            y,
            size,
            color,
            bold: true,
            anchor: TextAnchor::Middle,
            content: content.into(),
        });
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width: f32) {
        self.commands.push(DrawCommand::Polyline {
            points: vec![from, to],
            color,
            width,
        });
    }

    /// Text runs in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }
}

/// Turns a [`Drawing`] into an artifact payload.
pub trait Renderer: Send + Sync {
    fn render(&self, drawing: &Drawing) -> Result<Vec<u8>, ArtifactError>;

    /// File extension used for artifacts of `kind`.
    fn extension(&self, kind: ArtifactKind) -> &'static str;
}

/// Renders every drawing as a standalone SVG document.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRenderer;

impl Renderer for SvgRenderer {
    fn render(&self, drawing: &Drawing) -> Result<Vec<u8>, ArtifactError> {
        Ok(render_svg(drawing).into_bytes())
    }

    fn extension(&self, kind: ArtifactKind) -> &'static str {
        match kind {
            ArtifactKind::Document | ArtifactKind::Image => "svg",
            ArtifactKind::Data => "json",
        }
    }
}

fn render_svg(drawing: &Drawing) -> String {
    let mut out = String::with_capacity(4096);
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = drawing.width,
        h = drawing.height
    );
    let _ = writeln!(out, "  <title>{}</title>", escape_xml(&drawing.title));
    let _ = writeln!(
        out,
        r#"  <rect x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
        drawing.width,
        drawing.height,
        Rgb::WHITE.hex()
    );

    for command in &drawing.commands {
        match command {
            DrawCommand::Text {
                x,
                y,
                size,
                color,
                bold,
                anchor,
                content,
            } => {
                let anchor = match anchor {
                    TextAnchor::Start => "start",
                    TextAnchor::Middle => "middle",
                    TextAnchor::End => "end",
                };
                let weight = if *bold { "bold" } else { "normal" };
                let _ = writeln!(
                    out,
                    r#"  <text x="{x}" y="{y}" font-family="Arial, sans-serif" font-size="{size}" font-weight="{weight}" fill="{}" text-anchor="{anchor}">{}</text>"#,
                    color.hex(),
                    escape_xml(content)
                );
            }
            DrawCommand::Polyline {
                points,
                color,
                width,
            } => {
                let pts: Vec<String> = points.iter().map(|(x, y)| format!("{x},{y}")).collect();
                let _ = writeln!(
                    out,
                    r#"  <polyline points="{}" fill="none" stroke="{}" stroke-width="{width}"/>"#,
                    pts.join(" "),
                    color.hex()
                );
            }
            DrawCommand::Circle { cx, cy, r, fill } => {
                let _ = writeln!(
                    out,
                    r#"  <circle cx="{cx}" cy="{cy}" r="{r}" fill="{}"/>"#,
                    fill.hex()
                );
            }
            DrawCommand::Rect {
                x,
                y,
                width,
                height,
                fill,
                stroke,
            } => {
                let fill = fill.map(Rgb::hex).unwrap_or_else(|| "none".to_string());
                let stroke = stroke.map(Rgb::hex).unwrap_or_else(|| "none".to_string());
                let _ = writeln!(
                    out,
                    r#"  <rect x="{x}" y="{y}" width="{width}" height="{height}" fill="{fill}" stroke="{stroke}"/>"#
                );
            }
        }
    }

    out.push_str("</svg>\n");
    out
}

/// Escape text for inclusion in XML content or attribute values.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(feature = "pdf")]
pub use pdf::PdfRenderer;

#[cfg(feature = "pdf")]
mod pdf {
    use std::path::PathBuf;

    use genpdf::elements::{Break, Paragraph};
    use genpdf::style::{Color, Style, StyledString};
    use genpdf::{Document, SimplePageDecorator};

    use super::{DrawCommand, Drawing, Renderer, SvgRenderer};
    use crate::artifacts::ArtifactKind;
    use crate::error::ArtifactError;

    /// Renders documents as PDF; charts fall back to SVG.
    ///
    /// Text runs are laid out top to bottom in drawing order. Shapes on a
    /// document page are ignored.
    pub struct PdfRenderer {
        font_dir: PathBuf,
        font_name: String,
    }

    impl PdfRenderer {
        /// `font_dir` must contain `<font_name>-Regular.ttf`, `-Bold.ttf`,
        /// `-Italic.ttf` and `-BoldItalic.ttf`.
        pub fn new(font_dir: impl Into<PathBuf>, font_name: impl Into<String>) -> Self {
            Self {
                font_dir: font_dir.into(),
                font_name: font_name.into(),
            }
        }

        fn render_document(&self, drawing: &Drawing) -> Result<Vec<u8>, ArtifactError> {
            let render_err = |message: String| ArtifactError::Render {
                artifact: drawing.title.clone(),
                message,
            };

            let fonts = genpdf::fonts::from_files(&self.font_dir, &self.font_name, None)
                .map_err(|e| render_err(format!("failed to load fonts: {}", e)))?;

            let mut doc = Document::new(fonts);
            doc.set_title(drawing.title.clone());
            let mut decorator = SimplePageDecorator::new();
            decorator.set_margins(30);
            doc.set_page_decorator(decorator);

            for command in &drawing.commands {
                if let DrawCommand::Text {
                    size,
                    color,
                    bold,
                    content,
                    ..
                } = command
                {
                    let mut style = Style::new()
                        .with_font_size(size.round() as u8)
                        .with_color(Color::Rgb(color.0, color.1, color.2));
                    if *bold {
                        style = style.bold();
                    }
                    doc.push(Paragraph::new(StyledString::new(content.clone(), style)));
                    doc.push(Break::new(0.3));
                }
            }

            let mut buffer = Vec::new();
            doc.render(&mut buffer)
                .map_err(|e| render_err(format!("failed to render PDF: {}", e)))?;
            Ok(buffer)
        }
    }

    impl Renderer for PdfRenderer {
        fn render(&self, drawing: &Drawing) -> Result<Vec<u8>, ArtifactError> {
            match drawing.kind {
                ArtifactKind::Document => self.render_document(drawing),
                _ => SvgRenderer.render(drawing),
            }
        }

        fn extension(&self, kind: ArtifactKind) -> &'static str {
            match kind {
                ArtifactKind::Document => "pdf",
                other => SvgRenderer.extension(other),
            }
        }
    }
}
