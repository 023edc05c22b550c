//! Executive-summary extraction from the whitepaper text.
//!
//! Best-effort: the model is asked for a bold `EXECUTIVE SUMMARY` heading but
//! nothing enforces it. When the heading is missing the summary is empty and
//! the document says so.

/// Lines kept from the summary section.
pub const MAX_SUMMARY_LINES: usize = 10;

/// Characters kept before the ellipsis.
pub const MAX_SUMMARY_CHARS: usize = 800;

const ELLIPSIS: &str = "...";
const MARKER: &str = "executive summary";

/// Pull the executive summary out of `text`.
///
/// Capture starts after the first line mentioning "executive summary" (any
/// case) and stops at the next section header, a trimmed line starting with
/// `**` or `#` that does not itself mention the marker. The first ten
/// non-blank trimmed lines are joined with single spaces, cut to 800
/// characters and suffixed with `...`.
pub fn extract_summary(text: &str) -> String {
    let mut captured: Vec<&str> = Vec::new();
    let mut in_summary = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if mentions_marker(trimmed) {
            in_summary = true;
            continue;
        }
        if !in_summary {
            continue;
        }
        if is_section_header(trimmed) {
            break;
        }
        if !trimmed.is_empty() {
            captured.push(trimmed);
            if captured.len() == MAX_SUMMARY_LINES {
                break;
            }
        }
    }

    if captured.is_empty() {
        return String::new();
    }

    let mut summary: String = captured.join(" ").chars().take(MAX_SUMMARY_CHARS).collect();
    summary.push_str(ELLIPSIS);
    summary
}

fn mentions_marker(line: &str) -> bool {
    line.to_lowercase().contains(MARKER)
}

fn is_section_header(trimmed: &str) -> bool {
    trimmed.starts_with("**") || trimmed.starts_with('#')
}
