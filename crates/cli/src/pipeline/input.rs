//! Input line parsing.

use contracts::ErrorReport;

/// How a line was understood
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A JSON `ErrorReport`
    Json,
    /// Plain text, split into title and message
    Text,
}

/// Turn one input line into a report.
///
/// Blank lines yield `None`. Lines starting with `{` that are not a valid
/// report fall back to plain text.
pub fn parse_line(line: &str, source: Option<&str>) -> Option<(ErrorReport, LineKind)> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = if trimmed.starts_with('{') {
        serde_json::from_str::<ErrorReport>(trimmed)
            .ok()
            .map(|report| (report, LineKind::Json))
    } else {
        None
    };
    let (mut report, kind) =
        parsed.unwrap_or_else(|| (ErrorReport::from_text(trimmed), LineKind::Text));

    if report.source.is_empty() {
        if let Some(source) = source {
            report.source = source.to_string();
        }
    }

    Some((report, kind))
}
