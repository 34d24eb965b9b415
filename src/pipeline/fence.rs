//! Fenced block flushing: decide what a closed ```` ``` ```` block becomes.
//!
//! A `mermaid` block turns into a diagram request; everything else is drawn
//! as a monospace panel whose colours depend on the label.

use crate::canvas::primitives::CodePalette;
use crate::config::DiagramRules;
use crate::pipeline::diagram::{DiagramDescriptor, DiagramKind};

/// Lines longer than this many characters are truncated.
pub const MAX_CODE_COLUMNS: usize = 95;
/// Characters kept from a truncated line before the `...` marker.
const TRUNCATED_KEEP: usize = 92;

/// Labels that get the dark source-code panel.
const SOURCE_LABELS: [&str; 3] = ["java", "javascript", "typescript"];

/// The language label of a fenced block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenceLabel {
    Mermaid,
    /// Data-definition blocks (`sql`).
    DataDefinition,
    /// One of the recognised programming languages.
    Source(String),
    /// Any other label, including none.
    Plain(String),
}

impl FenceLabel {
    /// Parse an already lowercased, trimmed label.
    pub fn parse(label: &str) -> Self {
        match label {
            "mermaid" => FenceLabel::Mermaid,
            "sql" => FenceLabel::DataDefinition,
            l if SOURCE_LABELS.contains(&l) => FenceLabel::Source(l.to_string()),
            l => FenceLabel::Plain(l.to_string()),
        }
    }

    /// Panel colours for a monospace block; `None` for diagrams.
    pub fn palette(&self) -> Option<CodePalette> {
        match self {
            FenceLabel::Mermaid => None,
            FenceLabel::DataDefinition => Some(CodePalette::DATA_DEFINITION),
            FenceLabel::Source(_) => Some(CodePalette::SOURCE),
            FenceLabel::Plain(_) => Some(CodePalette::PLAIN),
        }
    }
}

/// What to draw for a closed fenced block.
#[derive(Debug, Clone, PartialEq)]
pub enum FenceAction {
    Diagram(DiagramDescriptor),
    Code {
        lines: Vec<String>,
        palette: CodePalette,
    },
}

/// Turn a closed block into the action the renderer should take.
pub fn flush(label: &str, buffer: &[String], rules: &DiagramRules) -> FenceAction {
    let body = buffer.join("\n");
    let label = FenceLabel::parse(label);
    match label.palette() {
        None => FenceAction::Diagram(DiagramDescriptor {
            kind: DiagramKind::sniff(&body, rules),
            source: body,
        }),
        Some(palette) => FenceAction::Code {
            lines: code_lines(&body),
            palette,
        },
    }
}

/// Trim the block as a whole, split it into lines and truncate long ones.
pub fn code_lines(body: &str) -> Vec<String> {
    body.trim().split('\n').map(truncate_line).collect()
}

fn truncate_line(line: &str) -> String {
    if line.chars().count() > MAX_CODE_COLUMNS {
        let kept: String = line.chars().take(TRUNCATED_KEEP).collect();
        format!("{kept}...")
    } else {
        line.to_string()
    }
}
