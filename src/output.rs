//! Output types returned by the render entry points.

use crate::error::DiagramError;
use crate::pipeline::diagram::DiagramKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of a successful render: the serialized PDF plus its report.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// The complete PDF document.
    pub pdf: Vec<u8>,
    /// What was drawn and how the diagrams were resolved.
    pub report: RenderReport,
}

/// Diagnostic summary of one render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderReport {
    /// Kind of every drawn element, in drawing order.
    pub elements: Vec<ElementKind>,
    /// One entry per Mermaid block, in document order.
    pub diagrams: Vec<DiagramReport>,
    pub stats: RenderStats,
}

impl RenderReport {
    /// Number of diagrams that ended in a placeholder.
    pub fn placeholder_count(&self) -> usize {
        self.diagrams
            .iter()
            .filter(|d| d.outcome == DiagramOutcome::Placeholder)
            .count()
    }
}

/// Aggregate counters for one render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Input lines in the document.
    pub total_lines: usize,
    /// Lines actually processed (≤ `max_lines`).
    pub processed_lines: usize,
    /// `true` when the line safety bound stopped the pass early.
    pub truncated: bool,
    pub pages: usize,
    pub headings: usize,
    pub tables: usize,
    pub code_blocks: usize,
    pub diagrams: usize,
    pub duration_ms: u64,
}

/// Kind of element drawn on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Banner,
    Heading { level: u8 },
    Paragraph,
    Bullet { indent: u8 },
    Checkbox { checked: bool },
    Numbered,
    Rule,
    Table { rows: usize, columns: usize },
    CodeBlock { lines: usize },
    Diagram { kind: DiagramKind },
    ClosingNote,
}

/// Where a diagram image came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramSource {
    /// Pre-rendered file from the assets directory.
    LocalAsset(PathBuf),
    /// Downloaded from the remote renderer and stored in the scratch dir.
    Remote(PathBuf),
}

/// Final outcome of the diagram fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramOutcome {
    Image(DiagramSource),
    Placeholder,
}

/// How one Mermaid block was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramReport {
    pub kind: DiagramKind,
    pub outcome: DiagramOutcome,
    /// Failures of the steps tried before `outcome`, in order.
    pub attempts: Vec<DiagramError>,
}

/// Status of one pre-rendered diagram asset, as reported by
/// [`crate::convert::inspect_assets`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetStatus {
    pub kind: DiagramKind,
    /// `None` when no asset file is configured for the kind.
    pub path: Option<PathBuf>,
    pub exists: bool,
    pub size_bytes: Option<u64>,
    /// File starts with the 8-byte PNG signature.
    pub png_signature: bool,
}
