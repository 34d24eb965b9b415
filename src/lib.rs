//! # edgequake-md2pdf
//!
//! Render lightly marked-up, Markdown-style reports into paginated PDF.
//!
//! The input is read line by line in a single forward pass. Headings (four
//! levels), bullets with one nesting level, checkboxes, numbered items,
//! horizontal rules, pipe tables and fenced code blocks each have a fixed
//! visual style. Fenced `mermaid` blocks become diagrams through a fallback
//! chain: a pre-rendered local image, then a remote rendering service, then a
//! drawn placeholder, so a report is always produced.
//!
//! ## Pipeline Overview
//!
//! ```text
//! text
//!  │
//!  ├─ 1. Classify  each line → one LineKind (ordered matchers)
//!  ├─ 2. Dispatch  buffer tables / fenced blocks, draw everything else
//!  ├─ 3. Diagrams  local asset → mermaid.ink → placeholder
//!  ├─ 4. Canvas    cursor, wrapping, page breaks, header + footer
//!  └─ 5. Output    PDF bytes via pdfium + a RenderReport
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_md2pdf::{render_to_file, RenderConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RenderConfig::builder()
//!         .title("OX FIELD SERVICES")
//!         .tagline("Field service management platform")
//!         .assets_dir("pdf_images")
//!         .build()?;
//!     let report = render_to_file("# Summary\n\n- fast\n- reliable", "report.pdf", &config)?;
//!     eprintln!("{} pages, {} diagrams", report.stats.pages, report.stats.diagrams);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-md2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod canvas;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use canvas::surface::{DrawOp, RecordingSurface, Surface};
pub use config::{
    DiagramAssets, DiagramRules, PageGeometry, RemoteConfig, RenderConfig, RenderConfigBuilder,
    ReportBranding,
};
pub use convert::{
    inspect_assets, load_input, render, render_file, render_to_file, render_with_surface,
};
pub use error::{DiagramError, FailureCategory, Md2PdfError};
pub use output::{
    AssetStatus, DiagramOutcome, DiagramReport, DiagramSource, ElementKind, RenderOutput,
    RenderReport, RenderStats,
};
pub use pipeline::diagram::DiagramKind;
pub use progress::{NoopProgressCallback, ProgressCallback, RenderProgressCallback};
