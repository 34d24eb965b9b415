//! Progress-callback trait for the render's diagnostic transcript.
//!
//! Inject an [`Arc<dyn RenderProgressCallback>`] via
//! [`crate::config::RenderConfigBuilder::progress_callback`] to receive
//! events while the document is drawn: periodic line progress, every
//! resolved diagram and the safety-bound notice.
//!
//! # Example
//!
//! ```rust
//! use edgequake_md2pdf::{RenderConfig, RenderProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct DiagramCounter {
//!     seen: AtomicUsize,
//! }
//!
//! impl RenderProgressCallback for DiagramCounter {
//!     fn on_diagram_resolved(&self, _index: usize, _report: &edgequake_md2pdf::DiagramReport) {
//!         self.seen.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(DiagramCounter { seen: AtomicUsize::new(0) });
//! let config = RenderConfig::builder()
//!     .progress_callback(counter as Arc<dyn RenderProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{DiagramReport, RenderStats};
use std::sync::Arc;

/// Lines between two [`RenderProgressCallback::on_lines_processed`] events.
pub const PROGRESS_INTERVAL: usize = 100;

/// Called by the renderer as it walks the document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The render pass is single-threaded, but the trait is
/// `Send + Sync` so one callback can be shared across renders on different
/// threads.
pub trait RenderProgressCallback: Send + Sync {
    /// Called once before the first line is processed.
    ///
    /// # Arguments
    /// * `total_lines` — lines in the input
    /// * `max_lines`   — safety bound in effect for this render
    fn on_render_start(&self, total_lines: usize, max_lines: usize) {
        let _ = (total_lines, max_lines);
    }

    /// Called every [`PROGRESS_INTERVAL`] lines.
    fn on_lines_processed(&self, processed: usize, total_lines: usize) {
        let _ = (processed, total_lines);
    }

    /// Called after each Mermaid block has been placed.
    ///
    /// # Arguments
    /// * `index`  — 1-indexed position of the diagram in the document
    /// * `report` — kind, outcome and failed attempts
    fn on_diagram_resolved(&self, index: usize, report: &DiagramReport) {
        let _ = (index, report);
    }

    /// Called once when the line safety bound stops the pass.
    fn on_line_limit_reached(&self, max_lines: usize, total_lines: usize) {
        let _ = (max_lines, total_lines);
    }

    /// Called once after the canvas has been closed.
    fn on_render_complete(&self, stats: &RenderStats) {
        let _ = stats;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RenderProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RenderConfig`].
pub type ProgressCallback = Arc<dyn RenderProgressCallback>;
