//! The single forward pass over the document.
//!
//! [`DocumentRenderer`] owns the block state and the canvas. Each line is
//! classified once and dispatched to exactly one action; tables and fenced
//! blocks are buffered until they close. At the end of input, or when the
//! line safety bound trips, pending buffers are flushed, the closing note is
//! drawn and the canvas is closed.

use crate::canvas::surface::Surface;
use crate::canvas::{primitives, Canvas};
use crate::config::RenderConfig;
use crate::error::Md2PdfError;
use crate::output::{ElementKind, RenderReport};
use crate::pipeline::classify::{classify, LineKind};
use crate::pipeline::diagram::DiagramResolver;
use crate::pipeline::fence::{self, FenceAction};
use crate::progress::PROGRESS_INTERVAL;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Which kind of block the pass is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockMode {
    #[default]
    Normal,
    InCode,
    InTable,
}

/// Mutable state of the pass. Buffers are cleared whenever a block closes.
#[derive(Debug, Default)]
pub struct RenderState {
    pub mode: BlockMode,
    pub fence_label: String,
    pub code_buffer: Vec<String>,
    pub table_buffer: Vec<Vec<String>>,
}

impl RenderState {
    fn reset(&mut self) {
        self.mode = BlockMode::Normal;
        self.fence_label.clear();
        self.code_buffer.clear();
        self.table_buffer.clear();
    }
}

/// Renders one document onto a canvas.
pub struct DocumentRenderer<'a, S: Surface> {
    config: &'a RenderConfig,
    canvas: Canvas<S>,
    resolver: DiagramResolver<'a>,
    state: RenderState,
    report: RenderReport,
}

impl<'a, S: Surface> DocumentRenderer<'a, S> {
    pub fn new(config: &'a RenderConfig, surface: S, resolver: DiagramResolver<'a>) -> Self {
        let canvas = Canvas::new(surface, config.geometry, config.branding.clone());
        Self {
            config,
            canvas,
            resolver,
            state: RenderState::default(),
            report: RenderReport::default(),
        }
    }

    /// Current block state.
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Render `content` and close the canvas.
    pub fn render(mut self, content: &str) -> Result<(S::Output, RenderReport), Md2PdfError> {
        let start = Instant::now();
        let lines: Vec<&str> = content
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .collect();
        let total = lines.len();
        let max_lines = self.config.max_lines;
        info!("Rendering {} lines (limit {})", total, max_lines);
        if let Some(cb) = &self.config.progress_callback {
            cb.on_render_start(total, max_lines);
        }

        self.canvas.add_page()?;
        if self.config.branding.title.is_some() {
            self.report.elements.push(ElementKind::Banner);
        }

        for (idx, line) in lines.iter().enumerate() {
            if idx >= max_lines {
                warn!(
                    "Line limit reached: stopping after {} of {} lines",
                    max_lines, total
                );
                self.report.stats.truncated = true;
                if let Some(cb) = &self.config.progress_callback {
                    cb.on_line_limit_reached(max_lines, total);
                }
                break;
            }
            self.process_line(line)?;
            self.report.stats.processed_lines = idx + 1;

            let done = idx + 1;
            if done % PROGRESS_INTERVAL == 0 {
                debug!("Processed line {}/{}", done, total);
                if let Some(cb) = &self.config.progress_callback {
                    cb.on_lines_processed(done, total);
                }
            }
        }

        self.finish_pending()?;

        if let Some(note) = self.config.branding.closing_note.as_deref() {
            primitives::closing_note(&mut self.canvas, note)?;
            self.report.elements.push(ElementKind::ClosingNote);
        }

        let mut report = self.report;
        report.stats.total_lines = total;
        report.stats.pages = self.canvas.page();
        let output = self.canvas.finish()?;
        report.stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Render complete: {} pages, {} elements, {} diagrams in {}ms",
            report.stats.pages,
            report.elements.len(),
            report.stats.diagrams,
            report.stats.duration_ms
        );
        if let Some(cb) = &self.config.progress_callback {
            cb.on_render_complete(&report.stats);
        }
        Ok((output, report))
    }

    /// Classify and dispatch one line.
    pub fn process_line(&mut self, line: &str) -> Result<(), Md2PdfError> {
        let in_code = self.state.mode == BlockMode::InCode;
        let kind = classify(line, in_code);

        match kind {
            LineKind::Fence { label } => {
                if in_code {
                    self.flush_fence()?;
                } else {
                    if self.state.mode == BlockMode::InTable {
                        self.flush_table()?;
                    }
                    self.state.mode = BlockMode::InCode;
                    self.state.fence_label = label;
                }
                return Ok(());
            }
            LineKind::Code(raw) => {
                self.state.code_buffer.push(raw);
                return Ok(());
            }
            LineKind::TableRow(cells) => {
                self.state.mode = BlockMode::InTable;
                self.state.table_buffer.push(cells);
                return Ok(());
            }
            LineKind::TableSeparator => {
                self.state.mode = BlockMode::InTable;
                return Ok(());
            }
            _ => {}
        }

        if self.state.mode == BlockMode::InTable {
            self.flush_table()?;
        }
        self.draw_line(kind)
    }

    fn draw_line(&mut self, kind: LineKind) -> Result<(), Md2PdfError> {
        let c = &mut self.canvas;
        let element = match kind {
            LineKind::Heading { level, text } => {
                primitives::heading(c, level, &text)?;
                self.report.stats.headings += 1;
                ElementKind::Heading { level }
            }
            LineKind::Numbered { number, text } => {
                if text.is_empty() {
                    return Ok(());
                }
                primitives::numbered(c, &number, &text)?;
                ElementKind::Numbered
            }
            LineKind::Checkbox { checked, text } => {
                primitives::checkbox(c, checked, &text)?;
                ElementKind::Checkbox { checked }
            }
            LineKind::Bullet { indent, text } => {
                primitives::bullet(c, &text, indent)?;
                ElementKind::Bullet { indent }
            }
            LineKind::Rule => {
                primitives::rule(c)?;
                ElementKind::Rule
            }
            LineKind::Paragraph(text) => {
                primitives::paragraph(c, &text)?;
                ElementKind::Paragraph
            }
            LineKind::Blank => return Ok(()),
            LineKind::Fence { .. }
            | LineKind::Code(_)
            | LineKind::TableRow(_)
            | LineKind::TableSeparator => {
                return Err(Md2PdfError::Internal(
                    "block line reached the element dispatcher".into(),
                ))
            }
        };
        debug!("Drew {:?} on page {}", element, self.canvas.page());
        self.report.elements.push(element);
        Ok(())
    }

    /// Draw the buffered table (first row is the header) and clear state.
    fn flush_table(&mut self) -> Result<(), Md2PdfError> {
        let rows = std::mem::take(&mut self.state.table_buffer);
        self.state.reset();
        if rows.is_empty() {
            return Ok(());
        }
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        primitives::table(&mut self.canvas, &rows)?;
        self.report.stats.tables += 1;
        self.report.elements.push(ElementKind::Table {
            rows: rows.len(),
            columns,
        });
        Ok(())
    }

    /// Draw the buffered fenced block and clear state.
    fn flush_fence(&mut self) -> Result<(), Md2PdfError> {
        let label = std::mem::take(&mut self.state.fence_label);
        let buffer = std::mem::take(&mut self.state.code_buffer);
        self.state.reset();

        match fence::flush(&label, &buffer, &self.config.rules) {
            FenceAction::Diagram(diagram) => {
                let report = self.resolver.resolve(&mut self.canvas, &diagram)?;
                self.report.stats.diagrams += 1;
                self.report.elements.push(ElementKind::Diagram { kind: diagram.kind });
                if let Some(cb) = &self.config.progress_callback {
                    cb.on_diagram_resolved(self.report.stats.diagrams, &report);
                }
                self.report.diagrams.push(report);
            }
            FenceAction::Code { lines, palette } => {
                primitives::code_block(&mut self.canvas, &lines, palette)?;
                self.report.stats.code_blocks += 1;
                self.report.elements.push(ElementKind::CodeBlock { lines: lines.len() });
            }
        }
        Ok(())
    }

    /// Flush whatever block is still open at the end of the pass.
    fn finish_pending(&mut self) -> Result<(), Md2PdfError> {
        match self.state.mode {
            BlockMode::InTable => self.flush_table(),
            BlockMode::InCode => {
                warn!(
                    "Unterminated ```{} block at end of input, flushing it",
                    self.state.fence_label
                );
                self.flush_fence()
            }
            BlockMode::Normal => Ok(()),
        }
    }
}
