//! Render entry points.
//!
//! [`render`] returns the PDF in memory; [`render_to_file`] and
//! [`render_file`] write it atomically (temp file + rename). All of them run
//! the same pass through [`render_with_surface`], which is also the entry
//! point for custom [`Surface`] backends such as
//! [`crate::canvas::surface::RecordingSurface`].

use crate::canvas::pdfium::PdfiumSurface;
use crate::canvas::surface::Surface;
use crate::config::RenderConfig;
use crate::engine;
use crate::error::Md2PdfError;
use crate::output::{AssetStatus, RenderOutput, RenderReport};
use crate::pipeline::diagram::{DiagramKind, DiagramResolver};
use crate::pipeline::document::DocumentRenderer;
use crate::pipeline::remote::{DiagramFetcher, MermaidInkFetcher};
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, info, warn};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Render `content` to a PDF held in memory.
///
/// # Errors
/// Returns `Err(Md2PdfError)` only for fatal errors: PDFium unavailable,
/// a drawing call rejected, or the scratch directory not creatable. Diagram
/// failures are recorded in the report and never returned.
///
/// # Example
/// ```rust,no_run
/// use edgequake_md2pdf::{render, RenderConfig};
///
/// let config = RenderConfig::builder().title("Status Report").build()?;
/// let output = render("# Summary\n\nAll systems nominal.", &config)?;
/// std::fs::write("report.pdf", &output.pdf)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn render(content: &str, config: &RenderConfig) -> Result<RenderOutput, Md2PdfError> {
    let scratch = scratch_dir()?;
    let pdfium = engine::bind(config)?;
    let surface = PdfiumSurface::new(&pdfium)?;
    let (pdf, report) = render_in(content, config, surface, scratch.path())?;
    release_scratch(scratch);
    Ok(RenderOutput { pdf, report })
}

/// Render `content` onto any [`Surface`] backend.
pub fn render_with_surface<S: Surface>(
    content: &str,
    config: &RenderConfig,
    surface: S,
) -> Result<(S::Output, RenderReport), Md2PdfError> {
    let scratch = scratch_dir()?;
    let result = render_in(content, config, surface, scratch.path());
    release_scratch(scratch);
    result
}

/// Render `content` and write the PDF to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files. The
/// scratch directory is removed only after the PDF is in place.
pub fn render_to_file(
    content: &str,
    output_path: impl AsRef<Path>,
    config: &RenderConfig,
) -> Result<RenderReport, Md2PdfError> {
    let path = output_path.as_ref();
    let scratch = scratch_dir()?;
    let pdfium = engine::bind(config)?;
    let surface = PdfiumSurface::new(&pdfium)?;
    let (pdf, report) = render_in(content, config, surface, scratch.path())?;

    write_atomic(path, &pdf)?;
    info!("Wrote {} ({} bytes)", path.display(), pdf.len());
    release_scratch(scratch);
    Ok(report)
}

/// Read `input_path` and render it to `output_path`.
pub fn render_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &RenderConfig,
) -> Result<RenderReport, Md2PdfError> {
    let content = load_input(input_path.as_ref())?;
    render_to_file(&content, output_path, config)
}

/// Read a UTF-8 document from `path`, or from stdin when `path` is `-`.
pub fn load_input(path: &Path) -> Result<String, Md2PdfError> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| Md2PdfError::InputRead {
                path: path.to_path_buf(),
                source,
            })?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            Md2PdfError::InputNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Md2PdfError::InputRead {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Report, per diagram kind, whether its pre-rendered asset is present and
/// starts with a PNG signature. Does not require PDFium.
pub fn inspect_assets(config: &RenderConfig) -> Vec<AssetStatus> {
    DiagramKind::ALL
        .iter()
        .map(|&kind| {
            let path = config.assets.path_for(kind);
            let meta = path.as_deref().and_then(|p| std::fs::metadata(p).ok());
            let png_signature = path
                .as_deref()
                .map(|p| has_png_signature(p))
                .unwrap_or(false);
            AssetStatus {
                kind,
                exists: meta.as_ref().is_some_and(|m| m.is_file()),
                size_bytes: meta.map(|m| m.len()),
                png_signature,
                path,
            }
        })
        .collect()
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn render_in<S: Surface>(
    content: &str,
    config: &RenderConfig,
    surface: S,
    scratch: &Path,
) -> Result<(S::Output, RenderReport), Md2PdfError> {
    let fetcher = if config.remote.enabled {
        match MermaidInkFetcher::new(&config.remote) {
            Ok(f) => Some(f),
            Err(e) => {
                warn!("Remote diagram rendering unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };
    let fetcher_ref = fetcher.as_ref().map(|f| f as &dyn DiagramFetcher);
    let resolver = DiagramResolver::new(config, fetcher_ref, scratch);
    DocumentRenderer::new(config, surface, resolver).render(content)
}

fn scratch_dir() -> Result<TempDir, Md2PdfError> {
    let dir = tempfile::Builder::new()
        .prefix("md2pdf-")
        .tempdir()
        .map_err(Md2PdfError::ScratchDir)?;
    debug!("Scratch directory: {}", dir.path().display());
    Ok(dir)
}

fn release_scratch(dir: TempDir) {
    let path = dir.path().to_path_buf();
    if let Err(e) = dir.close() {
        warn!("Failed to remove scratch directory {}: {}", path.display(), e);
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Md2PdfError> {
    let write_err = |source| Md2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp_path = path.with_extension("pdf.tmp");
    std::fs::write(&tmp_path, bytes).map_err(write_err)?;
    std::fs::rename(&tmp_path, path).map_err(write_err)?;
    Ok(())
}

fn has_png_signature(path: &Path) -> bool {
    let mut header = [0u8; 8];
    std::fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut header))
        .map(|_| header == PNG_SIGNATURE)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::surface::RecordingSurface;

    #[test]
    fn load_input_missing_file() {
        let err = load_input(Path::new("/definitely/not/here.md")).unwrap_err();
        assert!(matches!(err, Md2PdfError::InputNotFound { .. }));
    }

    #[test]
    fn load_input_reads_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# Título").unwrap();
        assert_eq!(load_input(&path).unwrap(), "# Título");
    }

    #[test]
    fn load_input_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.md");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            load_input(&path).unwrap_err(),
            Md2PdfError::InputRead { .. }
        ));
    }

    #[test]
    fn inspect_reports_each_kind() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("apps_diagram_rgb.png"),
            b"\x89PNG\r\n\x1a\n....",
        )
        .unwrap();
        std::fs::write(dir.path().join("workflow_diagram_rgb.png"), b"GIF89a").unwrap();
        let config = RenderConfig::builder().assets_dir(dir.path()).build().unwrap();

        let status = inspect_assets(&config);
        assert_eq!(status.len(), 4);

        let by_kind = |k| status.iter().find(|s| s.kind == k).unwrap();
        let arch = by_kind(DiagramKind::Architecture);
        assert!(!arch.exists);
        assert_eq!(arch.size_bytes, None);

        let apps = by_kind(DiagramKind::Apps);
        assert!(apps.exists && apps.png_signature);
        assert_eq!(apps.size_bytes, Some(12));

        let workflow = by_kind(DiagramKind::Workflow);
        assert!(workflow.exists && !workflow.png_signature);

        assert_eq!(by_kind(DiagramKind::Generic).path, None);
    }

    #[test]
    fn write_atomic_creates_parents_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.pdf");
        write_atomic(&path, b"%PDF-1.7").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
        assert!(!dir.path().join("nested/out.pdf.tmp").exists());
    }

    #[test]
    fn render_with_recording_surface() {
        let config = RenderConfig::builder().remote_enabled(false).build().unwrap();
        let (ops, report) =
            render_with_surface("# Hello\n\nWorld", &config, RecordingSurface::new()).unwrap();
        assert!(!ops.is_empty());
        assert_eq!(report.stats.pages, 1);
        assert_eq!(report.stats.headings, 1);
    }
}
