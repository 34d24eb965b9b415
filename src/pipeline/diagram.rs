//! Diagram kind sniffing and the local → remote → placeholder fallback chain.
//!
//! Each step yields a [`StepResult`]; the resolver takes the first one that
//! is not a failure. Failures never escape: they are logged and collected in
//! [`DiagramReport::attempts`]. The placeholder step always succeeds, so only
//! a drawing error on the surface can make [`DiagramResolver::resolve`] fail.

use crate::canvas::surface::Surface;
use crate::canvas::{primitives, Canvas};
use crate::config::{DiagramRules, RenderConfig};
use crate::error::{DiagramError, Md2PdfError};
use crate::output::{DiagramOutcome, DiagramReport, DiagramSource};
use crate::pipeline::remote::{self, DiagramFetcher};
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Which pre-rendered asset a Mermaid block corresponds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramKind {
    Architecture,
    Apps,
    Workflow,
    Generic,
}

impl DiagramKind {
    pub const ALL: [DiagramKind; 4] = [
        DiagramKind::Architecture,
        DiagramKind::Apps,
        DiagramKind::Workflow,
        DiagramKind::Generic,
    ];

    /// Decide the kind from keyword tokens in the source.
    ///
    /// A graph is an architecture diagram when it mentions a backend token
    /// and an apps diagram when it mentions a role token; any other graph is
    /// generic. State diagrams are workflows.
    pub fn sniff(source: &str, rules: &DiagramRules) -> Self {
        let has_any = |tokens: &[String]| tokens.iter().any(|t| source.contains(t.as_str()));
        if source.contains(rules.graph_keyword.as_str()) {
            if has_any(&rules.backend_tokens) {
                DiagramKind::Architecture
            } else if has_any(&rules.role_tokens) {
                DiagramKind::Apps
            } else {
                DiagramKind::Generic
            }
        } else if source.contains(rules.state_keyword.as_str()) {
            DiagramKind::Workflow
        } else {
            DiagramKind::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramKind::Architecture => "architecture",
            DiagramKind::Apps => "apps",
            DiagramKind::Workflow => "workflow",
            DiagramKind::Generic => "generic",
        }
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A Mermaid block taken from the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramDescriptor {
    pub kind: DiagramKind,
    pub source: String,
}

/// An image ready to be placed.
pub struct ResolvedImage {
    pub source: DiagramSource,
    pub image: DynamicImage,
}

/// Outcome of one fallback step.
pub enum StepResult {
    /// The step could not produce anything; try the next one.
    Failed(DiagramError),
    Image(ResolvedImage),
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    LocalAsset,
    Remote,
    Placeholder,
}

const CHAIN: [Step; 3] = [Step::LocalAsset, Step::Remote, Step::Placeholder];

/// Space left below a local asset image.
const LOCAL_GAP_MM: f32 = 10.0;
/// Space left below a remotely rendered image.
const REMOTE_GAP_MM: f32 = 5.0;

/// Runs the fallback chain for one render.
pub struct DiagramResolver<'a> {
    config: &'a RenderConfig,
    fetcher: Option<&'a dyn DiagramFetcher>,
    scratch_dir: &'a Path,
}

impl<'a> DiagramResolver<'a> {
    /// `fetcher` may be `None` when the remote step is disabled.
    pub fn new(
        config: &'a RenderConfig,
        fetcher: Option<&'a dyn DiagramFetcher>,
        scratch_dir: &'a Path,
    ) -> Self {
        Self {
            config,
            fetcher,
            scratch_dir,
        }
    }

    /// Place `diagram` on the canvas, breaking the page first when the cursor
    /// is past the diagram threshold.
    pub fn resolve<S: Surface>(
        &self,
        canvas: &mut Canvas<S>,
        diagram: &DiagramDescriptor,
    ) -> Result<DiagramReport, Md2PdfError> {
        info!("Resolving {} diagram", diagram.kind);
        if canvas.y() > self.config.diagram_break_threshold_mm {
            debug!("Cursor at {:.1}mm, starting diagram on a new page", canvas.y());
            canvas.add_page()?;
        }

        let mut attempts = Vec::new();
        for step in CHAIN {
            match self.run(step, diagram) {
                StepResult::Failed(err) => {
                    warn!(
                        "{} diagram: {:?} step failed ({:?}): {}",
                        diagram.kind,
                        step,
                        err.category(),
                        err
                    );
                    attempts.push(err);
                }
                StepResult::Image(resolved) => {
                    let gap = match resolved.source {
                        DiagramSource::LocalAsset(_) => LOCAL_GAP_MM,
                        DiagramSource::Remote(_) => REMOTE_GAP_MM,
                    };
                    let geometry = *canvas.geometry();
                    canvas.image(
                        &resolved.image,
                        geometry.image_margin_mm,
                        geometry.image_width(),
                    )?;
                    canvas.ln(gap);
                    return Ok(DiagramReport {
                        kind: diagram.kind,
                        outcome: DiagramOutcome::Image(resolved.source),
                        attempts,
                    });
                }
                StepResult::Placeholder => {
                    self.draw_placeholder(canvas, diagram.kind)?;
                    return Ok(DiagramReport {
                        kind: diagram.kind,
                        outcome: DiagramOutcome::Placeholder,
                        attempts,
                    });
                }
            }
        }
        Err(Md2PdfError::Internal(
            "diagram fallback chain ended without a placeholder".into(),
        ))
    }

    fn run(&self, step: Step, diagram: &DiagramDescriptor) -> StepResult {
        let result = match step {
            Step::LocalAsset => self.local_asset(diagram.kind),
            Step::Remote => self.remote(&diagram.source),
            Step::Placeholder => return StepResult::Placeholder,
        };
        match result {
            Ok(resolved) => StepResult::Image(resolved),
            Err(e) => StepResult::Failed(e),
        }
    }

    fn local_asset(&self, kind: DiagramKind) -> Result<ResolvedImage, DiagramError> {
        let path = self
            .config
            .assets
            .path_for(kind)
            .ok_or_else(|| DiagramError::AssetNotConfigured {
                kind: kind.to_string(),
            })?;
        if !path.is_file() {
            return Err(DiagramError::AssetMissing { path });
        }
        debug!("Loading diagram asset {}", path.display());
        let malformed = |detail: String| DiagramError::MalformedAsset {
            path: path.clone(),
            detail,
        };
        // Sniff the content; assets are often JPEGs saved under a .png name.
        let image = ImageReader::open(&path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| malformed(e.to_string()))?
            .decode()
            .map_err(|e| malformed(e.to_string()))?;
        Ok(ResolvedImage {
            image: to_rgb(image)?,
            source: DiagramSource::LocalAsset(path),
        })
    }

    fn remote(&self, source: &str) -> Result<ResolvedImage, DiagramError> {
        let fetcher = match self.fetcher {
            Some(f) if self.config.remote.enabled => f,
            _ => return Err(DiagramError::RemoteDisabled),
        };
        let bytes = fetcher.fetch(source)?;
        let (path, format) = remote::persist_image(&bytes, source, self.scratch_dir)?;
        let image = image::load_from_memory_with_format(&bytes, format).map_err(|e| {
            DiagramError::MalformedAsset {
                path: path.clone(),
                detail: e.to_string(),
            }
        })?;
        Ok(ResolvedImage {
            image: to_rgb(image)?,
            source: DiagramSource::Remote(path),
        })
    }

    fn draw_placeholder<S: Surface>(
        &self,
        canvas: &mut Canvas<S>,
        kind: DiagramKind,
    ) -> Result<(), Md2PdfError> {
        let assets = &self.config.assets;
        let caption = format!(
            "[{} diagram - add the image to {}/]",
            kind.as_str().to_uppercase(),
            assets.dir().display()
        );
        let file = assets
            .file_name(kind)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{kind}_diagram.png"));
        let hint = format!("Tip: render the PNG at mermaid.live and save it as {file}");
        primitives::placeholder(canvas, &caption, &hint)
    }
}

/// Flatten to 8-bit RGB; alpha and palette images become opaque RGB.
fn to_rgb(image: DynamicImage) -> Result<DynamicImage, DiagramError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(DiagramError::Placement {
            detail: format!("image has zero size ({}x{})", image.width(), image.height()),
        });
    }
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::surface::{DrawOp, RecordingSurface};
    use crate::config::{PageGeometry, ReportBranding};
    use std::io::Cursor;

    struct FixedFetcher(Result<Vec<u8>, DiagramError>);

    impl DiagramFetcher for FixedFetcher {
        fn fetch(&self, _source: &str) -> Result<Vec<u8>, DiagramError> {
            self.0.clone()
        }
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::new_rgba8(w, h)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn canvas() -> Canvas<RecordingSurface> {
        let mut c = Canvas::new(
            RecordingSurface::new(),
            PageGeometry::a4(),
            ReportBranding::default(),
        );
        c.add_page().unwrap();
        c
    }

    fn descriptor(kind: DiagramKind) -> DiagramDescriptor {
        DiagramDescriptor {
            kind,
            source: "graph TD\n A-->B".into(),
        }
    }

    #[test]
    fn sniff_follows_keyword_rules() {
        let rules = DiagramRules::default();
        assert_eq!(
            DiagramKind::sniff("graph TD\n A --> F[Backend API]", &rules),
            DiagramKind::Architecture
        );
        assert_eq!(
            DiagramKind::sniff("graph LR\n T[Tecnicos] --> E", &rules),
            DiagramKind::Apps
        );
        assert_eq!(
            DiagramKind::sniff("stateDiagram-v2\n [*] --> Open", &rules),
            DiagramKind::Workflow
        );
        assert_eq!(DiagramKind::sniff("graph TD\n A-->B", &rules), DiagramKind::Generic);
        assert_eq!(DiagramKind::sniff("sequenceDiagram", &rules), DiagramKind::Generic);
    }

    #[test]
    fn graph_wins_over_state_keyword() {
        let rules = DiagramRules::default();
        assert_eq!(
            DiagramKind::sniff("graph TD\n %% stateDiagram", &rules),
            DiagramKind::Generic
        );
    }

    #[test]
    fn placeholder_when_nothing_available() {
        let scratch = tempfile::tempdir().unwrap();
        let assets_dir = tempfile::tempdir().unwrap();
        let config = RenderConfig::builder()
            .assets_dir(assets_dir.path())
            .build()
            .unwrap();
        let fetcher = FixedFetcher(Err(DiagramError::Network {
            detail: "connection refused".into(),
        }));
        let resolver = DiagramResolver::new(&config, Some(&fetcher), scratch.path());
        let mut c = canvas();
        let report = resolver.resolve(&mut c, &descriptor(DiagramKind::Architecture)).unwrap();

        assert_eq!(report.outcome, DiagramOutcome::Placeholder);
        assert_eq!(report.attempts.len(), 2);
        assert!(matches!(report.attempts[0], DiagramError::AssetMissing { .. }));
        assert!(matches!(report.attempts[1], DiagramError::Network { .. }));
        assert_eq!(c.y(), 55.0);

        let ops = c.finish().unwrap();
        assert!(ops.iter().any(|op| matches!(
            op,
            DrawOp::Text { text, .. } if text.starts_with("[ARCHITECTURE diagram")
        )));
        assert!(ops.iter().any(|op| matches!(
            op,
            DrawOp::Text { text, .. } if text.ends_with("arquitecture_diagram_rgb.png")
        )));
    }

    #[test]
    fn generic_without_remote_reports_both_failures() {
        let scratch = tempfile::tempdir().unwrap();
        let config = RenderConfig::builder().remote_enabled(false).build().unwrap();
        let resolver = DiagramResolver::new(&config, None, scratch.path());
        let mut c = canvas();
        let report = resolver.resolve(&mut c, &descriptor(DiagramKind::Generic)).unwrap();
        assert_eq!(
            report.attempts,
            vec![
                DiagramError::AssetNotConfigured {
                    kind: "generic".into()
                },
                DiagramError::RemoteDisabled
            ]
        );
    }

    #[test]
    fn local_asset_is_placed_at_image_margin() {
        let scratch = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();
        std::fs::write(
            assets.path().join("workflow_diagram_rgb.png"),
            png_bytes(340, 170),
        )
        .unwrap();
        let config = RenderConfig::builder()
            .assets_dir(assets.path())
            .remote_enabled(false)
            .build()
            .unwrap();
        let resolver = DiagramResolver::new(&config, None, scratch.path());
        let mut c = canvas();
        let report = resolver.resolve(&mut c, &descriptor(DiagramKind::Workflow)).unwrap();

        assert!(matches!(
            report.outcome,
            DiagramOutcome::Image(DiagramSource::LocalAsset(_))
        ));
        assert!(report.attempts.is_empty());
        // 10 top + 85 image + 10 gap
        assert_eq!(c.y(), 105.0);
        let ops = c.finish().unwrap();
        assert!(ops.iter().any(|op| matches!(
            op,
            DrawOp::Image { rect, .. } if rect.x == 20.0 && rect.w == 170.0
        )));
    }

    #[test]
    fn jpeg_named_png_is_loaded_by_content() {
        let scratch = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();
        let mut jpeg = Vec::new();
        DynamicImage::new_rgb8(60, 30)
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();
        std::fs::write(assets.path().join("workflow_diagram_rgb.png"), jpeg).unwrap();
        let config = RenderConfig::builder()
            .assets_dir(assets.path())
            .remote_enabled(false)
            .build()
            .unwrap();
        let resolver = DiagramResolver::new(&config, None, scratch.path());
        let mut c = canvas();
        let report = resolver.resolve(&mut c, &descriptor(DiagramKind::Workflow)).unwrap();

        assert!(report.attempts.is_empty(), "attempts: {:?}", report.attempts);
        assert!(matches!(
            report.outcome,
            DiagramOutcome::Image(DiagramSource::LocalAsset(_))
        ));
    }

    #[test]
    fn malformed_asset_falls_through_to_remote() {
        let scratch = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();
        std::fs::write(assets.path().join("apps_diagram_rgb.png"), b"not a png").unwrap();
        let config = RenderConfig::builder()
            .assets_dir(assets.path())
            .build()
            .unwrap();
        let fetcher = FixedFetcher(Ok(png_bytes(170, 170)));
        let resolver = DiagramResolver::new(&config, Some(&fetcher), scratch.path());
        let mut c = canvas();
        let report = resolver.resolve(&mut c, &descriptor(DiagramKind::Apps)).unwrap();

        assert!(matches!(report.attempts[0], DiagramError::MalformedAsset { .. }));
        let DiagramOutcome::Image(DiagramSource::Remote(path)) = &report.outcome else {
            panic!("expected remote image, got {:?}", report.outcome);
        };
        assert!(path.starts_with(scratch.path()));
        // 10 top + 170 image + 5 gap
        assert_eq!(c.y(), 185.0);
    }

    #[test]
    fn html_response_is_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        let config = RenderConfig::builder().build().unwrap();
        let fetcher = FixedFetcher(Ok(b"<!DOCTYPE html>".to_vec()));
        let resolver = DiagramResolver::new(&config, Some(&fetcher), scratch.path());
        let mut c = canvas();
        let report = resolver.resolve(&mut c, &descriptor(DiagramKind::Generic)).unwrap();
        assert_eq!(report.outcome, DiagramOutcome::Placeholder);
        assert!(matches!(report.attempts[1], DiagramError::NotAnImage { .. }));
    }

    #[test]
    fn breaks_page_past_threshold() {
        let scratch = tempfile::tempdir().unwrap();
        let config = RenderConfig::builder().remote_enabled(false).build().unwrap();
        let resolver = DiagramResolver::new(&config, None, scratch.path());
        let mut c = canvas();
        c.ln(175.0); // y = 185
        resolver.resolve(&mut c, &descriptor(DiagramKind::Generic)).unwrap();
        assert_eq!(c.page(), 2);
    }
}
