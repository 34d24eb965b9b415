//! Configuration types for Markdown-to-PDF rendering.
//!
//! All rendering behaviour is controlled through [`RenderConfig`], built via
//! its [`RenderConfigBuilder`]. Page geometry, banner text, diagram assets,
//! the remote renderer and the line safety bound all live in one struct so a
//! run can be logged and reproduced from a single value.

use crate::error::Md2PdfError;
use crate::pipeline::diagram::DiagramKind;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Configuration for a single render.
///
/// Built via [`RenderConfig::builder()`] or using [`RenderConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_md2pdf::RenderConfig;
///
/// let config = RenderConfig::builder()
///     .assets_dir("pdf_images")
///     .remote_enabled(false)
///     .max_lines(5000)
///     .title("Quarterly Report")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_lines, 5000);
/// ```
#[derive(Clone)]
pub struct RenderConfig {
    /// Page size and margins, in millimetres. Default: A4 portrait.
    pub geometry: PageGeometry,

    /// First-page banner, footer label and closing note.
    pub branding: ReportBranding,

    /// Where pre-rendered diagram images live.
    pub assets: DiagramAssets,

    /// Keyword tokens used to sniff the diagram kind.
    pub rules: DiagramRules,

    /// Remote diagram rendering service.
    pub remote: RemoteConfig,

    /// Safety bound on the number of input lines processed. Default: 2000.
    ///
    /// Lines beyond the bound are ignored and the render reports
    /// `truncated = true`. Pending tables and code blocks are still flushed.
    pub max_lines: usize,

    /// Vertical cursor position (mm from the top edge) past which a diagram
    /// starts on a fresh page. Default: 180.
    pub diagram_break_threshold_mm: f32,

    /// Explicit path to a pdfium shared library. Takes precedence over
    /// `PDFIUM_LIB_PATH` and the download cache.
    pub pdfium_library: Option<PathBuf>,

    /// Allow downloading pdfium on first use when no local copy is found.
    /// Default: true.
    pub allow_engine_download: bool,

    /// Receives the diagnostic transcript (progress, diagram outcomes).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::default(),
            branding: ReportBranding::default(),
            assets: DiagramAssets::default(),
            rules: DiagramRules::default(),
            remote: RemoteConfig::default(),
            max_lines: 2000,
            diagram_break_threshold_mm: 180.0,
            pdfium_library: None,
            allow_engine_download: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("geometry", &self.geometry)
            .field("branding", &self.branding)
            .field("assets", &self.assets)
            .field("rules", &self.rules)
            .field("remote", &self.remote)
            .field("max_lines", &self.max_lines)
            .field("diagram_break_threshold_mm", &self.diagram_break_threshold_mm)
            .field("pdfium_library", &self.pdfium_library)
            .field("allow_engine_download", &self.allow_engine_download)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn RenderProgressCallback>"),
            )
            .finish()
    }
}

impl RenderConfig {
    /// Create a new builder for `RenderConfig`.
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RenderConfig`].
#[derive(Debug)]
pub struct RenderConfigBuilder {
    config: RenderConfig,
}

impl RenderConfigBuilder {
    pub fn geometry(mut self, geometry: PageGeometry) -> Self {
        self.config.geometry = geometry;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.branding.title = Some(title.into());
        self
    }

    pub fn tagline(mut self, tagline: impl Into<String>) -> Self {
        self.config.branding.tagline = Some(tagline.into());
        self
    }

    pub fn footer_label(mut self, label: impl Into<String>) -> Self {
        self.config.branding.footer_label = label.into();
        self
    }

    pub fn closing_note(mut self, note: impl Into<String>) -> Self {
        self.config.branding.closing_note = Some(note.into());
        self
    }

    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.assets.dir = dir.into();
        self
    }

    pub fn assets(mut self, assets: DiagramAssets) -> Self {
        self.config.assets = assets;
        self
    }

    pub fn rules(mut self, rules: DiagramRules) -> Self {
        self.config.rules = rules;
        self
    }

    pub fn remote_enabled(mut self, enabled: bool) -> Self {
        self.config.remote.enabled = enabled;
        self
    }

    pub fn remote_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.remote.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn remote_timeout_secs(mut self, secs: u64) -> Self {
        self.config.remote.timeout_secs = secs.max(1);
        self
    }

    pub fn max_lines(mut self, n: usize) -> Self {
        self.config.max_lines = n.max(1);
        self
    }

    pub fn diagram_break_threshold_mm(mut self, mm: f32) -> Self {
        self.config.diagram_break_threshold_mm = mm.max(0.0);
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn allow_engine_download(mut self, v: bool) -> Self {
        self.config.allow_engine_download = v;
        self
    }

    /// Attach a progress callback that receives the diagnostic transcript.
    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RenderConfig, Md2PdfError> {
        let c = &self.config;
        c.geometry.validate()?;
        if c.max_lines == 0 {
            return Err(Md2PdfError::InvalidConfig(
                "max_lines must be ≥ 1".into(),
            ));
        }
        if c.diagram_break_threshold_mm > c.geometry.height_mm {
            return Err(Md2PdfError::InvalidConfig(format!(
                "diagram break threshold {}mm is beyond the page ({}mm tall)",
                c.diagram_break_threshold_mm, c.geometry.height_mm
            )));
        }
        if c.remote.enabled
            && !(c.remote.endpoint.starts_with("http://")
                || c.remote.endpoint.starts_with("https://"))
        {
            return Err(Md2PdfError::InvalidConfig(format!(
                "remote endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.remote.endpoint
            )));
        }
        Ok(self.config)
    }
}

// ── Page geometry ────────────────────────────────────────────────────────

/// Page size and margins in millimetres (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_left_mm: f32,
    pub margin_right_mm: f32,
    pub margin_top_mm: f32,
    /// Content may not extend below `height_mm - break_margin_mm`.
    pub break_margin_mm: f32,
    /// Distance of the footer banner from the bottom edge.
    pub footer_offset_mm: f32,
    /// Side margin used for full-width diagram images.
    pub image_margin_mm: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageGeometry {
    /// A4 portrait with 10 mm margins and a 15 mm bottom break margin.
    pub fn a4() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_left_mm: 10.0,
            margin_right_mm: 10.0,
            margin_top_mm: 10.0,
            break_margin_mm: 15.0,
            footer_offset_mm: 15.0,
            image_margin_mm: 20.0,
        }
    }

    /// Horizontal space between the left and right margins.
    pub fn content_width(&self) -> f32 {
        self.width_mm - self.margin_left_mm - self.margin_right_mm
    }

    /// X coordinate of the right margin.
    pub fn content_right(&self) -> f32 {
        self.width_mm - self.margin_right_mm
    }

    /// Lowest Y a drawn element may reach before an automatic page break.
    pub fn page_break_y(&self) -> f32 {
        self.height_mm - self.break_margin_mm
    }

    /// Width available to a diagram image placed between the image margins.
    pub fn image_width(&self) -> f32 {
        self.width_mm - 2.0 * self.image_margin_mm
    }

    fn validate(&self) -> Result<(), Md2PdfError> {
        if self.width_mm <= 0.0 || self.height_mm <= 0.0 {
            return Err(Md2PdfError::InvalidConfig(format!(
                "page size must be positive, got {}×{}mm",
                self.width_mm, self.height_mm
            )));
        }
        if self.content_width() <= 0.0 || self.image_width() <= 0.0 {
            return Err(Md2PdfError::InvalidConfig(
                "horizontal margins leave no room for content".into(),
            ));
        }
        if self.margin_top_mm >= self.page_break_y() {
            return Err(Md2PdfError::InvalidConfig(
                "vertical margins leave no room for content".into(),
            ));
        }
        Ok(())
    }
}

// ── Branding ─────────────────────────────────────────────────────────────

/// Banner and footer text. Everything except the footer label is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBranding {
    /// Large title drawn at the top of page 1. No banner when `None`.
    pub title: Option<String>,
    /// Subtitle under the title (only drawn together with a title).
    pub tagline: Option<String>,
    /// Word printed before the page number in every footer.
    pub footer_label: String,
    /// Centered italic line appended after the last element.
    pub closing_note: Option<String>,
}

impl Default for ReportBranding {
    fn default() -> Self {
        Self {
            title: None,
            tagline: None,
            footer_label: "Page".to_string(),
            closing_note: None,
        }
    }
}

// ── Diagram assets ───────────────────────────────────────────────────────

/// Pre-rendered diagram images, keyed by [`DiagramKind`].
///
/// File names are resolved relative to `dir`. `Generic` diagrams have no
/// asset and always go to the remote renderer or the placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramAssets {
    pub dir: PathBuf,
    pub architecture: Option<String>,
    pub apps: Option<String>,
    pub workflow: Option<String>,
}

impl Default for DiagramAssets {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("pdf_images"),
            architecture: Some("arquitecture_diagram_rgb.png".to_string()),
            apps: Some("apps_diagram_rgb.png".to_string()),
            workflow: Some("workflow_diagram_rgb.png".to_string()),
        }
    }
}

impl DiagramAssets {
    /// Configured file name for `kind`, if any.
    pub fn file_name(&self, kind: DiagramKind) -> Option<&str> {
        match kind {
            DiagramKind::Architecture => self.architecture.as_deref(),
            DiagramKind::Apps => self.apps.as_deref(),
            DiagramKind::Workflow => self.workflow.as_deref(),
            DiagramKind::Generic => None,
        }
    }

    /// Full path of the asset for `kind`, if one is configured.
    pub fn path_for(&self, kind: DiagramKind) -> Option<PathBuf> {
        self.file_name(kind).map(|name| self.dir.join(name))
    }

    /// The directory holding the assets.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Substring tokens that decide the [`DiagramKind`] of a Mermaid block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramRules {
    /// Keyword marking a flowchart-style graph.
    pub graph_keyword: String,
    /// Any of these inside a graph → architecture diagram.
    pub backend_tokens: Vec<String>,
    /// Any of these inside a graph → apps diagram.
    pub role_tokens: Vec<String>,
    /// Keyword marking a state diagram → workflow diagram.
    pub state_keyword: String,
}

impl Default for DiagramRules {
    fn default() -> Self {
        Self {
            graph_keyword: "graph".to_string(),
            backend_tokens: vec!["Backend API".to_string()],
            role_tokens: vec!["Tecnicos".to_string(), "Empresas".to_string()],
            state_keyword: "stateDiagram".to_string(),
        }
    }
}

// ── Remote renderer ──────────────────────────────────────────────────────

/// Settings for the remote diagram-rendering endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Try the remote renderer when no local asset is usable. Default: true.
    pub enabled: bool,
    /// Base URL; the encoded diagram source is appended as a path segment.
    pub endpoint: String,
    /// Query string appended to every request (without the leading `?`).
    pub query: String,
    /// Request timeout in seconds. Default: 10.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://mermaid.ink/img".to_string(),
            query: "type=png&theme=dark&bgColor=1a1a2e".to_string(),
            timeout_secs: 10,
            user_agent: concat!("edgequake-md2pdf/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a4_report() {
        let c = RenderConfig::default();
        assert_eq!(c.max_lines, 2000);
        assert_eq!(c.geometry.content_width(), 190.0);
        assert_eq!(c.geometry.image_width(), 170.0);
        assert_eq!(c.geometry.page_break_y(), 282.0);
        assert!(c.remote.enabled);
        assert_eq!(c.remote.timeout_secs, 10);
    }

    #[test]
    fn builder_clamps_values() {
        let c = RenderConfig::builder()
            .max_lines(0)
            .remote_timeout_secs(0)
            .build()
            .unwrap();
        assert_eq!(c.max_lines, 1);
        assert_eq!(c.remote.timeout_secs, 1);
    }

    #[test]
    fn builder_trims_endpoint_slash() {
        let c = RenderConfig::builder()
            .remote_endpoint("https://kroki.example/mermaid/")
            .build()
            .unwrap();
        assert_eq!(c.remote.endpoint, "https://kroki.example/mermaid");
    }

    #[test]
    fn builder_rejects_non_http_endpoint() {
        let err = RenderConfig::builder()
            .remote_endpoint("ftp://nope")
            .build()
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::InvalidConfig(_)));
    }

    #[test]
    fn threshold_past_page_bottom_is_rejected() {
        let err = RenderConfig::builder()
            .diagram_break_threshold_mm(400.0)
            .build()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("beyond the page"), "got: {msg}");
        assert!(msg.contains("297mm tall"), "got: {msg}");
    }

    #[test]
    fn disabled_remote_skips_endpoint_check() {
        let c = RenderConfig::builder()
            .remote_endpoint("not a url")
            .remote_enabled(false)
            .build();
        assert!(c.is_ok());
    }

    #[test]
    fn builder_rejects_degenerate_geometry() {
        let geometry = PageGeometry {
            margin_left_mm: 150.0,
            margin_right_mm: 80.0,
            ..PageGeometry::a4()
        };
        let err = RenderConfig::builder().geometry(geometry).build().unwrap_err();
        assert!(err.to_string().contains("margins"));
    }

    #[test]
    fn asset_paths_resolve_per_kind() {
        let assets = DiagramAssets {
            dir: PathBuf::from("/assets"),
            ..DiagramAssets::default()
        };
        assert_eq!(
            assets.path_for(DiagramKind::Workflow),
            Some(PathBuf::from("/assets/workflow_diagram_rgb.png"))
        );
        assert_eq!(assets.path_for(DiagramKind::Generic), None);
    }

    #[test]
    fn debug_hides_callback() {
        let c = RenderConfig::default();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("max_lines"));
        assert!(dbg.contains("progress_callback: None"));
    }
}
