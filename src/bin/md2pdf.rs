//! CLI binary for edgequake-md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RenderConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_md2pdf::{
    inspect_assets, load_input, render_to_file, DiagramOutcome, DiagramReport, DiagramSource,
    ProgressCallback, RenderConfig, RenderProgressCallback, RenderStats,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a line-count progress bar plus one log line
/// per resolved diagram.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Diagrams that fell through to the placeholder.
    placeholders: AtomicUsize,
}

impl CliProgressCallback {
    /// The bar length is set by `on_render_start` once the line count is known.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Binding PDF engine…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            placeholders: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>5}/{len} lines  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
    }
}

impl RenderProgressCallback for CliProgressCallback {
    fn on_render_start(&self, total_lines: usize, max_lines: usize) {
        self.activate_bar(total_lines.min(max_lines));
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_lines} lines…"))
        ));
    }

    fn on_lines_processed(&self, processed: usize, _total_lines: usize) {
        self.bar.set_position(processed as u64);
    }

    fn on_diagram_resolved(&self, index: usize, report: &DiagramReport) {
        let line = match &report.outcome {
            DiagramOutcome::Image(DiagramSource::LocalAsset(path)) => format!(
                "  {} Diagram {:>2}  {:<12}  {}",
                green("✓"),
                index,
                report.kind,
                dim(&format!("local {}", path.display())),
            ),
            DiagramOutcome::Image(DiagramSource::Remote(_)) => format!(
                "  {} Diagram {:>2}  {:<12}  {}",
                green("✓"),
                index,
                report.kind,
                dim("rendered remotely"),
            ),
            DiagramOutcome::Placeholder => {
                self.placeholders.fetch_add(1, Ordering::SeqCst);
                let reason = report
                    .attempts
                    .last()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                let reason = if reason.len() > 80 {
                    format!("{}\u{2026}", reason.chars().take(79).collect::<String>())
                } else {
                    reason
                };
                format!(
                    "  {} Diagram {:>2}  {:<12}  {}  {}",
                    yellow("○"),
                    index,
                    report.kind,
                    yellow("placeholder"),
                    dim(&reason),
                )
            }
        };
        self.bar.println(line);
    }

    fn on_line_limit_reached(&self, max_lines: usize, total_lines: usize) {
        self.bar.println(format!(
            "  {} Stopped after {max_lines} of {total_lines} lines (raise --max-lines)",
            red("✗"),
        ));
    }

    fn on_render_complete(&self, stats: &RenderStats) {
        self.bar.finish_and_clear();
        let placeholders = self.placeholders.load(Ordering::SeqCst);
        let mark = if placeholders == 0 && !stats.truncated {
            green("✔")
        } else {
            cyan("⚠")
        };
        eprintln!(
            "{} {} pages, {} diagrams ({} placeholders)",
            mark,
            bold(&stats.pages.to_string()),
            stats.diagrams,
            placeholders,
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render next to the input (report.md -> report.pdf)
  md2pdf report.md

  # Explicit output, branded header
  md2pdf report.md -o out/report.pdf --title "OX FIELD SERVICES" \
      --tagline "Field service management platform"

  # Offline: local diagram images or placeholders only
  md2pdf --no-remote --assets-dir docs/pdf_images report.md

  # Read from stdin
  cat report.md | md2pdf - -o report.pdf

  # Check which pre-rendered diagrams are present
  md2pdf --inspect-assets --assets-dir pdf_images

  # JSON render report
  md2pdf --json report.md > report.json

DIAGRAMS:
  Each ```mermaid block is placed by the first step that succeeds:
    1. local image   <assets-dir>/arquitecture_diagram_rgb.png  (graph + backend terms)
                     <assets-dir>/apps_diagram_rgb.png         (graph + role terms)
                     <assets-dir>/workflow_diagram_rgb.png     (stateDiagram)
    2. remote        GET <diagram-endpoint>/<base64url source>
    3. placeholder   framed box naming the missing file

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH          Path to an existing libpdfium — skips auto-download
  MD2PDF_PDFIUM_CACHE_DIR  Override the default pdfium cache directory
  MD2PDF_ASSETS_DIR        Directory with pre-rendered diagram images
  MD2PDF_NO_REMOTE         Disable the remote diagram renderer
  RUST_LOG                 Override the log filter (e.g. edgequake_md2pdf=debug)

SETUP:
  PDFium (~30 MB) is downloaded automatically on first run and cached in
  ~/.cache/md2pdf/pdfium-7690/. No manual library setup is required.
  To use an existing pdfium copy: PDFIUM_LIB_PATH=/path/to/libpdfium md2pdf ...
"#;

/// Render Markdown-style reports to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Render Markdown-style reports to paginated PDF",
    long_about = "Render lightly marked-up Markdown reports (headings, lists, checkboxes, \
pipe tables, fenced code) to a paginated A4 PDF. Mermaid blocks are placed from pre-rendered \
images, rendered through mermaid.ink, or replaced by a placeholder so a report is always produced.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown file path, or `-` for stdin.
    #[arg(required_unless_present = "inspect_assets")]
    input: Option<PathBuf>,

    /// Write the PDF here (default: input path with a .pdf extension).
    #[arg(short, long, env = "MD2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Directory holding pre-rendered diagram images.
    #[arg(long, env = "MD2PDF_ASSETS_DIR", default_value = "pdf_images")]
    assets_dir: PathBuf,

    /// Never call the remote diagram renderer.
    #[arg(long, env = "MD2PDF_NO_REMOTE")]
    no_remote: bool,

    /// Base URL of the remote diagram renderer.
    #[arg(long, env = "MD2PDF_DIAGRAM_ENDPOINT")]
    diagram_endpoint: Option<String>,

    /// Remote renderer timeout in seconds.
    #[arg(long, env = "MD2PDF_REMOTE_TIMEOUT", default_value_t = 10)]
    remote_timeout: u64,

    /// Stop after this many input lines.
    #[arg(long, env = "MD2PDF_MAX_LINES", default_value_t = 2000,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_lines: u64,

    /// Title printed in the first-page banner.
    #[arg(long, env = "MD2PDF_TITLE")]
    title: Option<String>,

    /// Subtitle printed under the title.
    #[arg(long, env = "MD2PDF_TAGLINE")]
    tagline: Option<String>,

    /// Italic note printed after the last element.
    #[arg(long, env = "MD2PDF_CLOSING_NOTE")]
    closing_note: Option<String>,

    /// Word printed before the page number in the footer.
    #[arg(long, env = "MD2PDF_FOOTER_LABEL")]
    footer_label: Option<String>,

    /// Path to an existing pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Report the pre-rendered diagram assets and exit.
    #[arg(long)]
    inspect_assets: bool,

    /// Print the render report (or asset status) as JSON on stdout.
    #[arg(long, env = "MD2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2PDF_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports diagrams, so library INFO logs are
    // hidden while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_assets;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn RenderProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-assets mode ──────────────────────────────────────────────
    if cli.inspect_assets {
        let status = inspect_assets(&config);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&status).context("Failed to serialise asset status")?
            );
        } else {
            println!("Assets dir:  {}", config.assets.dir().display());
            for s in &status {
                let state = match (&s.path, s.exists, s.png_signature) {
                    (None, _, _) => dim("no asset configured"),
                    (Some(_), false, _) => red("missing"),
                    (Some(_), true, false) => yellow("not a PNG"),
                    (Some(_), true, true) => green("ok"),
                };
                let size = s
                    .size_bytes
                    .map(|b| format!("{b} bytes"))
                    .unwrap_or_default();
                println!("  {:<12} {:<22} {}", s.kind.to_string(), state, dim(&size));
            }
        }
        return Ok(());
    }

    // ── Render ───────────────────────────────────────────────────────────
    let input = cli
        .input
        .as_deref()
        .context("An input file (or `-` for stdin) is required")?;
    let output_path = output_path_for(input, cli.output.as_deref());

    let content = load_input(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let report = render_to_file(&content, &output_path, &config).context("Rendering failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    }

    if !cli.quiet {
        let stats = &report.stats;
        eprintln!(
            "{}  {} pages  {}/{} lines  {}ms  →  {}",
            if report.placeholder_count() == 0 && !stats.truncated {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.pages,
            stats.processed_lines,
            stats.total_lines,
            stats.duration_ms,
            bold(&output_path.display().to_string()),
        );
        if stats.truncated {
            eprintln!(
                "   {}",
                yellow(&format!(
                    "input truncated at {} lines; raise --max-lines to render the rest",
                    stats.processed_lines
                ))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `RenderConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RenderConfig> {
    let max_lines = usize::try_from(cli.max_lines).unwrap_or(usize::MAX);

    let mut builder = RenderConfig::builder()
        .assets_dir(&cli.assets_dir)
        .remote_enabled(!cli.no_remote)
        .remote_timeout_secs(cli.remote_timeout)
        .max_lines(max_lines);

    if let Some(ref endpoint) = cli.diagram_endpoint {
        builder = builder.remote_endpoint(endpoint.as_str());
    }
    if let Some(ref title) = cli.title {
        builder = builder.title(title.as_str());
    }
    if let Some(ref tagline) = cli.tagline {
        builder = builder.tagline(tagline.as_str());
    }
    if let Some(ref note) = cli.closing_note {
        builder = builder.closing_note(note.as_str());
    }
    if let Some(ref label) = cli.footer_label {
        builder = builder.footer_label(label.as_str());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `report.md` → `report.pdf`; stdin → `report.pdf` in the working directory.
fn output_path_for(input: &Path, explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if input == Path::new("-") {
        return PathBuf::from("report.pdf");
    }
    input.with_extension("pdf")
}
