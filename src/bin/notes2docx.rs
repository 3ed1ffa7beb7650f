//! CLI binary for notes2docx.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ProcessingConfig`, renders run events, and writes the exported document.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use notes2docx::config::DEFAULT_ENDPOINT;
use notes2docx::export::{self, ExportFormat};
use notes2docx::{
    BatchSummary, Callback, Gallery, PageImage, ProcessOutcome, ProcessingCallback,
    ProcessingConfig, ProcessingState, Processor, Session,
};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

// ── CLI callback using indicatif ─────────────────────────────────────────────

/// Terminal rendering of run events: the progress bar is the loading
/// indicator, and per-page lines (plus the text itself with `--print`) are
/// the results area.
struct CliCallback {
    bar: ProgressBar,
    print_text: bool,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliCallback {
    fn new(show_progress: bool, print_text: bool) -> Arc<Self> {
        let bar = if show_progress {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(TICKS),
            );
            bar.set_prefix("Preparing");
            bar.set_message("Opening PDF…");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        } else {
            ProgressBar::hidden()
        };

        Arc::new(Self {
            bar,
            print_text,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Transcribing");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print above the bar; a hidden bar prints straight through.
    fn line(&self, msg: String) {
        self.bar.suspend(|| eprintln!("{msg}"));
    }

    fn page_text(&self, page_num: usize, text: &str) {
        if self.print_text {
            self.bar
                .suspend(|| println!("\n## Page {page_num}\n\n{}\n", text.trim_end()));
        }
    }
}

impl ProcessingCallback for CliCallback {
    fn on_prompt(&self, message: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", cyan("?"), message);
    }

    fn on_state_change(&self, state: &ProcessingState) {
        if let ProcessingState::Rasterizing = state {
            self.bar.set_prefix("Rasterizing");
            self.bar.set_message("rendering pages…");
        }
    }

    fn on_pages_rasterized(&self, pages: &[PageImage]) {
        self.activate_bar(pages.len());
        self.line(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Transcribing {} pages…", pages.len()))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text: &str) {
        let secs = self.elapsed_secs(page_num);
        self.line(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{:>5} chars", text.len())),
            dim(&format!("{secs:.1}s")),
        ));
        self.page_text(page_num, text);
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);

        // Truncate very long error bodies to keep the log tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.line(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.page_text(page_num, &format!("Error: {error}"));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total_pages: usize, _success_count: usize) {
        self.bar.finish_and_clear();
    }

    // The error itself is reported by `main` through anyhow.
    fn on_batch_failed(&self, _error: &str) {
        self.bar.abandon();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Transcribe and export to converted-notes-<date>.docx
  notes2docx notes.pdf

  # Choose the output file
  notes2docx notes.pdf -o lecture-3.docx

  # Markdown instead of Word, printing each page as it arrives
  notes2docx --format markdown --print notes.pdf -o notes.md

  # Convert from URL, four requests in flight
  notes2docx --concurrency 4 https://example.com/scan.pdf

  # Also save the page thumbnails
  notes2docx --thumbnails thumbs/ notes.pdf

  # JSON report (pages, transcriptions, summary) on stdout
  notes2docx --json notes.pdf > report.json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          API key for the transcription endpoint (required)
  NOTES2DOCX_ENDPOINT     Override the generateContent URL
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Override the log filter (e.g. notes2docx=debug)
"#;

/// Transcribe handwritten PDF notes into a Word document.
#[derive(Parser, Debug)]
#[command(
    name = "notes2docx",
    version,
    about = "Transcribe handwritten PDF notes into a Word document",
    long_about = "Render every page of a scanned PDF, send each page image to a Gemini vision \
model for transcription, and export one \"Page N\" section per page as .docx or Markdown. \
A failed page becomes an \"Error: …\" section; the rest of the document is still produced.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: Option<String>,

    /// Output file. Default: converted-notes-<YYYY-MM-DD>.<ext> in the current directory.
    #[arg(short, long, env = "NOTES2DOCX_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(long, env = "NOTES2DOCX_FORMAT", value_enum, default_value = "docx")]
    format: FormatArg,

    /// API key sent with every transcription request.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// generateContent endpoint URL.
    #[arg(long, env = "NOTES2DOCX_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Rendering scale relative to the page size in points (0.5–4.0).
    #[arg(long, env = "NOTES2DOCX_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Transcription requests in flight. 1 sends page i+1 only after page i.
    #[arg(short, long, env = "NOTES2DOCX_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "NOTES2DOCX_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Per-request timeout in seconds. Default: wait indefinitely.
    #[arg(long, env = "NOTES2DOCX_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "NOTES2DOCX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Path to libpdfium, or the directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Write a PNG thumbnail of every page into this directory.
    #[arg(long, value_name = "DIR")]
    thumbnails: Option<PathBuf>,

    /// Longest edge of a thumbnail in pixels.
    #[arg(long, default_value_t = 200)]
    thumbnail_size: u32,

    /// Print each page's text to stdout as soon as it is transcribed.
    #[arg(long)]
    print: bool,

    /// Print a JSON report (pages, transcriptions, summary) to stdout.
    #[arg(long, env = "NOTES2DOCX_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "NOTES2DOCX_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NOTES2DOCX_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "NOTES2DOCX_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Docx,
    Markdown,
}

impl From<FormatArg> for ExportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Docx => ExportFormat::Docx,
            FormatArg::Markdown => ExportFormat::Markdown,
        }
    }
}

/// Shape of `--json` output.
#[derive(Serialize)]
struct JsonReport<'a> {
    output: &'a Path,
    summary: &'a BatchSummary,
    session: &'a Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would fight with the progress bar, so only errors
    // are shown while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config & processor ─────────────────────────────────────────
    let config = config_for(&cli)?;
    let callback = CliCallback::new(show_progress, cli.print && !cli.json);
    let mut processor = Processor::from_config(&config)
        .context("Failed to initialise processor")?
        .with_callback(callback as Callback);

    // ── Run ──────────────────────────────────────────────────────────────
    let outcome = match cli.input.as_deref() {
        Some(input) => processor
            .process_path(input)
            .await
            .context("Processing failed")?,
        None => processor.process(None).await.context("Processing failed")?,
    };
    let summary = match outcome {
        ProcessOutcome::NoFileSelected => return Ok(()),
        ProcessOutcome::Completed(summary) => summary,
    };
    let session = processor.session();

    // ── Gallery ──────────────────────────────────────────────────────────
    if let Some(ref dir) = cli.thumbnails {
        let gallery = Gallery::from_pages(session.pages(), config.thumbnail_max_px)
            .context("Failed to build thumbnails")?;
        let written = gallery
            .write_to_dir(dir)
            .context("Failed to write thumbnails")?;
        if !cli.quiet && !cli.json {
            eprintln!(
                "{}  {} thumbnails  →  {}",
                cyan("◆"),
                written.len(),
                dir.display()
            );
        }
    }

    // ── Export ───────────────────────────────────────────────────────────
    let format = ExportFormat::from(cli.format);
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(export::default_filename(format, export::today())));

    let bytes = format
        .render(session.transcriptions())
        .context("Failed to build document")?;
    export::write_document(&output_path, &bytes).context("Failed to save document")?;

    if cli.json {
        let report = JsonReport {
            output: &output_path,
            summary: &summary,
            session,
        };
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&summary, &output_path);
    }

    Ok(())
}

fn print_summary(summary: &BatchSummary, output_path: &Path) {
    let mark = if summary.failed == 0 {
        green("✔")
    } else if summary.failed == summary.total_pages {
        red("✘")
    } else {
        cyan("⚠")
    };

    eprintln!(
        "{}  {}/{} pages  {}ms  →  {}",
        mark,
        summary.succeeded,
        summary.total_pages,
        summary.total_duration_ms,
        bold(&output_path.display().to_string()),
    );
    if summary.failed > 0 {
        eprintln!(
            "   {} pages exported as error sections",
            red(&summary.failed.to_string())
        );
    }
    eprintln!(
        "   {}",
        dim(&format!(
            "render {}ms  /  transcribe {}ms",
            summary.render_duration_ms, summary.transcribe_duration_ms
        ))
    );
}

/// Config for this invocation. Without an input nothing is sent, so no API
/// key is required and the run ends at the "select a file" prompt.
fn config_for(cli: &Cli) -> Result<ProcessingConfig> {
    match cli.input {
        Some(_) => build_config(cli),
        None => Ok(ProcessingConfig::default()),
    }
}

/// Map CLI args to `ProcessingConfig`.
fn build_config(cli: &Cli) -> Result<ProcessingConfig> {
    let mut builder = ProcessingConfig::builder()
        .api_key(cli.api_key.clone().unwrap_or_default())
        .endpoint(cli.endpoint.clone())
        .scale(cli.scale)
        .concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout)
        .thumbnail_max_px(cli.thumbnail_size);

    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(path.clone());
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_needs_no_api_key() {
        let cli = Cli::try_parse_from(["notes2docx", "--api-key="]).unwrap();
        assert!(cli.input.is_none());
        assert!(config_for(&cli).is_ok());
    }

    #[test]
    fn input_without_api_key_is_rejected() {
        let cli = Cli::try_parse_from(["notes2docx", "--api-key=", "notes.pdf"]).unwrap();
        let err = config_for(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("API key"), "got: {err:#}");
    }

    #[tokio::test]
    async fn missing_input_ends_at_the_prompt() {
        let cli = Cli::try_parse_from(["notes2docx", "--api-key="]).unwrap();
        let mut processor = Processor::from_config(&config_for(&cli).unwrap()).unwrap();
        let outcome = processor.process(None).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::NoFileSelected);
    }
}
