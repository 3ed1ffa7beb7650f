//! # notes2docx
//!
//! Transcribe scanned handwritten notes (PDF) with a vision model and export
//! the result as a Word document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       resolve local file or download from URL
//!  ├─ 2. Rasterize   render every page via pdfium at 2× (spawn_blocking)
//!  ├─ 3. Encode      PNG → base64 data URL, kept in the Session
//!  ├─ 4. Transcribe  one generateContent request per page, in page order
//!  └─ 5. Export      one "Page N" section per result → .docx / .md
//! ```
//!
//! A failed page never stops the run: its result becomes `"Error: <message>"`
//! and the next page is sent. Only input and rasterization failures abort.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notes2docx::{export, ProcessOutcome, ProcessingConfig, Processor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProcessingConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!
//!     let mut processor = Processor::from_config(&config)?;
//!     if let ProcessOutcome::Completed(summary) = processor.process_path("notes.pdf").await? {
//!         eprintln!("{}/{} pages", summary.succeeded, summary.total_pages);
//!     }
//!
//!     let docx = export::export_docx(processor.session().transcriptions())?;
//!     let name = export::default_filename(export::ExportFormat::Docx, export::today());
//!     export::write_document(std::path::Path::new(&name), &docx)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `notes2docx` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! notes2docx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod gallery;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ProcessingConfig, ProcessingConfigBuilder};
pub use error::{
    ExportError, GalleryError, ParseError, ProcessError, RasterizationError, TranscriptionError,
};
pub use export::{default_filename, export_docx, export_markdown, write_document, ExportFormat};
pub use gallery::{Activation, Gallery, Key, Thumbnail, UiEvent, Viewer};
pub use pipeline::input::PdfInput;
pub use pipeline::render::{PdfiumRasterizer, Rasterizer};
pub use pipeline::transcribe::{GeminiClient, Transcriber};
pub use process::{BatchSummary, ProcessOutcome, ProcessingState, Processor};
pub use progress::{Callback, NoopCallback, ProcessingCallback};
pub use session::{PageImage, Session, TranscriptionResult};
