//! The processing orchestrator.
//!
//! [`Processor`] owns the [`Session`] and drives one run at a time:
//!
//! ```text
//! Idle ──▶ Rasterizing ──▶ TranscribingPage(1) ──▶ … ──▶ TranscribingPage(N) ──▶ Done
//!   ▲            │
//!   └────────────┘  batch-fatal error (alert, session left as last set)
//! ```
//!
//! A failed page never leaves the `TranscribingPage` chain: its result is
//! replaced by `"Error: <message>"` and the next page starts. Because
//! `process` takes `&mut self`, the borrow checker guarantees a single writer
//! of the session for the whole run.

use crate::config::ProcessingConfig;
use crate::error::ProcessError;
use crate::pipeline::input::{self, PdfInput};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::pipeline::transcribe::{GeminiClient, Transcriber};
use crate::progress::{Callback, NoopCallback, ProcessingCallback};
use crate::session::{PageImage, Session, TranscriptionResult};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shown through [`ProcessingCallback::on_prompt`] when no file was selected.
pub const NO_FILE_PROMPT: &str = "Please select a PDF file";

/// Where a run currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingState {
    Idle,
    Rasterizing,
    /// Transcribing `page` of `total` (1-indexed). With `concurrency > 1`
    /// this names the first page of the batch in flight.
    TranscribingPage { page: usize, total: usize },
    Done,
}

/// Counts and timings of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_pages: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub render_duration_ms: u64,
    pub transcribe_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// How a call to [`Processor::process`] ended, short of a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// No input was given; nothing happened.
    NoFileSelected,
    /// Every page has a result (some may be errors).
    Completed(BatchSummary),
}

/// Drives rasterization and per-page transcription, owning the session.
pub struct Processor {
    session: Session,
    state: ProcessingState,
    rasterizer: Arc<dyn Rasterizer>,
    transcriber: Arc<dyn Transcriber>,
    callback: Callback,
    concurrency: usize,
    download_timeout_secs: u64,
}

impl Processor {
    /// Build a processor from explicit stages.
    pub fn new(rasterizer: Arc<dyn Rasterizer>, transcriber: Arc<dyn Transcriber>) -> Self {
        let defaults = ProcessingConfig::default();
        Self {
            session: Session::new(),
            state: ProcessingState::Idle,
            rasterizer,
            transcriber,
            callback: Arc::new(NoopCallback),
            concurrency: defaults.concurrency,
            download_timeout_secs: defaults.download_timeout_secs,
        }
    }

    /// Build a processor with the pdfium rasterizer and the Gemini client.
    pub fn from_config(config: &ProcessingConfig) -> Result<Self, ProcessError> {
        let rasterizer = Arc::new(PdfiumRasterizer::from_config(config));
        let transcriber = Arc::new(GeminiClient::new(config)?);

        let mut processor = Self::new(rasterizer, transcriber).with_concurrency(config.concurrency);
        processor.download_timeout_secs = config.download_timeout_secs;
        Ok(processor)
    }

    pub fn with_callback(mut self, callback: Callback) -> Self {
        self.callback = callback;
        self
    }

    /// Allow up to `n` requests in flight. Results are still stored in page order.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> &ProcessingState {
        &self.state
    }

    /// Resolve a path or URL, then [`process`](Self::process) it.
    ///
    /// An unreadable input is batch-fatal like any other.
    pub async fn process_path(&mut self, input: &str) -> Result<ProcessOutcome, ProcessError> {
        match input::resolve_input(input, self.download_timeout_secs).await {
            Ok(pdf) => self.process(Some(pdf)).await,
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Run the whole pipeline on one PDF.
    ///
    /// `None` is a no-op: the user is prompted and the session is untouched.
    /// On success every page has a result, so
    /// `session().transcriptions().len() == session().pages().len()`.
    ///
    /// # Errors
    /// Returns `Err(ProcessError)` only for batch-fatal failures. The state
    /// goes back to [`ProcessingState::Idle`] and the session keeps whatever
    /// it held at that point.
    pub async fn process(&mut self, input: Option<PdfInput>) -> Result<ProcessOutcome, ProcessError> {
        let Some(input) = input else {
            self.callback.on_prompt(NO_FILE_PROMPT);
            return Ok(ProcessOutcome::NoFileSelected);
        };

        let total_start = Instant::now();
        info!("Starting processing: {} ({} bytes)", input.name, input.bytes.len());

        // ── Step 1: Rasterize ────────────────────────────────────────────
        self.session.reset();
        self.set_state(ProcessingState::Rasterizing);

        let render_start = Instant::now();
        let pages = match self.rasterizer.rasterize(&input.bytes).await {
            Ok(pages) => pages,
            Err(source) => {
                let err = ProcessError::Rasterization {
                    name: input.name,
                    source,
                };
                self.fail(&err);
                return Err(err);
            }
        };
        let render_duration_ms = render_start.elapsed().as_millis() as u64;
        info!("Rasterized {} pages in {}ms", pages.len(), render_duration_ms);

        self.session.set_pages(pages);
        self.callback.on_pages_rasterized(self.session.pages());

        // ── Step 2: Transcribe page by page ──────────────────────────────
        let transcribe_start = Instant::now();
        if self.concurrency > 1 {
            self.transcribe_concurrent().await;
        } else {
            self.transcribe_sequential().await;
        }
        let transcribe_duration_ms = transcribe_start.elapsed().as_millis() as u64;

        // ── Step 3: Done ─────────────────────────────────────────────────
        self.set_state(ProcessingState::Done);

        let total_pages = self.session.pages().len();
        let failed = self.session.failed_count();
        let summary = BatchSummary {
            total_pages,
            succeeded: total_pages - failed,
            failed,
            render_duration_ms,
            transcribe_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Processing complete: {}/{} pages, {}ms total",
            summary.succeeded, total_pages, summary.total_duration_ms
        );
        self.callback.on_batch_complete(total_pages, summary.succeeded);

        Ok(ProcessOutcome::Completed(summary))
    }

    // ── Internal helpers ─────────────────────────────────────────────────

    /// One request at a time; page i+1 waits for page i.
    async fn transcribe_sequential(&mut self) {
        let total = self.session.pages().len();

        for idx in 0..total {
            let page_num = self.session.pages()[idx].page_num;
            self.set_state(ProcessingState::TranscribingPage {
                page: page_num,
                total,
            });
            self.callback.on_page_start(page_num, total);

            let result = transcribe_one(&*self.transcriber, &self.session.pages()[idx]).await;
            report(&*self.callback, &result, total);
            self.session.record(result);
        }
    }

    /// Up to `concurrency` requests in flight, reassembled by page number.
    async fn transcribe_concurrent(&mut self) {
        let total = self.session.pages().len();
        if let Some(first) = self.session.pages().first() {
            let page = first.page_num;
            self.set_state(ProcessingState::TranscribingPage { page, total });
        }

        let transcriber = Arc::clone(&self.transcriber);
        let callback = Arc::clone(&self.callback);

        let mut results: Vec<TranscriptionResult> =
            stream::iter(self.session.pages().iter().map(|page| {
                let transcriber = Arc::clone(&transcriber);
                let callback = Arc::clone(&callback);
                async move {
                    callback.on_page_start(page.page_num, total);
                    let result = transcribe_one(&*transcriber, page).await;
                    report(&*callback, &result, total);
                    result
                }
            }))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        results.sort_by_key(|r| r.page_num);
        for result in results {
            self.session.record(result);
        }
    }

    fn set_state(&mut self, state: ProcessingState) {
        debug!("State → {:?}", state);
        self.state = state;
        self.callback.on_state_change(&self.state);
    }

    fn fail(&mut self, err: &ProcessError) {
        warn!("Processing failed: {}", err);
        self.set_state(ProcessingState::Idle);
        self.callback.on_batch_failed(&err.to_string());
    }
}

/// Transcribe one page, turning any failure into its stand-in result.
async fn transcribe_one(transcriber: &dyn Transcriber, page: &PageImage) -> TranscriptionResult {
    let start = Instant::now();
    let outcome = transcriber.transcribe(page.base64()).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(text) => {
            debug!("Page {}: {} chars in {}ms", page.page_num, text.len(), duration_ms);
            TranscriptionResult::success(page.page_num, text, duration_ms)
        }
        Err(e) => {
            warn!("Page {}: transcription failed: {}", page.page_num, e);
            TranscriptionResult::failure(page.page_num, e.to_string(), duration_ms)
        }
    }
}

fn report(callback: &dyn ProcessingCallback, result: &TranscriptionResult, total: usize) {
    match &result.error {
        None => callback.on_page_complete(result.page_num, total, &result.text),
        Some(e) => callback.on_page_error(result.page_num, total, e),
    }
}
