//! Session state: the page images and transcription results of one run.
//!
//! A [`Session`] holds two parallel sequences indexed by page order. It is
//! owned by [`crate::process::Processor`], which is the only code holding a
//! `&mut Session`; the gallery and the exporter only ever borrow it.

use serde::{Deserialize, Serialize};

/// Prefix of every page image data URL.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// One rasterized PDF page, PNG-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Rendered width in pixels.
    pub width: u32,
    /// Rendered height in pixels.
    pub height: u32,
    /// `data:image/png;base64,<payload>`, ready for display.
    #[serde(skip)]
    pub data_url: String,
}

impl PageImage {
    /// Wrap an already base64-encoded PNG.
    pub fn from_base64(page_num: usize, width: u32, height: u32, b64: &str) -> Self {
        Self {
            page_num,
            width,
            height,
            data_url: format!("{PNG_DATA_URL_PREFIX}{b64}"),
        }
    }

    /// The bare base64 payload, without the data URL header.
    pub fn base64(&self) -> &str {
        self.data_url
            .split_once(',')
            .map(|(_, payload)| payload)
            .unwrap_or("")
    }
}

/// The transcription of one page, or the error text standing in for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Model output, or `"Error: <message>"` when the request failed.
    pub text: String,
    /// The failure message when the request failed.
    pub error: Option<String>,
    /// Wall-clock time spent on this page's request.
    pub duration_ms: u64,
}

impl TranscriptionResult {
    pub fn success(page_num: usize, text: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            page_num,
            text: text.into(),
            error: None,
            duration_ms,
        }
    }

    /// Build the stand-in result for a failed page.
    pub fn failure(page_num: usize, message: impl Into<String>, duration_ms: u64) -> Self {
        let message = message.into();
        Self {
            page_num,
            text: format!("Error: {message}"),
            error: Some(message),
            duration_ms,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Page images and transcriptions for the current run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pages: Vec<PageImage>,
    transcriptions: Vec<TranscriptionResult>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[PageImage] {
        &self.pages
    }

    pub fn transcriptions(&self) -> &[TranscriptionResult] {
        &self.transcriptions
    }

    /// Look up a page image by its 1-indexed page number.
    pub fn page(&self, page_num: usize) -> Option<&PageImage> {
        self.pages.iter().find(|p| p.page_num == page_num)
    }

    /// True once every page has a result (success or error).
    pub fn is_complete(&self) -> bool {
        self.transcriptions.len() == self.pages.len()
    }

    pub fn failed_count(&self) -> usize {
        self.transcriptions.iter().filter(|t| t.is_error()).count()
    }

    // ── Mutation (crate-private: only the orchestrator writes) ─────────────

    pub(crate) fn reset(&mut self) {
        self.pages.clear();
        self.transcriptions.clear();
    }

    pub(crate) fn set_pages(&mut self, pages: Vec<PageImage>) {
        self.pages = pages;
        self.transcriptions.clear();
        self.transcriptions.reserve(self.pages.len());
    }

    pub(crate) fn record(&mut self, result: TranscriptionResult) {
        debug_assert!(self.transcriptions.len() < self.pages.len());
        self.transcriptions.push(result);
    }
}
