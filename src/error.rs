//! Error types for the notes2docx library.
//!
//! Two tiers of failure exist, and the types mirror them:
//!
//! * [`ProcessError`] — **Batch-fatal**: the run cannot proceed at all (input
//!   missing, not a PDF, pdfium unavailable). Returned as `Err(ProcessError)`
//!   from [`crate::process::Processor::process`].
//!
//! * [`TranscriptionError`] — **Page-local**: one page's request failed. The
//!   orchestrator turns it into an `"Error: <message>"` result for that page
//!   and moves on to the next one.
//!
//! [`RasterizationError`] and [`ExportError`] belong to their own stages;
//! a rasterization failure is always batch-fatal.

use std::path::PathBuf;
use thiserror::Error;

/// All batch-fatal errors returned by a processing run.
#[derive(Debug, Error)]
pub enum ProcessError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The document could not be turned into page images.
    #[error("Could not rasterize '{name}': {source}")]
    Rasterization {
        name: String,
        #[source]
        source: RasterizationError,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (e.g. a blocking task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure to turn PDF bytes into page images.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RasterizationError {
    /// No `%PDF` signature in the first kilobyte.
    #[error("not a PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// The document is encrypted and no password was given.
    #[error("the PDF is encrypted and requires a password (use --password)")]
    PasswordRequired,

    /// A password was given but pdfium rejected it.
    #[error("wrong password for encrypted PDF")]
    WrongPassword,

    /// pdfium could not parse the document structure.
    #[error("the PDF is corrupt: {detail}")]
    Corrupt { detail: String },

    /// A single page could not be loaded or rendered.
    #[error("page {page} failed to render: {detail}")]
    PageFailed { page: usize, detail: String },

    /// The rendered bitmap could not be PNG-encoded.
    #[error("page {page} failed to encode as PNG: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The blocking render task panicked or was cancelled.
    #[error("rendering task aborted: {detail}")]
    Aborted { detail: String },

    /// The pdfium shared library could not be loaded.
    #[error(
        "failed to bind to pdfium library: {detail}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory) or install pdfium system-wide."
    )]
    Binding { detail: String },
}

/// A page-local failure of one transcription request.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// The endpoint answered with a non-success status.
    ///
    /// `body` is the endpoint's raw error body, passed through untouched.
    #[error("{body}")]
    Api { status: u16, body: String },

    /// The request could not be sent or the response body could not be read.
    #[error("request failed: {detail}")]
    Network { detail: String },

    /// The opt-in per-request timeout elapsed.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The response envelope did not have the expected shape.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// The response body could not be read as a `generateContent` envelope.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    /// `candidates[0].content.parts[0].text` is absent.
    #[error("response has no candidates[0].content.parts[0].text field")]
    MissingText,
}

/// Failure while building or saving gallery thumbnails.
#[derive(Debug, Error)]
pub enum GalleryError {
    /// A page image payload could not be decoded.
    #[error("page {page}: cannot decode image: {detail}")]
    Decode { page: usize, detail: String },

    #[error("page {page}: cannot encode thumbnail: {detail}")]
    Encode { page: usize, detail: String },

    #[error("failed to write thumbnail '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while assembling or writing the exported document.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to build document package: {0}")]
    Package(#[from] zip::result::ZipError),

    /// Could not create or write the output file.
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for ExportError {
    fn from(source: std::io::Error) -> Self {
        ExportError::Package(zip::result::ZipError::Io(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_raw_body() {
        let e = TranscriptionError::Api {
            status: 400,
            body: r#"{"error":{"message":"API key not valid"}}"#.into(),
        };
        assert_eq!(e.to_string(), r#"{"error":{"message":"API key not valid"}}"#);
    }

    #[test]
    fn parse_error_is_transparent() {
        let e = TranscriptionError::from(ParseError::MissingText);
        assert!(e.to_string().contains("parts[0].text"), "got: {e}");
    }

    #[test]
    fn rasterization_error_names_the_input() {
        let e = ProcessError::Rasterization {
            name: "notes.pdf".into(),
            source: RasterizationError::NotAPdf {
                magic: b"GIF8".to_vec(),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.pdf"), "got: {msg}");
        assert!(msg.contains("not a PDF"), "got: {msg}");
    }

    #[test]
    fn binding_error_hints_at_env_var() {
        let e = RasterizationError::Binding {
            detail: "dlopen failed".into(),
        };
        assert!(e.to_string().contains("PDFIUM_LIB_PATH"));
    }
}
