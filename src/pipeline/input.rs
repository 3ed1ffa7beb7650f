//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! The rasterizer works on bytes, so both local files and downloads end up
//! as a [`PdfInput`]. Signature validation (`%PDF`) happens in
//! [`crate::pipeline::render`], where a bad signature is a rasterization
//! error like any other unparsable document.

use crate::error::ProcessError;
use std::path::Path;
use tracing::{debug, info};

/// A selected PDF: a display name and its raw bytes.
#[derive(Debug, Clone)]
pub struct PdfInput {
    /// File name shown in messages (last path or URL segment).
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PdfInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to PDF bytes.
///
/// URLs are downloaded with the given timeout; anything else is read from
/// the local file system.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<PdfInput, ProcessError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Read a local file, mapping I/O failures to input errors.
async fn read_local(path: &Path) -> Result<PdfInput, ProcessError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ProcessError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ProcessError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(PdfInput::new(file_name(path), bytes))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<PdfInput, ProcessError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProcessError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ProcessError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ProcessError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ProcessError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProcessError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(PdfInput::new(url_file_name(url), bytes.to_vec()))
}

/// Extract a reasonable file name from the URL path.
fn url_file_name(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
