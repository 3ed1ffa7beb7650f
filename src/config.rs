//! Configuration for a processing run.
//!
//! Every knob lives in [`ProcessingConfig`], built via
//! [`ProcessingConfigBuilder`]. The defaults reproduce the plain behaviour:
//! 2× rendering, one request at a time, no request timeout, the public
//! Gemini `generateContent` endpoint.

use crate::error::ProcessError;
use std::fmt;
use std::path::PathBuf;

/// Default multimodal completion endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent";

/// Default upscale factor applied to the page size in PDF points.
pub const DEFAULT_SCALE: f32 = 2.0;

/// Configuration for rasterizing and transcribing one PDF.
///
/// # Example
/// ```rust
/// use notes2docx::ProcessingConfig;
///
/// let config = ProcessingConfig::builder()
///     .api_key("AIza-test")
///     .concurrency(1)
///     .build()
///     .unwrap();
/// assert_eq!(config.scale, 2.0);
/// ```
#[derive(Clone)]
pub struct ProcessingConfig {
    /// API key, sent as the `key` query parameter.
    pub api_key: String,

    /// Full URL of the `generateContent` method.
    pub endpoint: String,

    /// Rendering scale relative to the page size in points. Default: 2.0.
    ///
    /// Handwriting needs the extra pixels; at 1× a pen stroke is often a
    /// single pixel wide and models misread it.
    pub scale: f32,

    /// Number of transcription requests in flight. Default: 1.
    ///
    /// At 1 page i+1 is only sent after page i's attempt finished. Higher
    /// values trade ordering of the requests (never of the results) for
    /// wall-clock time.
    pub concurrency: usize,

    /// Per-request timeout in seconds. Default: none.
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Path to a pdfium shared library, or to the directory holding it.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Longest edge of a gallery thumbnail in pixels. Default: 200.
    pub thumbnail_max_px: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            scale: DEFAULT_SCALE,
            concurrency: 1,
            api_timeout_secs: None,
            download_timeout_secs: 120,
            password: None,
            pdfium_lib_path: None,
            thumbnail_max_px: 200,
        }
    }
}

impl fmt::Debug for ProcessingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingConfig")
            .field("api_key", &redact(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("scale", &self.scale)
            .field("concurrency", &self.concurrency)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("thumbnail_max_px", &self.thumbnail_max_px)
            .finish()
    }
}

fn redact(key: &str) -> String {
    if key.is_empty() {
        "<unset>".to_string()
    } else {
        let prefix: String = key.chars().take(4).collect();
        format!("{prefix}…")
    }
}

impl ProcessingConfig {
    /// Create a new builder for `ProcessingConfig`.
    pub fn builder() -> ProcessingConfigBuilder {
        ProcessingConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ProcessingConfig`].
#[derive(Debug)]
pub struct ProcessingConfigBuilder {
    config: ProcessingConfig,
}

impl ProcessingConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = if scale.is_finite() {
            scale.clamp(0.5, 4.0)
        } else {
            scale
        };
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn thumbnail_max_px(mut self, px: u32) -> Self {
        self.config.thumbnail_max_px = px.max(16);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ProcessingConfig, ProcessError> {
        let c = &self.config;
        if c.api_key.trim().is_empty() {
            return Err(ProcessError::InvalidConfig(
                "an API key is required (set GEMINI_API_KEY or pass --api-key)".into(),
            ));
        }
        if !c.scale.is_finite() {
            return Err(ProcessError::InvalidConfig(format!(
                "scale must be a finite number, got {}",
                c.scale
            )));
        }
        if !(c.endpoint.starts_with("http://") || c.endpoint.starts_with("https://")) {
            return Err(ProcessError::InvalidConfig(format!(
                "endpoint must be an HTTP(S) URL, got '{}'",
                c.endpoint
            )));
        }
        Ok(self.config)
    }
}
