//! PDF rasterisation: render every page to a PNG [`PageImage`] via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks for the whole render. The work runs on tokio's blocking
//! pool so the runtime's worker threads stay free.
//!
//! ## Why scale instead of DPI?
//!
//! Page sizes come in PDF points. Multiplying them by a fixed factor (2× by
//! default) gives every page the same relative sharpness whatever its
//! physical size, which is what a handwriting model cares about.

use crate::config::ProcessingConfig;
use crate::error::RasterizationError;
use crate::pipeline::encode;
use crate::session::PageImage;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Turns PDF bytes into page images, in ascending page order.
///
/// Either every page is returned or the call fails; there is no partial
/// result.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<PageImage>, RasterizationError>;
}

/// The pdfium-backed [`Rasterizer`].
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    scale: f32,
    password: Option<String>,
    lib_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            password: None,
            lib_path: None,
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self {
            scale: config.scale,
            password: config.password.clone(),
            lib_path: config.pdfium_lib_path.clone(),
        }
    }
}

#[async_trait]
impl Rasterizer for PdfiumRasterizer {
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<PageImage>, RasterizationError> {
        check_signature(pdf)?;

        let bytes = pdf.to_vec();
        let this = self.clone();

        tokio::task::spawn_blocking(move || this.rasterize_blocking(&bytes))
            .await
            .map_err(|e| RasterizationError::Aborted {
                detail: e.to_string(),
            })?
    }
}

impl PdfiumRasterizer {
    fn rasterize_blocking(&self, pdf: &[u8]) -> Result<Vec<PageImage>, RasterizationError> {
        let pdfium = bind_pdfium(self.lib_path.as_deref())?;
        let password = self.password.as_deref();

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        RasterizationError::WrongPassword
                    } else {
                        RasterizationError::PasswordRequired
                    }
                } else {
                    RasterizationError::Corrupt { detail: err_str }
                }
            })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let mut results = Vec::with_capacity(total_pages);

        for idx in 0..total_pages {
            let page_num = idx + 1;
            let page = pages
                .get(idx as u16)
                .map_err(|e| RasterizationError::PageFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                })?;

            let (width, height) = target_size(page.width().value, page.height().value, self.scale);
            let render_config = PdfRenderConfig::new()
                .set_target_width(width)
                .set_target_height(height);

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                RasterizationError::PageFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                page_num,
                image.width(),
                image.height()
            );

            let encoded = encode::encode_page(page_num, &image).map_err(|e| {
                RasterizationError::EncodeFailed {
                    page: page_num,
                    detail: e.to_string(),
                }
            })?;
            results.push(encoded);
        }

        Ok(results)
    }
}

/// Readers accept the `%PDF` signature anywhere in the first kilobyte.
const SIGNATURE_WINDOW: usize = 1024;

/// Reject anything without a `%PDF` signature near the start.
pub fn check_signature(bytes: &[u8]) -> Result<(), RasterizationError> {
    let head = &bytes[..bytes.len().min(SIGNATURE_WINDOW)];
    if head.windows(4).any(|w| w == b"%PDF") {
        Ok(())
    } else {
        Err(RasterizationError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}

/// Pixel size of a page of `width_pt` × `height_pt` points at `scale`.
pub fn target_size(width_pt: f32, height_pt: f32, scale: f32) -> (i32, i32) {
    let px = |v: f32| (v * scale).round().max(1.0) as i32;
    (px(width_pt), px(height_pt))
}

/// Bind to the pdfium shared library.
///
/// Lookup order: the configured path (a library file or the directory
/// holding it), then the current directory, then the system library.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, RasterizationError> {
    let bindings = match lib_path {
        Some(p) if p.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))
        }
        Some(p) => Pdfium::bind_to_library(p),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| RasterizationError::Binding {
        detail: format!("{:?}", e),
    })?;

    Ok(Pdfium::new(bindings))
}
