//! Thumbnail gallery and full-size page viewer.
//!
//! Purely presentational. [`Gallery`] derives one thumbnail per rasterized
//! page; [`Viewer`] remembers which page is currently shown full-size and
//! reacts to [`UiEvent`]s. Both only borrow the [`Session`].

use crate::error::GalleryError;
use crate::pipeline::encode;
use crate::session::{PageImage, Session};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A downscaled PNG of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub page_num: usize,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl Thumbnail {
    /// Accessible label of the activatable thumbnail.
    pub fn aria_label(&self) -> String {
        format!("View page {}", self.page_num)
    }

    pub fn alt_text(&self) -> String {
        format!("Page {} thumbnail", self.page_num)
    }

    /// File name used by [`Gallery::write_to_dir`].
    pub fn file_name(&self) -> String {
        format!("page-{:03}.png", self.page_num)
    }
}

/// One thumbnail per page, in page order.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    thumbnails: Vec<Thumbnail>,
}

impl Gallery {
    /// Build thumbnails whose longest edge is at most `max_px`.
    ///
    /// Pages already small enough are kept at their size, never upscaled.
    pub fn from_pages(pages: &[PageImage], max_px: u32) -> Result<Self, GalleryError> {
        let thumbnails = pages
            .iter()
            .map(|page| make_thumbnail(page, max_px))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { thumbnails })
    }

    pub fn thumbnails(&self) -> &[Thumbnail] {
        &self.thumbnails
    }

    pub fn len(&self) -> usize {
        self.thumbnails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thumbnails.is_empty()
    }

    /// Write every thumbnail as `page-NNN.png` into `dir`, creating it if needed.
    pub fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, GalleryError> {
        std::fs::create_dir_all(dir).map_err(|source| GalleryError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        self.thumbnails
            .iter()
            .map(|t| {
                let path = dir.join(t.file_name());
                std::fs::write(&path, &t.png).map_err(|source| GalleryError::Write {
                    path: path.clone(),
                    source,
                })?;
                Ok(path)
            })
            .collect()
    }
}

fn make_thumbnail(page: &PageImage, max_px: u32) -> Result<Thumbnail, GalleryError> {
    let decode_err = |detail: String| GalleryError::Decode {
        page: page.page_num,
        detail,
    };

    let png = encode::decode_png(page).map_err(|e| decode_err(e.to_string()))?;
    let img = image::load_from_memory_with_format(&png, image::ImageFormat::Png)
        .map_err(|e| decode_err(e.to_string()))?;

    let img = if img.width() > max_px || img.height() > max_px {
        img.thumbnail(max_px, max_px)
    } else {
        img
    };

    let png = encode::to_png(&img).map_err(|e| GalleryError::Encode {
        page: page.page_num,
        detail: e.to_string(),
    })?;
    debug!("Thumbnail page {} → {}x{}", page.page_num, img.width(), img.height());

    Ok(Thumbnail {
        page_num: page.page_num,
        width: img.width(),
        height: img.height(),
        png,
    })
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// How a thumbnail was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Pointer,
    Keyboard,
}

/// A key press while the viewer is focused. Confirming a thumbnail with
/// Enter or Space arrives as [`UiEvent::ThumbnailActivated`], not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other(char),
}

/// Input the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// A thumbnail was clicked, or focused and confirmed with the keyboard.
    ThumbnailActivated { page: usize, via: Activation },
    /// The viewer's close control was clicked.
    CloseClicked,
    /// A key was pressed anywhere in the application.
    KeyPressed(Key),
}

/// Full-size page viewer. The only state is the page currently displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    current: Option<usize>,
}

impl Viewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Page number currently displayed, if any.
    pub fn current_page(&self) -> Option<usize> {
        self.current
    }

    /// Apply an event and return the image to display afterwards.
    ///
    /// Activating a page the session does not hold is ignored.
    pub fn handle<'s>(&mut self, event: UiEvent, session: &'s Session) -> Option<&'s PageImage> {
        match event {
            UiEvent::ThumbnailActivated { page, .. } => {
                if session.page(page).is_some() {
                    self.current = Some(page);
                }
            }
            UiEvent::CloseClicked | UiEvent::KeyPressed(Key::Escape) => self.current = None,
            UiEvent::KeyPressed(_) => {}
        }
        self.displayed(session)
    }

    pub fn displayed<'s>(&self, session: &'s Session) -> Option<&'s PageImage> {
        self.current.and_then(|n| session.page(n))
    }
}
