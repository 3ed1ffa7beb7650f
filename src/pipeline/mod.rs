//! Processing pipeline stages.
//!
//! Each submodule implements exactly one step so it can be tested and
//! swapped on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ transcribe
//! (path/URL) (pdfium)  (base64)   (vision model)
//! ```
//!
//! 1. [`input`]      — read the user-supplied path or download the URL
//! 2. [`render`]     — rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]     — PNG-encode and base64-wrap each rendered page
//! 4. [`transcribe`] — one `generateContent` request per page; the only stage
//!    talking to the model

pub mod encode;
pub mod input;
pub mod render;
pub mod transcribe;
