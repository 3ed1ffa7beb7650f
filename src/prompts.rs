//! The fixed instruction sent with every page image.
//!
//! The prompt is deliberately not configurable: the exporter and the heading
//! mapping in [`crate::export`] rely on the H1/H2/H3 roles it asks for.

/// Instruction text sent as the first part of every `generateContent` request.
pub const TRANSCRIPTION_PROMPT: &str = "Extract text from this handwritten note. Convert to English. Format with proper headings (H1 for questions, H2 for answers, H3 for subheadings). Preserve lists, tables, and provide alt text for graphics.";

/// MIME type of every page image sent to the endpoint.
pub const IMAGE_MIME_TYPE: &str = "image/png";
