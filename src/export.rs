//! Document export: one section per page, as Word (`.docx`) or Markdown.
//!
//! A `.docx` file is an Office Open XML package: a zip archive holding a few
//! XML parts. Only the parts Word needs are written — content types, the
//! package relationships, the document body and a style sheet defining the
//! heading and list styles the body refers to.
//!
//! Every section starts with a "Page N" Heading 2 paragraph followed by the
//! page's text, and closes with a grey bottom rule and 400 twips of spacing.
//! Runs are Calibri at 12 pt. Nothing is validated: an empty result list
//! gives a valid document with no sections, and error results are exported
//! with their literal `"Error: …"` text.

use crate::error::ExportError;
use crate::session::TranscriptionResult;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Font applied to every run.
pub const FONT: &str = "Calibri";
/// Run size in half-points (24 = 12 pt).
pub const FONT_SIZE_HALF_POINTS: u32 = 24;
/// Space after each section, in twips.
pub const SECTION_SPACING_AFTER: u32 = 400;
/// Colour of the rule closing each section.
pub const SEPARATOR_COLOR: &str = "AAAAAA";

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Docx,
    Markdown,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Markdown => "md",
        }
    }

    /// Render the results in this format.
    pub fn render(self, results: &[TranscriptionResult]) -> Result<Vec<u8>, ExportError> {
        match self {
            ExportFormat::Docx => export_docx(results),
            ExportFormat::Markdown => Ok(export_markdown(results).into_bytes()),
        }
    }
}

/// `converted-notes-<YYYY-MM-DD>.<ext>`.
pub fn default_filename(format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "converted-notes-{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Today's date in UTC, for [`default_filename`].
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Write `bytes` to `path` atomically (temp file in the same directory, then rename).
pub fn write_document(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let write_err = |source: std::io::Error| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

// ── Markdown ─────────────────────────────────────────────────────────────

/// Assemble `## Page N` sections separated by horizontal rules.
pub fn export_markdown(results: &[TranscriptionResult]) -> String {
    results
        .iter()
        .map(|r| format!("## Page {}\n\n{}\n", r.page_num, r.text.trim_end()))
        .collect::<Vec<_>>()
        .join("\n---\n\n")
}

// ── DOCX ─────────────────────────────────────────────────────────────────

/// Build a `.docx` package with one section per result.
pub fn export_docx(results: &[TranscriptionResult]) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, String); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", PACKAGE_RELS_XML.to_string()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.to_string()),
        ("word/styles.xml", styles_xml()),
        ("word/document.xml", document_xml(results)),
    ];

    for (name, body) in &parts {
        zip.start_file(*name, options)?;
        zip.write_all(body.as_bytes())?;
    }

    let bytes = zip.finish()?.into_inner();
    debug!("Built docx: {} sections, {} bytes", results.len(), bytes.len());
    Ok(bytes)
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

fn styles_xml() -> String {
    let heading = |level: u32| {
        format!(
            r#"<w:style w:type="paragraph" w:styleId="Heading{level}"><w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="{outline}"/></w:pPr><w:rPr><w:b/></w:rPr></w:style>"#,
            outline = level - 1
        )
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{W_NS}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="{FONT}" w:hAnsi="{FONT}" w:cs="{FONT}" w:eastAsia="{FONT}"/><w:sz w:val="{FONT_SIZE_HALF_POINTS}"/><w:szCs w:val="{FONT_SIZE_HALF_POINTS}"/></w:rPr></w:rPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>{}{}{}<w:style w:type="paragraph" w:styleId="ListParagraph"><w:name w:val="List Paragraph"/><w:basedOn w:val="Normal"/><w:pPr><w:ind w:left="720"/></w:pPr></w:style></w:styles>"#,
        heading(1),
        heading(2),
        heading(3),
    )
}

/// Paragraph kinds produced from one line of transcribed text.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Heading { level: u8, text: String },
    ListItem { text: String },
    Body { text: String },
}

impl Block {
    fn style(&self) -> Option<String> {
        match self {
            Block::Heading { level, .. } => Some(format!("Heading{level}")),
            Block::ListItem { .. } => Some("ListParagraph".to_string()),
            Block::Body { .. } => None,
        }
    }

    fn text(&self) -> &str {
        match self {
            Block::Heading { text, .. } | Block::ListItem { text } | Block::Body { text } => text,
        }
    }
}

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*?)(?:\s+#+)?\s*$").unwrap());
static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-*+]\s+(.*)$").unwrap());
static RE_ORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+[.)])\s+(.*)$").unwrap());

/// Split a page's text into paragraphs, skipping blank lines.
fn classify_lines(text: &str) -> Vec<Block> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            if let Some(caps) = RE_HEADING.captures(line) {
                // Deeper markdown headings all render as Heading 3.
                let level = caps[1].len().min(3) as u8;
                Block::Heading {
                    level,
                    text: caps[2].to_string(),
                }
            } else if let Some(caps) = RE_BULLET.captures(line) {
                Block::ListItem {
                    text: format!("\u{2022} {}", &caps[1]),
                }
            } else if let Some(caps) = RE_ORDERED.captures(line) {
                Block::ListItem {
                    text: format!("{} {}", &caps[1], &caps[2]),
                }
            } else {
                Block::Body {
                    text: line.trim_end().to_string(),
                }
            }
        })
        .collect()
}

fn document_xml(results: &[TranscriptionResult]) -> String {
    let mut body = String::new();

    for result in results {
        let mut blocks = vec![Block::Heading {
            level: 2,
            text: format!("Page {}", result.page_num),
        }];
        blocks.extend(classify_lines(&result.text));

        let last = blocks.len() - 1;
        for (i, block) in blocks.iter().enumerate() {
            push_paragraph(&mut body, block, i == last);
        }
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}"><w:body>{body}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr></w:body></w:document>"#
    )
}

fn push_paragraph(out: &mut String, block: &Block, closes_section: bool) {
    out.push_str("<w:p><w:pPr>");
    if let Some(style) = block.style() {
        out.push_str(&format!(r#"<w:pStyle w:val="{style}"/>"#));
    }
    if closes_section {
        out.push_str(&format!(
            r#"<w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1" w:color="{SEPARATOR_COLOR}"/></w:pBdr><w:spacing w:after="{SECTION_SPACING_AFTER}"/>"#
        ));
    }
    out.push_str("</w:pPr>");

    for (text, bold) in inline_runs(block.text()) {
        push_run(out, text, bold);
    }
    out.push_str("</w:p>");
}

/// Split `**bold**` spans into runs. An unmatched `**` is kept literally.
fn inline_runs(text: &str) -> Vec<(&str, bool)> {
    let pieces: Vec<&str> = text.split("**").collect();
    if pieces.len() % 2 == 0 {
        return vec![(text, false)];
    }
    pieces
        .into_iter()
        .enumerate()
        .filter(|(_, s)| !s.is_empty())
        .map(|(i, s)| (s, i % 2 == 1))
        .collect()
}

fn push_run(out: &mut String, text: &str, bold: bool) {
    out.push_str(&format!(
        r#"<w:r><w:rPr>{}<w:rFonts w:ascii="{FONT}" w:hAnsi="{FONT}" w:cs="{FONT}"/><w:sz w:val="{FONT_SIZE_HALF_POINTS}"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
        if bold { "<w:b/>" } else { "" },
        escape_xml(text)
    ));
}

/// Escape XML special characters and drop characters XML 1.0 forbids.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn document_of(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .expect("document part")
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn default_filename_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            default_filename(ExportFormat::Docx, date),
            "converted-notes-2024-03-07.docx"
        );
        assert_eq!(
            default_filename(ExportFormat::Markdown, date),
            "converted-notes-2024-03-07.md"
        );
    }

    #[test]
    fn package_has_required_parts() {
        let bytes = export_docx(&[TranscriptionResult::success(1, "hi", 0)]).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/_rels/document.xml.rels",
            "word/styles.xml",
            "word/document.xml",
        ] {
            assert!(names.contains(&part), "missing {part}: {names:?}");
        }
    }

    #[test]
    fn classify_maps_markdown_roles() {
        let blocks = classify_lines("# Q1\n\n## Answer\n#### deep\n- milk\n2) eggs\nplain");
        assert_eq!(
            blocks,
            vec![
                Block::Heading { level: 1, text: "Q1".into() },
                Block::Heading { level: 2, text: "Answer".into() },
                Block::Heading { level: 3, text: "deep".into() },
                Block::ListItem { text: "\u{2022} milk".into() },
                Block::ListItem { text: "2) eggs".into() },
                Block::Body { text: "plain".into() },
            ]
        );
    }

    #[test]
    fn heading_keeps_trailing_hash_in_words() {
        assert_eq!(
            classify_lines("# Intro to C#\n## Closed ##"),
            vec![
                Block::Heading { level: 1, text: "Intro to C#".into() },
                Block::Heading { level: 2, text: "Closed".into() },
            ]
        );
    }

    #[test]
    fn section_applies_fixed_style() {
        let xml = document_of(&export_docx(&[TranscriptionResult::success(1, "line", 0)]).unwrap());
        assert!(xml.contains(r#"<w:pStyle w:val="Heading2"/>"#));
        assert!(xml.contains(r#"w:ascii="Calibri""#));
        assert!(xml.contains(r#"<w:sz w:val="24"/>"#));
        assert!(xml.contains(r#"w:color="AAAAAA""#));
        assert!(xml.contains(r#"<w:spacing w:after="400"/>"#));
        // Only the closing paragraph carries the rule.
        assert_eq!(xml.matches("<w:pBdr>").count(), 1);
    }

    #[test]
    fn text_is_escaped() {
        let xml = document_of(
            &export_docx(&[TranscriptionResult::success(1, "a < b & \"c\"\u{7}", 0)]).unwrap(),
        );
        assert!(xml.contains("a &lt; b &amp; &quot;c&quot;"), "got: {xml}");
        assert!(!xml.contains('\u{7}'));
    }

    #[test]
    fn bold_spans_become_bold_runs() {
        assert_eq!(
            inline_runs("a **b** c"),
            vec![("a ", false), ("b", true), (" c", false)]
        );
        assert_eq!(inline_runs("2 ** 3"), vec![("2 ** 3", false)]);
    }

    #[test]
    fn markdown_sections_are_separated_by_rules() {
        let md = export_markdown(&[
            TranscriptionResult::success(1, "alpha\n", 0),
            TranscriptionResult::failure(2, "HTTP 500", 0),
        ]);
        assert_eq!(md, "## Page 1\n\nalpha\n\n---\n\n## Page 2\n\nError: HTTP 500\n");
        assert_eq!(export_markdown(&[]), "");
    }

    #[test]
    fn write_document_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("notes.docx");
        write_document(&path, b"first").unwrap();
        write_document(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }
}
