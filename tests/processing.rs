//! Integration tests for the processing run and the export that follows it.
//!
//! The rasterizer and transcriber are replaced by in-process fakes so these
//! tests need neither pdfium nor network access.
//!
//! Run with:
//!   cargo test --test processing

use async_trait::async_trait;
use notes2docx::{
    export_docx, export_markdown, Activation, Key, PageImage, PdfInput, ProcessError,
    ProcessOutcome, ProcessingCallback, ProcessingState, Processor, RasterizationError,
    Rasterizer, Transcriber, TranscriptionError, UiEvent, Viewer,
};
use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Reads the page count from a `%PDF-<n>` body and returns `n` tiny pages
/// whose payload is `page<k>`.
struct CountingRasterizer;

#[async_trait]
impl Rasterizer for CountingRasterizer {
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<PageImage>, RasterizationError> {
        let count: usize = std::str::from_utf8(pdf)
            .ok()
            .and_then(|s| s.strip_prefix("%PDF-"))
            .and_then(|n| n.trim().parse().ok())
            .ok_or_else(|| RasterizationError::NotAPdf {
                magic: pdf.iter().take(4).copied().collect(),
            })?;

        Ok((1..=count)
            .map(|n| PageImage::from_base64(n, 8, 8, &format!("page{n}")))
            .collect())
    }
}

/// Answers `text <n>` for every page except the ones listed in `fail_on`,
/// which get an HTTP 500 with body `boom <n>`. Calls are logged in order.
struct ScriptedTranscriber {
    fail_on: Vec<usize>,
    delay_ms: fn(usize) -> u64,
    calls: Mutex<Vec<usize>>,
}

impl ScriptedTranscriber {
    fn new(fail_on: &[usize]) -> Arc<Self> {
        Arc::new(Self {
            fail_on: fail_on.to_vec(),
            delay_ms: |_| 0,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, image_base64: &str) -> Result<String, TranscriptionError> {
        let page: usize = image_base64
            .strip_prefix("page")
            .and_then(|n| n.parse().ok())
            .expect("fake payload");
        self.calls.lock().unwrap().push(page);

        let delay = (self.delay_ms)(page);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_on.contains(&page) {
            Err(TranscriptionError::Api {
                status: 500,
                body: format!("boom {page}"),
            })
        } else {
            Ok(format!("text {page}"))
        }
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, e: String) {
        self.events.lock().unwrap().push(e);
    }
}

impl ProcessingCallback for Recorder {
    fn on_pages_rasterized(&self, pages: &[PageImage]) {
        self.push(format!("rasterized {}", pages.len()));
    }
    fn on_page_complete(&self, page_num: usize, _total: usize, _text: &str) {
        self.push(format!("ok {page_num}"));
    }
    fn on_page_error(&self, page_num: usize, _total: usize, error: &str) {
        self.push(format!("err {page_num}: {error}"));
    }
    fn on_batch_complete(&self, total_pages: usize, success_count: usize) {
        self.push(format!("done {success_count}/{total_pages}"));
    }
    fn on_batch_failed(&self, error: &str) {
        self.push(format!("failed: {error}"));
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn pdf(pages: usize) -> Option<PdfInput> {
    Some(PdfInput::new("notes.pdf", format!("%PDF-{pages}").into_bytes()))
}

fn texts(p: &Processor) -> Vec<String> {
    p.session()
        .transcriptions()
        .iter()
        .map(|r| r.text.clone())
        .collect()
}

fn document_xml(docx: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).expect("valid zip");
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .expect("document part")
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

// ── Orchestrator ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_middle_page_becomes_error_section() {
    init_tracing();
    let transcriber = ScriptedTranscriber::new(&[2]);
    let recorder = Arc::new(Recorder::default());
    let mut p = Processor::new(Arc::new(CountingRasterizer), transcriber.clone())
        .with_callback(recorder.clone());

    let outcome = p.process(pdf(3)).await.unwrap();

    let ProcessOutcome::Completed(summary) = outcome else {
        panic!("expected a completed run");
    };
    assert_eq!((summary.total_pages, summary.succeeded, summary.failed), (3, 2, 1));
    assert_eq!(texts(&p), vec!["text 1", "Error: boom 2", "text 3"]);
    assert_eq!(p.state(), &ProcessingState::Done);
    assert!(p.session().is_complete());
    assert_eq!(
        recorder.events(),
        vec![
            "rasterized 3",
            "ok 1",
            "err 2: boom 2",
            "ok 3",
            "done 2/3",
        ]
    );

    let xml = document_xml(&export_docx(p.session().transcriptions()).unwrap());
    assert_eq!(xml.matches(">Page ").count(), 3);
    let page2 = xml.find(">Page 2<").unwrap();
    let page3 = xml.find(">Page 3<").unwrap();
    assert!(xml[page2..page3].contains("Error: boom 2"));
}

#[tokio::test]
async fn every_page_gets_a_result_even_when_all_fail() {
    let mut p = Processor::new(
        Arc::new(CountingRasterizer),
        ScriptedTranscriber::new(&[1, 2, 3, 4]),
    );

    p.process(pdf(4)).await.unwrap();

    let session = p.session();
    assert_eq!(session.transcriptions().len(), session.pages().len());
    assert_eq!(session.failed_count(), 4);
    assert!(session.transcriptions().iter().all(|r| r.text.starts_with("Error: ")));
}

#[tokio::test]
async fn failure_on_page_k_still_attempts_later_pages() {
    let transcriber = ScriptedTranscriber::new(&[1]);
    let mut p = Processor::new(Arc::new(CountingRasterizer), transcriber.clone());

    p.process(pdf(3)).await.unwrap();

    assert_eq!(transcriber.calls(), vec![1, 2, 3]);
}

#[tokio::test]
async fn rerun_resets_the_session() {
    let mut p = Processor::new(Arc::new(CountingRasterizer), ScriptedTranscriber::new(&[]));

    p.process(pdf(3)).await.unwrap();
    assert_eq!(p.session().pages().len(), 3);

    p.process(pdf(1)).await.unwrap();
    assert_eq!(p.session().pages().len(), 1);
    assert_eq!(texts(&p), vec!["text 1"]);
}

#[tokio::test]
async fn rasterization_failure_is_batch_fatal() {
    let recorder = Arc::new(Recorder::default());
    let mut p = Processor::new(Arc::new(CountingRasterizer), ScriptedTranscriber::new(&[]))
        .with_callback(recorder.clone());

    let err = p
        .process(Some(PdfInput::new("photo.gif", b"GIF89a".to_vec())))
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::Rasterization { .. }), "got: {err:?}");
    assert_eq!(p.state(), &ProcessingState::Idle);
    assert!(p.session().pages().is_empty());
    assert!(p.session().transcriptions().is_empty());

    let events = recorder.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].starts_with("failed: ") && events[0].contains("photo.gif"));
}

#[tokio::test]
async fn missing_input_file_is_batch_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.pdf");
    let mut p = Processor::new(Arc::new(CountingRasterizer), ScriptedTranscriber::new(&[]));

    let err = p
        .process_path(missing.to_str().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::FileNotFound { .. }), "got: {err:?}");
    assert_eq!(p.state(), &ProcessingState::Idle);
}

#[tokio::test]
async fn process_path_reads_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.pdf");
    std::fs::write(&path, "%PDF-2").unwrap();
    let mut p = Processor::new(Arc::new(CountingRasterizer), ScriptedTranscriber::new(&[]));

    let outcome = p.process_path(path.to_str().unwrap()).await.unwrap();

    assert!(matches!(outcome, ProcessOutcome::Completed(ref s) if s.total_pages == 2));
    assert_eq!(texts(&p), vec!["text 1", "text 2"]);
}

#[tokio::test]
async fn no_file_leaves_previous_session_untouched() {
    let mut p = Processor::new(Arc::new(CountingRasterizer), ScriptedTranscriber::new(&[]));
    p.process(pdf(2)).await.unwrap();

    let outcome = p.process(None).await.unwrap();

    assert_eq!(outcome, ProcessOutcome::NoFileSelected);
    assert_eq!(texts(&p), vec!["text 1", "text 2"]);
}

#[tokio::test]
async fn concurrent_mode_keeps_page_order() {
    init_tracing();
    // Later pages answer first.
    let transcriber = Arc::new(ScriptedTranscriber {
        fail_on: vec![3],
        delay_ms: |page| 60 - 10 * page as u64,
        calls: Mutex::new(Vec::new()),
    });
    let mut p = Processor::new(Arc::new(CountingRasterizer), transcriber).with_concurrency(5);

    p.process(pdf(5)).await.unwrap();

    let pages: Vec<usize> = p
        .session()
        .transcriptions()
        .iter()
        .map(|r| r.page_num)
        .collect();
    assert_eq!(pages, vec![1, 2, 3, 4, 5]);
    assert_eq!(texts(&p)[2], "Error: boom 3");
}

// ── Viewer ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn viewer_open_and_close_leave_session_alone() {
    let mut p = Processor::new(Arc::new(CountingRasterizer), ScriptedTranscriber::new(&[]));
    p.process(pdf(3)).await.unwrap();
    let session = p.session();
    let before = session.clone();
    let mut viewer = Viewer::new();

    let shown = viewer.handle(
        UiEvent::ThumbnailActivated {
            page: 2,
            via: Activation::Keyboard,
        },
        session,
    );
    assert_eq!(shown.map(|img| img.page_num), Some(2));

    assert!(viewer.handle(UiEvent::KeyPressed(Key::Escape), session).is_none());
    assert!(!viewer.is_open());

    viewer.handle(
        UiEvent::ThumbnailActivated {
            page: 3,
            via: Activation::Pointer,
        },
        session,
    );
    assert!(viewer.handle(UiEvent::CloseClicked, session).is_none());

    // Escape with nothing open is a no-op.
    assert!(viewer.handle(UiEvent::KeyPressed(Key::Escape), session).is_none());

    // Unknown page is ignored.
    assert!(viewer
        .handle(
            UiEvent::ThumbnailActivated {
                page: 9,
                via: Activation::Pointer,
            },
            session,
        )
        .is_none());

    assert_eq!(session.pages(), before.pages());
    assert_eq!(session.transcriptions(), before.transcriptions());
}

// ── Export ───────────────────────────────────────────────────────────────────

#[test]
fn exporting_nothing_gives_zero_sections() {
    let xml = document_xml(&export_docx(&[]).unwrap());
    assert!(xml.contains("<w:body>"));
    assert!(!xml.contains(">Page "));
    assert!(!xml.contains("<w:p>"));
    assert_eq!(export_markdown(&[]), "");
}
