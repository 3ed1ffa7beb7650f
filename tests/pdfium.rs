//! Rasterization through the real pdfium library.
//!
//! Skipped (with a message) when pdfium cannot be bound. Point
//! `PDFIUM_LIB_PATH` at a libpdfium file or directory to run them:
//!   PDFIUM_LIB_PATH=/opt/pdfium/lib cargo test --test pdfium -- --nocapture

use notes2docx::pipeline::encode;
use notes2docx::{
    Gallery, PageImage, PdfiumRasterizer, ProcessingConfig, RasterizationError, Rasterizer,
};
use std::path::PathBuf;

/// Rasterize `pdf`, or `None` when pdfium cannot be bound.
async fn rasterize(pdf: &[u8]) -> Option<Result<Vec<PageImage>, RasterizationError>> {
    let mut builder = ProcessingConfig::builder().api_key("unused");
    if let Some(p) = std::env::var_os("PDFIUM_LIB_PATH") {
        builder = builder.pdfium_lib_path(PathBuf::from(p));
    }
    let rasterizer = PdfiumRasterizer::from_config(&builder.build().unwrap());

    match rasterizer.rasterize(pdf).await {
        Err(RasterizationError::Binding { detail }) => {
            println!("SKIP — pdfium not available: {detail}");
            None
        }
        other => Some(other),
    }
}

/// A blank PDF with one page per `(width, height)` media box, in points.
fn blank_pdf(sizes: &[(u32, u32)]) -> Vec<u8> {
    let first_page = 3;
    let kids: Vec<String> = (0..sizes.len())
        .map(|i| format!("{} 0 R", first_page + i))
        .collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            sizes.len()
        ),
    ];
    for (w, h) in sizes {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}] /Resources << >> >>"
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{obj}\nendobj\n", i + 1).as_bytes());
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}

#[tokio::test]
async fn renders_every_page_in_order_at_double_scale() {
    let Some(result) = rasterize(&blank_pdf(&[(200, 100), (100, 150), (50, 50)])).await else {
        return;
    };
    let pages = result.unwrap();

    let sizes: Vec<(usize, u32, u32)> = pages
        .iter()
        .map(|p| (p.page_num, p.width, p.height))
        .collect();
    assert_eq!(sizes, vec![(1, 400, 200), (2, 200, 300), (3, 100, 100)]);

    let png = encode::decode_png(&pages[0]).unwrap();
    assert_eq!(&png[1..4], b"PNG");

    let gallery = Gallery::from_pages(&pages, 200).unwrap();
    assert_eq!(
        (gallery.thumbnails()[0].width, gallery.thumbnails()[0].height),
        (200, 100)
    );
}

#[tokio::test]
async fn truncated_pdf_is_rejected() {
    let Some(result) = rasterize(b"%PDF-1.4\n1 0 obj\n<<").await else {
        return;
    };
    // pdfium's repair pass may salvage an empty document instead of failing.
    match result {
        Err(err) => assert!(
            matches!(err, RasterizationError::Corrupt { .. }),
            "got: {err:?}"
        ),
        Ok(pages) => assert!(pages.is_empty()),
    }
}
