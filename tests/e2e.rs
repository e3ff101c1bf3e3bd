//! End-to-end integration tests for pdf-to-images.
//!
//! The PDFs are generated in-test, so no fixtures are needed. Tests that
//! rasterise pages need the pdfium shared library and print `SKIP` when it
//! cannot be bound; point `PDFIUM_LIB_PATH` at a library file or directory
//! to run them.
//!
//! Run with:
//!   PDFIUM_LIB_PATH=/opt/pdfium/lib cargo test --test e2e -- --nocapture

use futures::StreamExt;
use pdf_to_images::pipeline::render::bind_pdfium;
use pdf_to_images::{
    convert, convert_stream, convert_sync, convert_to_dir, ConversionConfig,
    ConversionProgressCallback, FileRef, Pdf2ImagesError, ToolMessage, ToolParameters,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn pdfium_lib() -> Option<PathBuf> {
    std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from)
}

/// Route library logs through the test harness (`RUST_LOG=debug` to see them).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config() -> ConversionConfig {
    init_tracing();
    let mut builder = ConversionConfig::builder();
    if let Some(lib) = pdfium_lib() {
        builder = builder.pdfium_lib_path(lib);
    }
    builder.build().unwrap()
}

/// Skip this test if pdfium cannot be bound.
macro_rules! skip_unless_pdfium {
    () => {{
        if let Err(e) = bind_pdfium(pdfium_lib().as_deref()) {
            println!("SKIP — pdfium not available: {}", e.to_string().lines().next().unwrap_or(""));
            return;
        }
    }};
}

/// Build a valid PDF with one page per `(width, height)` in points. Each
/// page paints a blue rectangle so rendered output is not blank.
fn minimal_pdf(pages: &[(u32, u32)]) -> Vec<u8> {
    let n = pages.len();
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), n),
    ];
    for (i, (w, h)) in pages.iter().enumerate() {
        let content_id = 4 + 2 * i;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}] \
             /Resources << >> /Contents {content_id} 0 R >>"
        ));
        let content = format!("0 0 1 rg 10 10 {} {} re f", w / 2, h / 2);
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

fn letter_pdf(page_count: usize) -> Vec<u8> {
    minimal_pdf(&vec![(612, 792); page_count])
}

fn blobs(messages: &[ToolMessage]) -> Vec<(&str, &str, &[u8])> {
    messages
        .iter()
        .filter_map(|m| match m {
            ToolMessage::Blob { data, meta } => {
                Some((meta.filename.as_str(), meta.mime_type.as_str(), data.as_slice()))
            }
            _ => None,
        })
        .collect()
}

// ── Rendering ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_one_image_per_page() {
    skip_unless_pdfium!();
    let params = ToolParameters::with_files(vec![FileRef::from_bytes("report.pdf", letter_pdf(3))]);
    let out = convert(params, &config()).await.unwrap();

    let texts: Vec<&str> = out.texts().collect();
    assert_eq!(texts.first(), Some(&"PDF 1: processing 3 pages..."));
    assert_eq!(texts.last(), Some(&"Conversion complete: generated 3 images"));

    let images = blobs(&out.messages);
    let names: Vec<&str> = images.iter().map(|(n, _, _)| *n).collect();
    assert_eq!(
        names,
        vec!["report_page_1.png", "report_page_2.png", "report_page_3.png"]
    );
    for (_, mime, data) in &images {
        assert_eq!(*mime, "image/png");
        assert_eq!(&data[..8], b"\x89PNG\r\n\x1a\n");
    }

    assert!(out.summary.success);
    assert_eq!(out.summary.total_pages, 3);
    assert_eq!(out.summary.total_images, 3);
    assert_eq!(out.summary.images[2].page_number, 3);
    assert!(out.summary.failed_files.is_empty());
    assert!(matches!(out.messages.last(), Some(ToolMessage::Json { .. })));
}

#[tokio::test]
async fn test_dpi_scales_pixel_dimensions() {
    skip_unless_pdfium!();
    let pdf = minimal_pdf(&[(200, 100)]);

    for (dpi, expected) in [(72, (200, 100)), (144, (400, 200))] {
        let params = ToolParameters {
            dpi,
            ..ToolParameters::with_files(vec![FileRef::from_bytes("wide.pdf", pdf.clone())])
        };
        let out = convert(params, &config()).await.unwrap();
        let (_, _, data) = blobs(&out.messages)[0];
        let img = image::load_from_memory(data).unwrap();
        assert_eq!((img.width(), img.height()), expected, "at {dpi} DPI");

        let record = &out.summary.images[0];
        assert_eq!((record.width, record.height), expected);
        assert_eq!(record.dpi, dpi as u32);
    }
}

async fn render_images(pdf: Vec<u8>) -> Vec<Vec<u8>> {
    let params = ToolParameters::with_files(vec![FileRef::from_bytes("a.pdf", pdf)]);
    let out = convert(params, &config()).await.unwrap();
    out.images().map(|(_, b)| b.to_vec()).collect()
}

#[tokio::test]
async fn test_rendering_is_deterministic() {
    skip_unless_pdfium!();
    let pdf = letter_pdf(2);
    let first = render_images(pdf.clone()).await;
    let second = render_images(pdf).await;
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_jpeg_output() {
    skip_unless_pdfium!();
    let params = ToolParameters {
        image_format: "jpeg".into(),
        ..ToolParameters::with_files(vec![FileRef::from_bytes("scan.pdf", letter_pdf(1))])
    };
    let out = convert(params, &config()).await.unwrap();
    let images = blobs(&out.messages);
    assert_eq!(images.len(), 1);
    let (name, mime, data) = images[0];
    assert_eq!(name, "scan_page_1.jpg");
    assert_eq!(mime, "image/jpeg");
    assert_eq!(&data[..2], &[0xFF, 0xD8]);

    let summary = serde_json::to_value(&out.summary).unwrap();
    assert_eq!(summary["format"], "JPEG");
}

// ── Multi-file behaviour ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_file_does_not_stop_others() {
    skip_unless_pdfium!();
    let params = ToolParameters::with_files(vec![
        FileRef::from_bytes("first.pdf", letter_pdf(1)),
        FileRef::from_path("/definitely/not/here/missing.pdf"),
        FileRef::from_bytes("third.pdf", letter_pdf(2)),
    ]);
    let out = convert(params, &config()).await.unwrap();

    let errors: Vec<&str> = out
        .texts()
        .filter(|t| t.starts_with("Error while processing PDF"))
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Error while processing PDF 2:"));

    let names: Vec<&str> = blobs(&out.messages).iter().map(|(n, _, _)| *n).collect();
    assert_eq!(
        names,
        vec!["first_page_1.png", "third_page_1.png", "third_page_2.png"]
    );

    assert!(out.summary.success);
    assert_eq!(out.summary.total_images, 3);
    assert_eq!(out.summary.failed_files.len(), 1);
    assert_eq!(out.summary.failed_files[0].file_index, 2);
}

#[tokio::test]
async fn test_duplicate_names_stay_unique() {
    skip_unless_pdfium!();
    let params = ToolParameters::with_files(vec![
        FileRef::from_bytes("scan.pdf", letter_pdf(2)),
        FileRef::from_bytes("scan.pdf", letter_pdf(2)),
    ]);
    let out = convert(params, &config()).await.unwrap();

    let names: Vec<&str> = blobs(&out.messages).iter().map(|(n, _, _)| *n).collect();
    assert_eq!(
        names,
        vec![
            "scan_page_1.png",
            "scan_page_2.png",
            "scan_2_page_1.png",
            "scan_2_page_2.png"
        ]
    );
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(unique.len(), names.len());
}

#[tokio::test]
async fn test_corrupt_pdf_is_reported() {
    skip_unless_pdfium!();
    let params = ToolParameters::with_files(vec![
        FileRef::from_bytes("broken.pdf", b"%PDF-1.4\nthis is not a document".to_vec()),
        FileRef::from_bytes("good.pdf", letter_pdf(1)),
    ]);
    let out = convert(params, &config()).await.unwrap();
    let first = out.texts().next().unwrap();
    assert!(first.starts_with("Error while processing PDF 1:"), "got: {first}");
    assert_eq!(out.summary.total_images, 1);
    assert_eq!(out.summary.failed_files[0].filename, "broken.pdf");
}

// ── Streaming, callbacks, disk output ────────────────────────────────────────

#[tokio::test]
async fn test_stream_emits_progress_before_blobs() {
    skip_unless_pdfium!();
    let params = ToolParameters::with_files(vec![FileRef::from_bytes("a.pdf", letter_pdf(2))]);
    let msgs: Vec<ToolMessage> = convert_stream(params, &config()).await.collect().await;

    assert_eq!(msgs[0].as_text(), Some("PDF 1: processing 2 pages..."));
    assert!(msgs[1].is_blob());
    assert!(msgs[2].is_blob());
    assert_eq!(msgs[3].as_text(), Some("Conversion complete: generated 2 images"));
    assert!(matches!(msgs[4], ToolMessage::Json { .. }));
    assert_eq!(msgs.len(), 5);
}

#[derive(Default)]
struct Counter {
    files: AtomicUsize,
    pages: AtomicUsize,
    errors: AtomicUsize,
    completed_images: AtomicUsize,
}

impl ConversionProgressCallback for Counter {
    fn on_file_opened(&self, _file_index: usize, _total_pages: usize) {
        self.files.fetch_add(1, Ordering::SeqCst);
    }
    fn on_page_rendered(&self, _file_index: usize, _page_num: usize, _total: usize, _bytes: usize) {
        self.pages.fetch_add(1, Ordering::SeqCst);
    }
    fn on_file_error(&self, _file_index: usize, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
    fn on_conversion_complete(&self, total_images: usize, _failed_files: usize) {
        self.completed_images.store(total_images, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_progress_callback_sees_every_page() {
    skip_unless_pdfium!();
    let counter = Arc::new(Counter::default());
    let mut builder = ConversionConfig::builder()
        .progress_callback(counter.clone() as Arc<dyn ConversionProgressCallback>);
    if let Some(lib) = pdfium_lib() {
        builder = builder.pdfium_lib_path(lib);
    }
    let params = ToolParameters::with_files(vec![
        FileRef::from_bytes("a.pdf", letter_pdf(2)),
        FileRef::from_bytes("b.txt", b"not a pdf".to_vec()),
        FileRef::from_bytes("c.pdf", letter_pdf(3)),
    ]);
    convert(params, &builder.build().unwrap()).await.unwrap();

    assert_eq!(counter.files.load(Ordering::SeqCst), 2);
    assert_eq!(counter.pages.load(Ordering::SeqCst), 5);
    assert_eq!(counter.errors.load(Ordering::SeqCst), 1);
    assert_eq!(counter.completed_images.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_convert_to_dir_writes_images() {
    skip_unless_pdfium!();
    let dir = tempfile::tempdir().unwrap();
    let pdf_path = dir.path().join("input.pdf");
    std::fs::write(&pdf_path, letter_pdf(2)).unwrap();

    let out_dir = dir.path().join("pages");
    let params = ToolParameters::with_files(vec![FileRef::from_path(
        pdf_path.to_string_lossy().to_string(),
    )]);
    let summary = convert_to_dir(params, &out_dir, &config()).await.unwrap();

    assert_eq!(summary.total_images, 2);
    for record in &summary.images {
        let written = std::fs::read(out_dir.join(&record.filename)).unwrap();
        assert_eq!(&written[..4], b"\x89PNG");
    }
}

// ── Without pdfium ───────────────────────────────────────────────────────────

#[test]
fn test_no_files_is_fatal() {
    let err = tokio_test::block_on(convert(ToolParameters::default(), &ConversionConfig::default()))
        .unwrap_err();
    assert!(matches!(err, Pdf2ImagesError::NoFiles));
    assert_eq!(err.to_string(), "No PDF files were provided.");
}

#[test]
fn test_out_of_range_dpi_is_parameter_error() {
    let params = ToolParameters::from_value(serde_json::json!({
        "files": [{ "filename": "a.pdf", "path": "a.pdf" }],
        "dpi": 5000
    }))
    .unwrap();
    let err = convert_sync(params, &ConversionConfig::default()).unwrap_err();
    assert!(err.to_string().starts_with("Parameter error:"), "got: {err}");
}

#[test]
fn test_malformed_request_is_parameter_error() {
    let err = ToolParameters::from_value(serde_json::json!({ "files": "a.pdf" })).unwrap_err();
    assert!(matches!(err, Pdf2ImagesError::InvalidParameters(_)));
}

#[tokio::test]
async fn test_unresolvable_request_still_summarises() {
    let params = ToolParameters::with_files(vec![FileRef {
        filename: "ghost.pdf".into(),
        ..Default::default()
    }]);
    let msgs: Vec<ToolMessage> = convert_stream(params, &ConversionConfig::default())
        .await
        .collect()
        .await;

    let texts: Vec<&str> = msgs.iter().filter_map(ToolMessage::as_text).collect();
    assert_eq!(texts.len(), 2);
    assert!(texts[0].starts_with("Error while processing PDF 1:"));
    assert!(texts[0].contains("no blob, path or url was provided"));
    assert_eq!(texts[1], "No PDF files could be converted.");

    let Some(ToolMessage::Json { json }) = msgs.last() else {
        panic!("summary must be last");
    };
    assert_eq!(json["success"], false);
    assert_eq!(json["images"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_missing_pdfium_aborts_run() {
    if bind_pdfium(pdfium_lib().as_deref()).is_ok() {
        println!("SKIP — pdfium is available, binding cannot fail here");
        return;
    }
    let params = || {
        ToolParameters::with_files(vec![
            FileRef::from_path("/definitely/not/here/missing.pdf"),
            FileRef::from_bytes("a.pdf", letter_pdf(1)),
            FileRef::from_bytes("b.pdf", letter_pdf(1)),
        ])
    };

    let msgs: Vec<ToolMessage> = convert_stream(params(), &config()).await.collect().await;
    let texts: Vec<&str> = msgs.iter().filter_map(ToolMessage::as_text).collect();
    assert_eq!(msgs.len(), 2, "got: {texts:?}");
    assert!(texts[0].starts_with("Error while processing PDF 1:"));
    assert!(texts[1].starts_with("Failed to bind to pdfium library"));
    assert!(!msgs.iter().any(|m| matches!(m, ToolMessage::Json { .. })));

    let err = convert(params(), &config()).await.unwrap_err();
    assert!(matches!(err, Pdf2ImagesError::PdfiumBindingFailed(_)));
}
