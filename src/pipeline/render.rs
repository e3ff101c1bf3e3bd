//! PDF rasterisation: open a document with pdfium and render its pages.
//!
//! ## Why blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which keeps
//! thread-local state and is not safe to drive from async code. The
//! orchestrator runs [`render_file_blocking`] inside
//! `tokio::task::spawn_blocking` and receives each page through the `emit`
//! closure as soon as it is encoded, so the first image reaches the caller
//! before the last page is rendered.
//!
//! ## Scale
//!
//! PDF user space has 72 units per inch, so a page renders at
//! `dpi / 72` pixels per point. `max_rendered_pixels` caps either edge
//! for pathological page sizes.

use crate::config::ConversionOptions;
use crate::error::{FileError, Pdf2ImagesError};
use crate::output::{ImageRecord, ToolMessage};
use crate::pipeline::encode;
use crate::pipeline::naming::page_filename;
use crate::progress::ProgressCallback;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bind to a pdfium library.
///
/// Tries, in order: the explicit `lib_path` (a library file, or a directory
/// holding the platform library), the working directory, and the system
/// library search path.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, Pdf2ImagesError> {
    let mut errors = Vec::new();

    if let Some(path) = lib_path {
        let candidate = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(path)
        } else {
            path.to_path_buf()
        };
        match Pdfium::bind_to_library(&candidate) {
            Ok(bindings) => return Ok(Pdfium::new(bindings)),
            Err(e) => errors.push(format!("{}: {:?}", candidate.display(), e)),
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&local) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(e) => errors.push(format!("{}: {:?}", local.display(), e)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(e) => {
            errors.push(format!("system library: {:?}", e));
            Err(Pdf2ImagesError::PdfiumBindingFailed(errors.join("; ")))
        }
    }
}

/// Render settings for one page scale.
pub fn render_config(options: &ConversionOptions, max_rendered_pixels: u32) -> PdfRenderConfig {
    PdfRenderConfig::new()
        .scale_page_by_factor(options.scale())
        .set_maximum_width(max_rendered_pixels as i32)
        .set_maximum_height(max_rendered_pixels as i32)
}

/// One encoded page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Render page `page_index` (0-based) of an open document and encode it.
///
/// Deterministic for a given page, scale and format.
pub fn rasterize_page(
    document: &PdfDocument<'_>,
    page_index: usize,
    render_config: &PdfRenderConfig,
    options: &ConversionOptions,
    jpeg_quality: u8,
    max_rendered_pixels: u32,
) -> Result<RenderedPage, FileError> {
    let page_num = page_index + 1;
    let page = document
        .pages()
        .get(page_index as u16)
        .map_err(|e| FileError::RasterisationFailed {
            page: page_num,
            detail: format!("{:?}", e),
        })?;

    let expected = options.rendered_size(page.width().value, page.height().value, max_rendered_pixels);
    debug!(
        "Page {}: {}x{} px, ~{} MiB bitmap",
        page_num,
        expected.0,
        expected.1,
        ConversionOptions::bitmap_bytes(expected) >> 20
    );

    let bitmap = page
        .render_with_config(render_config)
        .map_err(|e| FileError::RasterisationFailed {
            page: page_num,
            detail: format!("{:?}", e),
        })?;

    let image = bitmap.as_image();
    let (width, height) = (image.width(), image.height());
    debug!("Rendered page {} → {}x{} px", page_num, width, height);

    let data = encode::encode_page(&image, options.format, jpeg_quality).map_err(|e| {
        FileError::EncodeFailed {
            page: page_num,
            format: options.format.to_string(),
            detail: e.to_string(),
        }
    })?;

    Ok(RenderedPage {
        data,
        width,
        height,
    })
}

/// Everything needed to render one resolved file off the async runtime.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// 1-indexed position in the request.
    pub file_index: usize,
    pub filename: String,
    /// Unique basename reserved by [`crate::pipeline::naming::FileNamer`].
    pub basename: String,
    pub bytes: Vec<u8>,
    pub options: ConversionOptions,
    pub jpeg_quality: u8,
    pub max_rendered_pixels: u32,
    pub pdfium_lib_path: Option<PathBuf>,
}

/// Result of rendering one opened document.
#[derive(Debug, Default)]
pub struct FileOutcome {
    pub total_pages: usize,
    /// Records of images emitted, in page order.
    pub images: Vec<ImageRecord>,
    /// Set when a page failed; pages after it were not rendered.
    pub error: Option<FileError>,
    /// The receiver went away; nothing further should be emitted.
    pub cancelled: bool,
}

/// Open the job's document, emit a progress line and one blob per page.
///
/// `emit` returns `false` once the consumer has gone away, which stops
/// rendering after the current page. Returns `Err` only when the document
/// could not be opened at all.
pub fn render_file_blocking(
    job: &RenderJob,
    progress: Option<&ProgressCallback>,
    emit: &mut dyn FnMut(ToolMessage) -> bool,
) -> Result<FileOutcome, FileError> {
    let pdfium = bind_pdfium(job.pdfium_lib_path.as_deref()).map_err(|e| match e {
        Pdf2ImagesError::PdfiumBindingFailed(detail) => FileError::EngineUnavailable(detail),
        other => FileError::EngineUnavailable(other.to_string()),
    })?;

    let document = pdfium
        .load_pdf_from_byte_slice(&job.bytes, None)
        .map_err(|e| classify_open_error(&job.filename, e))?;

    let total_pages = document.pages().len() as usize;
    info!("PDF {} ({}) loaded: {} pages", job.file_index, job.filename, total_pages);
    if let Some(cb) = progress {
        cb.on_file_opened(job.file_index, total_pages);
    }

    let mut outcome = FileOutcome {
        total_pages,
        ..Default::default()
    };

    if !emit(ToolMessage::text(format!(
        "PDF {}: processing {} pages...",
        job.file_index, total_pages
    ))) {
        outcome.cancelled = true;
        return Ok(outcome);
    }

    let config = render_config(&job.options, job.max_rendered_pixels);
    let mime_type = job.options.format.mime_type();

    for page_index in 0..total_pages {
        let page_number = page_index + 1;
        let rendered = match rasterize_page(
            &document,
            page_index,
            &config,
            &job.options,
            job.jpeg_quality,
            job.max_rendered_pixels,
        ) {
            Ok(r) => r,
            Err(e) => {
                outcome.error = Some(e);
                break;
            }
        };

        let filename = page_filename(&job.basename, page_number, job.options.format);
        let bytes = rendered.data.len();
        let record = ImageRecord {
            file_index: job.file_index,
            page_number,
            filename: filename.clone(),
            mime_type: mime_type.to_string(),
            width: rendered.width,
            height: rendered.height,
            dpi: job.options.dpi,
        };

        if !emit(ToolMessage::blob(rendered.data, mime_type, filename)) {
            outcome.cancelled = true;
            break;
        }
        if let Some(cb) = progress {
            cb.on_page_rendered(job.file_index, page_number, total_pages, bytes);
        }
        outcome.images.push(record);
    }

    // Close the document before the bindings go away.
    drop(document);
    Ok(outcome)
}

/// Map a pdfium load failure onto a per-file error.
fn classify_open_error(filename: &str, e: PdfiumError) -> FileError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        FileError::PasswordRequired {
            filename: filename.to_string(),
        }
    } else {
        FileError::CorruptPdf {
            filename: filename.to_string(),
            detail: err_str,
        }
    }
}
