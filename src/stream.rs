//! Streaming conversion API: emit messages as pages are rendered.
//!
//! This is the host-facing shape of the tool. Every invocation produces,
//! in order:
//!
//! 1. per file: a `PDF {i}: processing {n} pages...` text, then one blob per
//!    page, or a single `Error while processing PDF {i}: …` text
//! 2. a closing text
//! 3. the [`ConversionSummary`] as a JSON message
//!
//! A fatal error (bad parameters, no pdfium) produces one text and ends
//! the stream. Dropping the stream cancels the run after the current page.

use crate::config::ConversionConfig;
use crate::error::{FileError, Pdf2ImagesError};
use crate::output::{ConversionSummary, FailedFile, ToolMessage};
use crate::pipeline::input::{check_pdf_header, FileResolver};
use crate::pipeline::naming::FileNamer;
use crate::pipeline::render::{self, RenderJob};
use crate::request::ToolParameters;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of tool messages.
pub type MessageStream = Pin<Box<dyn Stream<Item = ToolMessage> + Send>>;

/// Messages buffered between the render thread and the consumer. Small on
/// purpose: each blob can be several megabytes.
pub(crate) const CHANNEL_CAPACITY: usize = 4;

/// Convert the request, streaming messages as they are produced.
///
/// Must be called from within a Tokio runtime; the work runs on a spawned
/// task.
///
/// # Example
/// ```rust,no_run
/// use pdf_to_images::{convert_stream, ConversionConfig, FileRef, ToolMessage, ToolParameters};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let params = ToolParameters::with_files(vec![FileRef::from_path("report.pdf")]);
/// let mut stream = convert_stream(params, &ConversionConfig::default()).await;
/// while let Some(msg) = stream.next().await {
///     match msg {
///         ToolMessage::Text { text } => eprintln!("{text}"),
///         ToolMessage::Blob { data, meta } => println!("{} ({} bytes)", meta.filename, data.len()),
///         ToolMessage::Json { json } => println!("{json}"),
///     }
/// }
/// # }
/// ```
pub async fn convert_stream(params: ToolParameters, config: &ConversionConfig) -> MessageStream {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let config = config.clone();
    tokio::spawn(async move {
        if let Err(e) = run(params, config, tx).await {
            warn!("Conversion aborted: {}", e);
        }
    });
    Box::pin(ReceiverStream::new(rx))
}

/// Drive one invocation, sending every message into `tx`.
///
/// Returns the summary that was emitted, or the fatal error that was
/// reported in its place. A consumer that disappears mid-run yields the
/// partial summary.
pub(crate) async fn run(
    params: ToolParameters,
    config: ConversionConfig,
    tx: mpsc::Sender<ToolMessage>,
) -> Result<ConversionSummary, Pdf2ImagesError> {
    let request = match params.validate() {
        Ok(r) => r,
        Err(e) => return Err(abort(&tx, e).await),
    };
    let resolver = match FileResolver::new(&config) {
        Ok(r) => r,
        Err(e) => return Err(abort(&tx, e).await),
    };
    let progress = config.progress_callback.clone();
    let options = request.options;
    let total_files = request.files.len();

    info!(
        "Converting {} file(s) at {} DPI as {}",
        total_files, options.dpi, options.format
    );
    if let Some(ref cb) = progress {
        cb.on_conversion_start(total_files);
    }

    let mut summary = ConversionSummary::new(&options);
    let mut namer = FileNamer::new();

    for (i, file) in request.files.into_iter().enumerate() {
        let file_index = i + 1;
        info!("Processing PDF {}: {}", file_index, file.filename);
        if let Some(ref cb) = progress {
            cb.on_file_start(file_index, &file.filename);
        }

        // ── Resolve bytes ────────────────────────────────────────────────
        let resolved = resolver
            .resolve(&file)
            .await
            .map_err(FileError::from)
            .and_then(|bytes| check_pdf_header(&file.filename, &bytes).map(|_| bytes));
        let bytes = match resolved {
            Ok(b) => b,
            Err(e) => {
                if !report_file_error(&tx, &mut summary, &config, file_index, &file.filename, &e).await
                {
                    return Ok(summary);
                }
                continue;
            }
        };

        // ── Render pages off the runtime ─────────────────────────────────
        let job = RenderJob {
            file_index,
            filename: file.filename.clone(),
            basename: namer.reserve(&file.filename, file_index),
            bytes,
            options,
            jpeg_quality: config.jpeg_quality,
            max_rendered_pixels: config.max_rendered_pixels,
            pdfium_lib_path: config.pdfium_lib_path.clone(),
        };
        let render_tx = tx.clone();
        let render_cb = progress.clone();
        let rendered = tokio::task::spawn_blocking(move || {
            let mut emit = |msg: ToolMessage| render_tx.blocking_send(msg).is_ok();
            render::render_file_blocking(&job, render_cb.as_ref(), &mut emit)
        })
        .await
        .map_err(|e| Pdf2ImagesError::Internal(format!("Render task panicked: {}", e)));

        let outcome = match rendered {
            Err(fatal) => return Err(abort(&tx, fatal).await),
            Ok(Err(FileError::EngineUnavailable(detail))) => {
                return Err(abort(&tx, Pdf2ImagesError::PdfiumBindingFailed(detail)).await)
            }
            Ok(Err(e)) => {
                if !report_file_error(&tx, &mut summary, &config, file_index, &file.filename, &e).await
                {
                    return Ok(summary);
                }
                continue;
            }
            Ok(Ok(outcome)) => outcome,
        };

        summary.total_pages += outcome.total_pages;
        for record in outcome.images {
            summary.push_image(record);
        }
        if outcome.cancelled {
            info!("Consumer went away; stopping after PDF {}", file_index);
            return Ok(summary);
        }
        if let Some(e) = outcome.error {
            if !report_file_error(&tx, &mut summary, &config, file_index, &file.filename, &e).await {
                return Ok(summary);
            }
        }
    }

    // ── Summary ──────────────────────────────────────────────────────────
    if let Some(ref cb) = progress {
        cb.on_conversion_complete(summary.total_images, summary.failed_files.len());
    }
    let closing = if summary.success {
        format!("Conversion complete: generated {} images", summary.total_images)
    } else {
        "No PDF files could be converted.".to_string()
    };
    info!(
        "{} ({} pages, {} failed files)",
        closing,
        summary.total_pages,
        summary.failed_files.len()
    );

    if tx.send(ToolMessage::text(closing)).await.is_ok() {
        let _ = tx.send(summary.to_message()).await;
    }
    Ok(summary)
}

/// Report a fatal error as the stream's final message.
async fn abort(tx: &mpsc::Sender<ToolMessage>, e: Pdf2ImagesError) -> Pdf2ImagesError {
    warn!("{}", e);
    let _ = tx.send(ToolMessage::text(e.to_string())).await;
    e
}

/// Record a skipped file and tell the consumer. Returns `false` when the
/// consumer is gone.
async fn report_file_error(
    tx: &mpsc::Sender<ToolMessage>,
    summary: &mut ConversionSummary,
    config: &ConversionConfig,
    file_index: usize,
    filename: &str,
    e: &FileError,
) -> bool {
    let detail = e.to_string();
    warn!("PDF {} ({}) failed: {}", file_index, filename, detail);
    if let Some(ref cb) = config.progress_callback {
        cb.on_file_error(file_index, &detail);
    }
    summary.failed_files.push(FailedFile {
        file_index,
        filename: filename.to_string(),
        error: detail.clone(),
    });
    tx.send(ToolMessage::text(format!(
        "Error while processing PDF {file_index}: {detail}"
    )))
    .await
    .is_ok()
}
