//! Eager conversion entry points.
//!
//! ## Why eager vs. streaming?
//!
//! [`convert`] waits for every page and returns all messages at once, which
//! is the simplest API for callers that only want the final images.
//! Rendered pages are held in memory until the call returns; use
//! [`crate::stream::convert_stream`] for documents with hundreds of pages,
//! or [`convert_to_dir`] to write each page to disk as soon as it is encoded.

use crate::config::ConversionConfig;
use crate::error::Pdf2ImagesError;
use crate::output::{ConversionOutput, ConversionSummary, ToolMessage};
use crate::request::ToolParameters;
use crate::stream::{run, CHANNEL_CAPACITY};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

/// Convert every file of the request and collect the messages.
///
/// # Returns
/// `Ok(ConversionOutput)` whenever the request was valid, even if every
/// file failed (check `output.summary.success` and
/// `output.summary.failed_files`).
///
/// # Errors
/// Returns `Err(Pdf2ImagesError)` only for fatal errors:
/// - Invalid parameters or no files
/// - pdfium could not be loaded
///
/// # Example
/// ```rust,no_run
/// use pdf_to_images::{convert, ConversionConfig, FileRef, ToolParameters};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let params = ToolParameters {
///     dpi: 150,
///     ..ToolParameters::with_files(vec![FileRef::from_path("slides.pdf")])
/// };
/// let output = convert(params, &ConversionConfig::default()).await?;
/// for (meta, bytes) in output.images() {
///     std::fs::write(&meta.filename, bytes)?;
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert(
    params: ToolParameters,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2ImagesError> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let collect = ReceiverStream::new(rx).collect::<Vec<ToolMessage>>();
    let (summary, messages) = tokio::join!(run(params, config.clone(), tx), collect);
    let summary = summary?;
    debug!("Collected {} messages", messages.len());
    Ok(ConversionOutput { messages, summary })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    params: ToolParameters,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2ImagesError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2ImagesError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(params, config))
}

/// Convert the request and write each image into `dir` as it is produced.
///
/// Text messages are logged rather than returned. Stops at the first write
/// failure.
pub async fn convert_to_dir(
    params: ToolParameters,
    dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionSummary, Pdf2ImagesError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Pdf2ImagesError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    let writer = async move {
        while let Some(msg) = rx.recv().await {
            match msg {
                ToolMessage::Blob { data, meta } => {
                    save_image(dir, &meta.filename, &data).await?;
                }
                ToolMessage::Text { text } => info!("{}", text),
                ToolMessage::Json { .. } => {}
            }
        }
        Ok::<(), Pdf2ImagesError>(())
    };

    // A failed write drops the receiver, which stops the run after the
    // current page.
    let (summary, written) = tokio::join!(run(params, config.clone(), tx), writer);
    written?;
    summary
}

/// Write one image into `dir`.
///
/// Uses atomic write (temp file + rename) so a crash never leaves a
/// truncated image under its final name.
pub async fn save_image(
    dir: &Path,
    filename: &str,
    data: &[u8],
) -> Result<PathBuf, Pdf2ImagesError> {
    let path = dir.join(filename);
    let tmp_path = dir.join(format!(".{filename}.tmp"));

    tokio::fs::write(&tmp_path, data)
        .await
        .map_err(|e| Pdf2ImagesError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|e| Pdf2ImagesError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    debug!("Wrote {} ({} bytes)", path.display(), data.len());
    Ok(path)
}
