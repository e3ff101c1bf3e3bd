//! Error types for the pdf-to-images library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2ImagesError`] — **Fatal**: the invocation cannot proceed at all
//!   (bad parameters, no PDFium engine, unwritable output). Emitted once as
//!   a text message before the stream ends, or returned as `Err` from the
//!   blocking helpers.
//!
//! * [`FileError`] — **Non-fatal**: a single input file could not be
//!   fetched, opened or rendered. The file is reported and skipped; every
//!   other file is still processed and images already emitted stay valid.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-to-images library.
///
/// Per-file failures use [`FileError`] and are recorded in the
/// [`crate::output::ConversionSummary`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2ImagesError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The tool parameters failed validation.
    #[error("Parameter error: {0}")]
    InvalidParameters(String),

    /// The request carried no files at all.
    #[error("No PDF files were provided.")]
    NoFiles,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n\
  • Place the platform pdfium library in the working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// One step of the resolver's fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AccessAttempt {
    /// How the bytes were looked for: `blob`, `path`, `url` or `base_url`.
    pub method: String,
    /// Path or URL that was tried (empty for the inline blob).
    pub target: String,
    /// Why the attempt did not produce bytes.
    pub error: String,
}

/// Every way of reaching a file's bytes failed.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("cannot access '{filename}' after {} attempt(s): {last_error}", attempts.len())]
pub struct FileAccessError {
    pub filename: String,
    /// Attempts in the order they were made.
    pub attempts: Vec<AccessAttempt>,
    /// Error of the final attempt, or why there was nothing to try.
    pub last_error: String,
}

/// A non-fatal error for a single input file.
#[derive(Debug, Clone, Error)]
pub enum FileError {
    /// Bytes could not be obtained through any fallback.
    #[error(transparent)]
    Access(#[from] FileAccessError),

    /// The bytes were obtained but do not carry a PDF header.
    #[error("'{filename}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { filename: String, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("'{filename}' could not be opened: {detail}")]
    CorruptPdf { filename: String, detail: String },

    /// PDF requires a password.
    #[error("'{filename}' is encrypted and requires a password")]
    PasswordRequired { filename: String },

    /// pdfium-render returned an error for a specific page.
    #[error("rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The rendered bitmap could not be encoded.
    #[error("encoding page {page} as {format} failed: {detail}")]
    EncodeFailed {
        page: usize,
        format: String,
        detail: String,
    },

    /// The pdfium engine could not be loaded. Promoted to
    /// [`Pdf2ImagesError::PdfiumBindingFailed`] by the orchestrator.
    #[error("pdfium engine unavailable: {0}")]
    EngineUnavailable(String),
}
