//! # pdf-to-images
//!
//! Render every page of one or more PDF documents to PNG or JPEG images.
//!
//! ## Why this crate?
//!
//! Chat and workflow platforms hand tools a list of uploaded files, each of
//! which may arrive as raw bytes, a path on the platform's file server, or a
//! plain URL. This crate resolves each of those to PDF bytes, rasterises
//! every page with pdfium at a chosen DPI, and hands the images back as a
//! stream of messages followed by a JSON summary. One broken upload never
//! aborts the others.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files[]
//!  │
//!  ├─ 1. Validate  dpi 1–2400, format PNG | JPEG, at least one file
//!  ├─ 2. Resolve   blob → path → url → files_base_url (first success wins)
//!  ├─ 3. Render    rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 4. Encode    PNG or JPEG bytes, `{basename}_page_{n}.{ext}`
//!  └─ 5. Summary   closing text + JSON summary of every image
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_to_images::{convert, ConversionConfig, FileRef, ToolParameters};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .files_base_url("https://files.example.com")
//!         .build()?;
//!     let params = ToolParameters::with_files(vec![
//!         FileRef::from_path("report.pdf"),
//!         FileRef::from_url("https://example.com/slides.pdf"),
//!     ]);
//!     let output = convert(params, &config).await?;
//!     for (meta, bytes) in output.images() {
//!         std::fs::write(&meta.filename, bytes)?;
//!     }
//!     eprintln!("{} images from {} pages",
//!         output.summary.total_images,
//!         output.summary.total_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2images` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf-to-images = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirement
//!
//! Rendering needs the pdfium shared library. It is looked up in
//! [`ConversionConfig::pdfium_lib_path`], then the working directory, then
//! the system library path. Without it every request ends with a single
//! "Failed to bind to pdfium library" message.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod request;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ConversionOptions, ImageFormat};
pub use convert::{convert, convert_sync, convert_to_dir, save_image};
pub use error::{AccessAttempt, FileAccessError, FileError, Pdf2ImagesError};
pub use output::{
    BlobMeta, ConversionOutput, ConversionSummary, FailedFile, ImageRecord, ToolMessage,
};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use request::{ConversionRequest, FileRef, ToolParameters};
pub use stream::{convert_stream, MessageStream};
