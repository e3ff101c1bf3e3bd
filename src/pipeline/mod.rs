//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one step, so each is testable on its
//! own and the render backend can change without touching the resolver.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode
//! (blob/path/URL)  (pdfium)  (PNG/JPEG)
//!                 ▲
//!               naming
//! ```
//!
//! 1. [`input`]  — resolve a file reference to PDF bytes through the
//!    fallback chain; the only stage with network I/O
//! 2. [`render`] — open the document and rasterise pages; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`] — PNG or JPEG bytes from the rendered bitmap
//! 4. [`naming`] — unique `{basename}_page_{n}.{ext}` filenames

pub mod encode;
pub mod input;
pub mod naming;
pub mod render;
