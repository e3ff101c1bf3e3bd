//! Configuration types for PDF-to-image conversion.
//!
//! Two layers of settings exist:
//!
//! * [`ConversionConfig`] — how this process reaches files and the pdfium
//!   engine (retrieval endpoint, timeouts, encoder knobs). Built once via
//!   [`ConversionConfigBuilder`] and shared across invocations.
//! * [`ConversionOptions`] — what a single request asked for (DPI and
//!   image format). Produced by validating [`crate::request::ToolParameters`].

use crate::error::Pdf2ImagesError;
use crate::progress::ProgressCallback;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// PDF user space is defined at 72 points per inch; a DPI of 72 renders
/// one pixel per point.
pub const BASE_DPI: u32 = 72;

/// Accepted DPI range for a request.
pub const MIN_DPI: u32 = 1;
pub const MAX_DPI: u32 = 2400;

/// Process-level configuration for a conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_to_images::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .files_base_url("http://files.internal:5001")
///     .download_timeout_secs(10)
///     .jpeg_quality(85)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 85);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Base URL that server-relative file references (`/files/…`) are joined
    /// to. Default: none, so relative references fail to resolve.
    pub files_base_url: Option<Url>,

    /// Timeout for every HTTP fetch made by the resolver. Default: 30.
    pub download_timeout_secs: u64,

    /// JPEG encoder quality, 1–100. Default: 95.
    pub jpeg_quality: u8,

    /// Maximum rendered width or height in pixels. Default: 16384.
    ///
    /// Ordinary pages scale exactly by `dpi / 72` until an edge reaches
    /// this cap. The cap also bounds memory: a page is held as a 4-byte
    /// RGBA bitmap, so the default allows up to about 1 GiB per page (a
    /// Letter page at 2400 DPI renders to roughly 12660x16384, about
    /// 800 MiB), plus an RGB copy when encoding JPEG. Lower it on hosts
    /// that render several large requests at once. See
    /// [`ConversionOptions::rendered_size`].
    pub max_rendered_pixels: u32,

    /// Explicit pdfium library file, or a directory containing the platform
    /// library. Default: none (working directory, then system library).
    pub pdfium_lib_path: Option<PathBuf>,

    /// Optional observer for per-file and per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            files_base_url: None,
            download_timeout_secs: 30,
            jpeg_quality: 95,
            max_rendered_pixels: 16_384,
            pdfium_lib_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("files_base_url", &self.files_base_url.as_ref().map(Url::as_str))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
            files_base_url: None,
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
    files_base_url: Option<String>,
}

impl ConversionConfigBuilder {
    pub fn files_base_url(mut self, url: impl Into<String>) -> Self {
        self.files_base_url = Some(url.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Attach a [`crate::progress::ConversionProgressCallback`].
    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ConversionConfig, Pdf2ImagesError> {
        if let Some(raw) = self.files_base_url.take() {
            let url = Url::parse(raw.trim()).map_err(|e| {
                Pdf2ImagesError::InvalidConfig(format!("files_base_url '{raw}': {e}"))
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(Pdf2ImagesError::InvalidConfig(format!(
                    "files_base_url must be http(s), got '{raw}'"
                )));
            }
            self.config.files_base_url = Some(url);
        }
        if self.config.download_timeout_secs == 0 {
            return Err(Pdf2ImagesError::InvalidConfig(
                "download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Request options ──────────────────────────────────────────────────────

/// Output raster format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImageFormat {
    /// Lossless PNG. (default)
    #[default]
    Png,
    /// Baseline JPEG without alpha.
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    /// Upper-case name echoed in the summary.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = Pdf2ImagesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PNG" => Ok(ImageFormat::Png),
            "JPEG" | "JPG" => Ok(ImageFormat::Jpeg),
            other => Err(Pdf2ImagesError::InvalidParameters(format!(
                "image_format must be PNG or JPEG, got '{other}'"
            ))),
        }
    }
}

/// Validated per-request options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub dpi: u32,
    pub format: ImageFormat,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            dpi: BASE_DPI,
            format: ImageFormat::Png,
        }
    }
}

impl ConversionOptions {
    /// Render scale relative to PDF user space.
    pub fn scale(&self) -> f32 {
        self.dpi as f32 / BASE_DPI as f32
    }

    /// Pixel size of a `width_pt` x `height_pt` page at this DPI, shrunk
    /// proportionally so neither edge exceeds `max_rendered_pixels`.
    pub fn rendered_size(&self, width_pt: f32, height_pt: f32, max_rendered_pixels: u32) -> (u32, u32) {
        let w = width_pt * self.scale();
        let h = height_pt * self.scale();
        let max = max_rendered_pixels as f32;
        let fit = (max / w).min(max / h).min(1.0);
        ((w * fit).round() as u32, (h * fit).round() as u32)
    }

    /// Bytes of the RGBA bitmap for a page of the given pixel size.
    pub fn bitmap_bytes((width, height): (u32, u32)) -> u64 {
        width as u64 * height as u64 * 4
    }
}
