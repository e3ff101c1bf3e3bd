//! Tool request types: the file references and raw parameters a host
//! platform hands to the action, and their validation into a
//! [`ConversionRequest`].

use crate::config::{ConversionOptions, ImageFormat, BASE_DPI, MAX_DPI, MIN_DPI};
use crate::error::Pdf2ImagesError;
use serde::{Deserialize, Serialize};

/// An uploaded file as seen by the tool.
///
/// At least one of `data`, `path` or `url` should be set; the resolver tries
/// them in that order (see [`crate::pipeline::input`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Original upload name, e.g. `report.pdf`.
    #[serde(default)]
    pub filename: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Size in bytes as reported by the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Inline content. Base64 in JSON.
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,

    /// Local filesystem path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Absolute http(s) URL, or a server-relative path such as `/files/abc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FileRef {
    pub fn from_bytes(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: Some("application/pdf".into()),
            size: Some(data.len() as u64),
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            filename: last_segment(&path),
            path: Some(path),
            ..Default::default()
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            filename: last_segment(url.split(['?', '#']).next().unwrap_or(&url)),
            url: Some(url),
            ..Default::default()
        }
    }

    /// Build a reference from a CLI argument: http(s) URLs become `url`,
    /// anything else a local `path`.
    pub fn from_input(input: &str) -> Self {
        if crate::pipeline::input::is_url(input) {
            Self::from_url(input)
        } else {
            Self::from_path(input)
        }
    }
}

fn last_segment(s: &str) -> String {
    s.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Raw parameters as received from the host platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    #[serde(default)]
    pub files: Option<Vec<FileRef>>,

    /// Integer DPI. Whole-number floats (`150.0`) and numeric strings
    /// (`"150"`) are accepted since form-based hosts send either.
    #[serde(default = "default_dpi", deserialize_with = "whole_number")]
    pub dpi: i64,

    #[serde(default = "default_image_format")]
    pub image_format: String,
}

fn default_dpi() -> i64 {
    BASE_DPI as i64
}

fn default_image_format() -> String {
    ImageFormat::Png.as_str().to_string()
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self {
            files: None,
            dpi: default_dpi(),
            image_format: default_image_format(),
        }
    }
}

impl ToolParameters {
    /// Parameters for the given files with default options.
    pub fn with_files(files: Vec<FileRef>) -> Self {
        Self {
            files: Some(files),
            ..Default::default()
        }
    }

    /// Deserialize a host-supplied JSON object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, Pdf2ImagesError> {
        serde_json::from_value(value).map_err(|e| Pdf2ImagesError::InvalidParameters(e.to_string()))
    }

    /// Check every field and produce a request the orchestrator can run.
    pub fn validate(self) -> Result<ConversionRequest, Pdf2ImagesError> {
        let files = match self.files {
            Some(f) if !f.is_empty() => f,
            _ => return Err(Pdf2ImagesError::NoFiles),
        };

        if self.dpi < MIN_DPI as i64 || self.dpi > MAX_DPI as i64 {
            return Err(Pdf2ImagesError::InvalidParameters(format!(
                "dpi must be {MIN_DPI}–{MAX_DPI}, got {}",
                self.dpi
            )));
        }

        let format: ImageFormat = self.image_format.parse()?;

        Ok(ConversionRequest {
            files,
            options: ConversionOptions {
                dpi: self.dpi as u32,
                format,
            },
        })
    }
}

/// A validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub files: Vec<FileRef>,
    pub options: ConversionOptions,
}

/// Deserialize an integer from a JSON integer, a float without a
/// fractional part, or a string holding either.
fn whole_number<'de, D: serde::Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    use serde::de::Error;

    let value = serde_json::Value::deserialize(d)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    };
    parsed.ok_or_else(|| D::Error::custom(format!("dpi must be a whole number, got {value}")))
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() <= i64::MAX as f64).then_some(f as i64)
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(bytes) => s.serialize_str(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| STANDARD.decode(s.trim()).map_err(serde::de::Error::custom))
            .transpose()
    }
}
