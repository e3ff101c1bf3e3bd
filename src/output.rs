//! Output types: the message stream handed back to the host platform and
//! the summary that terminates it.

use crate::config::{ConversionOptions, ImageFormat};
use serde::{Deserialize, Serialize};

/// Metadata attached to a binary message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMeta {
    pub mime_type: String,
    pub filename: String,
}

/// One message of the tool's output stream.
///
/// Serialises as a tagged object (`{"type": "text", ...}`) so the CLI can
/// emit the stream as newline-delimited JSON; blob bytes become base64.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolMessage {
    /// Human-readable progress or error line.
    Text { text: String },
    /// An encoded page image.
    Blob {
        #[serde(with = "b64")]
        data: Vec<u8>,
        meta: BlobMeta,
    },
    /// Structured result; only the final summary uses this.
    Json { json: serde_json::Value },
}

impl ToolMessage {
    pub fn text(s: impl Into<String>) -> Self {
        ToolMessage::Text { text: s.into() }
    }

    pub fn blob(data: Vec<u8>, mime_type: impl Into<String>, filename: impl Into<String>) -> Self {
        ToolMessage::Blob {
            data,
            meta: BlobMeta {
                mime_type: mime_type.into(),
                filename: filename.into(),
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ToolMessage::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, ToolMessage::Blob { .. })
    }
}

/// Per-image entry of the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 1-indexed position of the source file in the request.
    pub file_index: usize,
    /// 1-indexed page number within that file.
    pub page_number: usize,
    pub filename: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
}

/// A file that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub file_index: usize,
    pub filename: String,
    pub error: String,
}

/// The JSON object that ends every successful invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionSummary {
    /// `true` when at least one image was produced.
    pub success: bool,
    pub total_images: usize,
    /// Pages of every document that was opened, rendered or not.
    pub total_pages: usize,
    pub dpi: u32,
    pub format: ImageFormat,
    pub images: Vec<ImageRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_files: Vec<FailedFile>,
}

impl ConversionSummary {
    pub fn new(options: &ConversionOptions) -> Self {
        Self {
            success: false,
            total_images: 0,
            total_pages: 0,
            dpi: options.dpi,
            format: options.format,
            images: Vec::new(),
            failed_files: Vec::new(),
        }
    }

    pub fn push_image(&mut self, record: ImageRecord) {
        self.images.push(record);
        self.total_images = self.images.len();
        self.success = true;
    }

    pub fn to_message(&self) -> ToolMessage {
        ToolMessage::Json {
            json: serde_json::to_value(self).unwrap_or_default(),
        }
    }
}

/// Everything an eager [`crate::convert::convert`] produced.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Messages in emission order, the summary included.
    pub messages: Vec<ToolMessage>,
    pub summary: ConversionSummary,
}

impl ConversionOutput {
    /// Iterate over `(meta, bytes)` of every emitted image.
    pub fn images(&self) -> impl Iterator<Item = (&BlobMeta, &[u8])> {
        self.messages.iter().filter_map(|m| match m {
            ToolMessage::Blob { data, meta } => Some((meta, data.as_slice())),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().filter_map(ToolMessage::as_text)
    }
}

mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
