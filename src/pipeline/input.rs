//! Input resolution: turn a [`FileRef`] into the bytes of a PDF.
//!
//! Uploaded files reach the tool in different shapes depending on the host:
//! sometimes inline, sometimes as a path on a shared volume, sometimes only
//! as a URL on the host's file service. The resolver walks an ordered chain
//! and records every miss so a failure explains exactly what was tried:
//!
//! 1. inline `data`
//! 2. for each of `path`, `url`:
//!    * absolute http(s) URL → fetch
//!    * anything else → read as a local path, and if it is server-relative
//!      (`/files/…`) also fetch it from the configured `files_base_url`
//!
//! Documents are kept in memory; pdfium opens them from a byte slice.

use crate::config::ConversionConfig;
use crate::error::{AccessAttempt, FileAccessError, FileError, Pdf2ImagesError};
use crate::request::FileRef;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How far into the file a `%PDF-` header may start.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// A path meant to be served by the host's file endpoint, e.g.
/// `/files/3f2a/file-preview?timestamp=…`.
pub fn is_server_relative(input: &str) -> bool {
    input.starts_with('/') && !input.starts_with("//")
}

/// Resolves file references to bytes.
pub struct FileResolver {
    client: reqwest::Client,
    base_url: Option<Url>,
    timeout_secs: u64,
}

impl FileResolver {
    /// Build a resolver with its own HTTP client.
    pub fn new(config: &ConversionConfig) -> Result<Self, Pdf2ImagesError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pdf-to-images/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()
            .map_err(|e| Pdf2ImagesError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Build a resolver around an existing client (custom TLS, proxies…).
    pub fn with_client(client: reqwest::Client, config: &ConversionConfig) -> Self {
        Self {
            client,
            base_url: config.files_base_url.clone(),
            timeout_secs: config.download_timeout_secs,
        }
    }

    /// Produce the file's bytes or the full list of failed attempts.
    pub async fn resolve(&self, file: &FileRef) -> Result<Vec<u8>, FileAccessError> {
        let mut attempts: Vec<AccessAttempt> = Vec::new();

        if let Some(ref data) = file.data {
            if !data.is_empty() {
                debug!("{}: using inline blob ({} bytes)", file.filename, data.len());
                return Ok(data.clone());
            }
            attempts.push(attempt("blob", "", "blob is empty"));
        }

        let references = [file.path.as_deref(), file.url.as_deref()];
        for reference in references.into_iter().flatten().map(str::trim) {
            if reference.is_empty() {
                continue;
            }

            if is_url(reference) {
                match self.fetch(reference).await {
                    Ok(bytes) => return Ok(bytes),
                    Err(e) => {
                        warn!("{}: download from {} failed: {}", file.filename, reference, e);
                        attempts.push(attempt("url", reference, e));
                    }
                }
                continue;
            }

            match tokio::fs::read(reference).await {
                Ok(bytes) if !bytes.is_empty() => {
                    debug!("{}: read {} bytes from {}", file.filename, bytes.len(), reference);
                    return Ok(bytes);
                }
                Ok(_) => attempts.push(attempt("path", reference, "file is empty")),
                Err(e) => attempts.push(attempt("path", reference, e.to_string())),
            }

            if is_server_relative(reference) {
                match self.base_url {
                    Some(ref base) => {
                        let url = join_base(base, reference);
                        match self.fetch(&url).await {
                            Ok(bytes) => {
                                info!("{}: fetched via file endpoint {}", file.filename, url);
                                return Ok(bytes);
                            }
                            Err(e) => {
                                warn!("{}: file endpoint {} failed: {}", file.filename, url, e);
                                attempts.push(attempt("base_url", &url, e));
                            }
                        }
                    }
                    None => attempts.push(attempt(
                        "base_url",
                        reference,
                        "no file-retrieval endpoint configured",
                    )),
                }
            }
        }

        let last_error = attempts
            .last()
            .map(|a| a.error.clone())
            .unwrap_or_else(|| "no blob, path or url was provided".to_string());

        Err(FileAccessError {
            filename: file.filename.clone(),
            attempts,
            last_error,
        })
    }

    /// GET a URL; only a 2xx with a non-empty body counts.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                format!("timed out after {}s", self.timeout_secs)
            } else {
                e.to_string()
            }
        })?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        if bytes.is_empty() {
            return Err("empty response body".to_string());
        }
        info!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

fn attempt(method: &str, target: &str, error: impl Into<String>) -> AccessAttempt {
    AccessAttempt {
        method: method.to_string(),
        target: target.to_string(),
        error: error.into(),
    }
}

/// Append a server-relative path to the endpoint, keeping any path prefix
/// the endpoint already has.
fn join_base(base: &Url, reference: &str) -> String {
    format!("{}{}", base.as_str().trim_end_matches('/'), reference)
}

/// Verify a `%PDF-` header near the start of the buffer.
pub fn check_pdf_header(filename: &str, bytes: &[u8]) -> Result<(), FileError> {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(FileError::NotAPdf {
        filename: filename.to_string(),
        magic,
    })
}
