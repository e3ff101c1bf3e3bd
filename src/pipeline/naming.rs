//! Output filenames: `{basename}_page_{n}.{ext}`.
//!
//! Two uploads may share a name (`scan.pdf` twice). The second and later
//! ones get their 1-indexed file position appended to the basename
//! (`scan_2_page_1.png`) so every image in one invocation is unique.

use crate::config::ImageFormat;
use std::collections::HashSet;
use std::path::Path;

/// Used when an upload has no usable name.
const FALLBACK_BASENAME: &str = "document";

/// Hands out unique basenames within one invocation.
#[derive(Debug, Default)]
pub struct FileNamer {
    used: HashSet<String>,
}

impl FileNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a basename for the file at `file_index` (1-indexed).
    pub fn reserve(&mut self, filename: &str, file_index: usize) -> String {
        let base = base_name(filename);
        let mut candidate = base.clone();
        let mut n = 1;
        while self.used.contains(&candidate) {
            candidate = if n == 1 {
                format!("{base}_{file_index}")
            } else {
                format!("{base}_{file_index}_{n}")
            };
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Strip directories and the final extension from an upload name.
pub fn base_name(filename: &str) -> String {
    let last = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let stem = Path::new(last)
        .file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .unwrap_or_default();
    if stem.is_empty() {
        FALLBACK_BASENAME.to_string()
    } else {
        stem
    }
}

/// Filename of one page image; `page_number` is 1-indexed.
pub fn page_filename(base: &str, page_number: usize, format: ImageFormat) -> String {
    format!("{base}_page_{page_number}.{}", format.extension())
}
