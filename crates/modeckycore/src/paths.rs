//! Path validation and name normalization.
//!
//! Install paths are user supplied (typed, browsed, or guessed by the host)
//! and may point at a volume that is not mounted right now. Nothing here
//! fails on a missing path: callers get `false` and decide what to do.

use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};

/// Check whether a path exists and can be stat'ed.
///
/// Empty or otherwise unusable paths report `false` instead of an error.
pub fn exists(path: &Path) -> bool {
    if path.as_os_str().is_empty() {
        return false;
    }
    std::fs::metadata(path).is_ok()
}

/// Check whether a path is an existing directory.
pub fn is_directory(path: &Path) -> bool {
    exists(path) && path.is_dir()
}

/// Validate a candidate install path.
///
/// Fails with [`Error::InvalidPath`] unless the path is an existing directory.
pub fn validate_install_path(path: &Path) -> Result<()> {
    if is_directory(path) {
        Ok(())
    } else {
        Err(Error::InvalidPath(path.to_path_buf()))
    }
}

/// Starting directory for interactive browsing when no valid path is known.
pub fn default_browse_root() -> PathBuf {
    dirs::home_dir()
        .filter(|home| is_directory(home))
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Normalize a display name into a stable lookup key
/// (NFC normalized, lowercase, inner whitespace collapsed, trimmed).
pub fn normalize_title_name(name: &str) -> String {
    name.nfc()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
