//! Filesystem helpers for downloaded artifacts

use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// Extensions accepted for downloaded images (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "svg"];

/// Create `path` and any missing parents; no-op if it already exists
pub fn ensure_directory(path: &Path) -> E2eResult<()> {
    std::fs::create_dir_all(path).map_err(|source| E2eError::FileAccess {
        path: path.to_path_buf(),
        source,
    })
}

/// Whether the file name carries an allowed image extension
pub fn valid_extension(name: impl AsRef<Path>) -> bool {
    name.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Size of the file in bytes
pub fn file_size(path: &Path) -> E2eResult<u64> {
    std::fs::metadata(path)
        .map(|meta| meta.len())
        .map_err(|source| E2eError::FileAccess {
            path: path.to_path_buf(),
            source,
        })
}

/// Whether the file is strictly smaller than `max_bytes`
pub fn validate_file_size(path: &Path, max_bytes: u64) -> E2eResult<bool> {
    Ok(file_size(path)? < max_bytes)
}
