use std::fs;
use std::path::{Path, PathBuf};

use crate::consts::FITS_EXTENSIONS;
use crate::error::Result;

/// Whether `path` carries one of the recognized FITS extensions.
pub fn is_fits_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FITS_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Recursively list FITS files under a night directory, sorted by path.
pub fn find_fits_files(night_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![night_dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_fits_file(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Night identifier: the final component of the night directory.
pub fn night_id(night_dir: &Path) -> String {
    night_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| night_dir.display().to_string())
}

/// True when `dir` is missing or has no entries.
pub fn is_empty_dir(dir: &Path) -> Result<bool> {
    if !dir.exists() {
        return Ok(true);
    }
    Ok(fs::read_dir(dir)?.next().is_none())
}
