use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::{Builder, NamedTempFile};
use tracing::debug;

use crate::consts::SCRATCH_LIST_PREFIX;
use crate::error::Result;

/// Where per-invocation scratch lists are created.
#[derive(Clone, Debug, Default)]
pub struct ScratchSpace {
    dir: Option<PathBuf>,
}

impl ScratchSpace {
    /// `None` uses the system temporary directory.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Write `entries` to a fresh, uniquely named list file.
    pub fn list(&self, entries: &[PathBuf]) -> Result<FileList> {
        let mut builder = Builder::new();
        builder.prefix(SCRATCH_LIST_PREFIX).suffix(".lst");
        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        for entry in entries {
            writeln!(file, "{}", entry.display())?;
        }
        file.flush()?;

        debug!(path = %file.path().display(), entries = entries.len(), "Scratch list created");
        Ok(FileList {
            inner: Arc::new(ListFile {
                file,
                entries: entries.to_vec(),
            }),
        })
    }
}

struct ListFile {
    file: NamedTempFile,
    entries: Vec<PathBuf>,
}

/// A scratch file listing image paths, one per line.
///
/// Cloning shares the same file. The file is deleted when the last clone is
/// dropped, whether the engine call succeeded, failed or unwound.
#[derive(Clone)]
pub struct FileList {
    inner: Arc<ListFile>,
}

impl FileList {
    /// Location of the list file itself.
    pub fn path(&self) -> &Path {
        self.inner.file.path()
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.inner.entries
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

impl std::fmt::Debug for FileList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileList")
            .field("path", &self.path())
            .field("entries", &self.len())
            .finish()
    }
}

/// Read a list file back into paths, skipping blank lines.
pub fn read_list(path: &Path) -> Result<Vec<PathBuf>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect())
}
