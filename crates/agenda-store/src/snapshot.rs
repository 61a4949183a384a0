//! Scoped copies of a live store.
//!
//! A calendar client may hold its database open (and mid-write) while we read
//! it. Instead of contending for its locks, the base file and any `-wal` /
//! `-shm` side files are copied into a private temporary directory and the
//! copy is read. The directory is deleted when the [`Snapshot`] is dropped,
//! whichever way processing of the store ends.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::error::{Result, StoreError};

/// SQLite side files that carry not-yet-checkpointed state.
pub const SIDE_FILE_SUFFIXES: [&str; 2] = ["-wal", "-shm"];

const DEFAULT_FILE_NAME: &str = "store.sqlite";

/// A private copy of one store, removed on drop.
#[derive(Debug)]
pub struct Snapshot {
    dir: TempDir,
    db_path: PathBuf,
    side_files: usize,
}

impl Snapshot {
    /// Copy `source` (and its side files, if present) into a fresh temporary
    /// directory under the system temp dir, or under `parent` when given.
    ///
    /// # Errors
    /// Returns [`StoreError::Snapshot`] when the temp directory cannot be
    /// created, the base file cannot be copied, or a side file exists but
    /// cannot be copied. A missing side file is not an error.
    pub fn capture(source: &Path, parent: Option<&Path>) -> Result<Self> {
        let snapshot_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| StoreError::Snapshot { path, source }
        };

        let mut builder = tempfile::Builder::new();
        builder.prefix("agenda-snapshot-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(snapshot_err(source))?;

        let file_name = source
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(DEFAULT_FILE_NAME));
        let db_path = dir.path().join(&file_name);

        fs::copy(source, &db_path).map_err(snapshot_err(source))?;

        let mut side_files = 0;
        for suffix in SIDE_FILE_SUFFIXES {
            let side_source = with_suffix(source, suffix);
            let side_dest = with_suffix(&db_path, suffix);
            match fs::copy(&side_source, &side_dest) {
                Ok(_) => side_files += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(snapshot_err(&side_source)(e)),
            }
        }

        debug!(
            source = %source.display(),
            snapshot = %db_path.display(),
            side_files,
            "captured store snapshot"
        );

        Ok(Self {
            dir,
            db_path,
            side_files,
        })
    }

    /// Path of the copied base file.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// The temporary directory holding the copy.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// How many side files were present and copied.
    pub fn side_files(&self) -> usize {
        self.side_files
    }
}

/// `local.sqlite` + `-wal` → `local.sqlite-wal`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
