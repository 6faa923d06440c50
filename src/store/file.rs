//! Directory-backed chunk storage
//!
//! Layout inside the store directory:
//!
//! ```text
//! metadata.json     manifest, written last
//! chunk_0.json      rows 0 .. chunk_size
//! chunk_1.json      ...
//! ```

use super::backend::ChunkBackend;
use crate::types::{ChunkMetadata, RebateError, StoredRebate};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const METADATA_FILE: &str = "metadata.json";
const CHUNK_PREFIX: &str = "chunk_";
const CHUNK_SUFFIX: &str = ".json";

/// Stores each chunk as a JSON file in one directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `dir`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, RebateError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(FileBackend { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn chunk_path(&self, index: usize) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", CHUNK_PREFIX, index, CHUNK_SUFFIX))
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }
}

/// Read a file, mapping "not found" to `None`
fn read_optional(path: &Path) -> Result<Option<String>, RebateError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn is_store_file(name: &str) -> bool {
    name == METADATA_FILE || (name.starts_with(CHUNK_PREFIX) && name.ends_with(CHUNK_SUFFIX))
}

impl ChunkBackend for FileBackend {
    fn write_chunk(&mut self, index: usize, rows: &[StoredRebate]) -> Result<(), RebateError> {
        let json =
            serde_json::to_string(rows).map_err(|e| RebateError::chunk_write(index, e))?;
        fs::write(self.chunk_path(index), json).map_err(|e| RebateError::chunk_write(index, e))
    }

    fn read_chunk(&self, index: usize) -> Result<Option<Vec<StoredRebate>>, RebateError> {
        match read_optional(&self.chunk_path(index))? {
            Some(content) => Ok(Some(serde_json::from_str(&content)?)),
            None => Ok(None),
        }
    }

    fn write_metadata(&mut self, metadata: &ChunkMetadata) -> Result<(), RebateError> {
        let json = serde_json::to_string_pretty(metadata).map_err(RebateError::metadata_write)?;
        fs::write(self.metadata_path(), format!("{json}\n")).map_err(RebateError::metadata_write)
    }

    fn read_metadata(&self) -> Result<Option<ChunkMetadata>, RebateError> {
        match read_optional(&self.metadata_path())? {
            Some(content) => Ok(Some(serde_json::from_str(&content)?)),
            None => Ok(None),
        }
    }

    /// Remove the manifest and every chunk file; other files are left alone
    fn clear(&mut self) -> Result<(), RebateError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(RebateError::store_clear(e)),
        };

        let mut removed = 0usize;
        for entry in entries {
            let entry = entry.map_err(RebateError::store_clear)?;
            let name = entry.file_name();
            if is_store_file(&name.to_string_lossy()) {
                fs::remove_file(entry.path()).map_err(RebateError::store_clear)?;
                removed += 1;
            }
        }
        debug!(dir = %self.dir.display(), removed, "cleared chunk store");
        Ok(())
    }
}
