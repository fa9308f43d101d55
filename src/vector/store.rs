//! Loads and saves vector documents.

use std::path::{Path, PathBuf};

use tracing::info;

use super::format::VectorFile;
use crate::error::{VectorError, VectorResult};

/// File name of the vector document inside a suite directory.
pub const VECTOR_FILE_NAME: &str = "vector.json";

/// Durable storage for one suite's [`VectorFile`].
#[derive(Debug, Clone)]
pub struct VectorStore {
    path: PathBuf,
}

impl VectorStore {
    /// Store for `<dir>/vector.json`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(VECTOR_FILE_NAME) }
    }

    /// Store for an explicit document path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the file cannot be read or is not a
    /// well-formed vector document.
    pub fn load(&self) -> VectorResult<VectorFile> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| VectorError::persistence("read", &self.path, e))?;
        serde_json::from_str(&content).map_err(|e| VectorError::persistence("parse", &self.path, e))
    }

    /// Serialize the document and write it, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the document cannot be written.
    pub fn save(&self, file: &VectorFile) -> VectorResult<PathBuf> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| VectorError::persistence("create directory for", &self.path, e))?;
        }
        let json = serde_json::to_string_pretty(file)
            .map_err(|e| VectorError::persistence("serialize", &self.path, e))?;
        std::fs::write(&self.path, json)
            .map_err(|e| VectorError::persistence("write", &self.path, e))?;
        info!(path = %self.path.display(), tests = file.it.len(), "vector saved");
        Ok(self.path.clone())
    }
}
