/*!
 * Storage for finished timeline documents.
 *
 * The assembler only produces bytes; a `DocumentStore` decides where they
 * live. The same identifier always maps to the same location, and a document
 * is never visible half-written.
 */

use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;

/// Destination for rendered documents
pub trait DocumentStore: Send + Sync {
    /// Store `bytes` under `identifier` and return where they ended up
    fn write(&self, identifier: &str, bytes: &[u8]) -> Result<PathBuf>;

    /// Location an identifier maps to, without writing anything
    fn location(&self, identifier: &str) -> PathBuf;
}

/// Stores documents as `<root>/<identifier>.vtt`
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentStore for FileStore {
    fn write(&self, identifier: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.location(identifier);
        FileManager::write_atomic(&path, bytes)?;
        info!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    fn location(&self, identifier: &str) -> PathBuf {
        self.root
            .join(format!("{}.vtt", FileManager::sanitize_file_name(identifier)))
    }
}
