use anyhow::{Result, Context, anyhow};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        }
        Ok(())
    }

    /// Read a UTF-8 text file, tolerating a byte order mark
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
        String::from_utf8(bytes.to_vec())
            .map_err(|e| anyhow!("File is not valid UTF-8: {} ({})", path.display(), e))
    }

    /// Write bytes so that readers see either the old file or the complete new one.
    ///
    /// The content goes to a temporary file in the destination directory which
    /// is then renamed over the target.
    pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_dir(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
        temp.write_all(bytes)?;
        temp.flush()?;
        temp.persist(path)
            .map_err(|e| anyhow!("Failed to persist {}: {}", path.display(), e.error))?;

        Ok(())
    }

    /// Make an identifier safe to use as a file name
    pub fn sanitize_file_name(name: &str) -> String {
        let sanitized: String = name
            .trim()
            .chars()
            .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();

        let sanitized = sanitized.trim_matches('.').to_string();
        if sanitized.is_empty() {
            "untitled".to_string()
        } else {
            sanitized
        }
    }
}
