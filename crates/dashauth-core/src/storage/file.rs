use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use super::Storage;

/// Extension of value files in the storage directory
const VALUE_EXT: &str = "json";

/// Prefix of in-flight writes; each write gets its own file, renamed into place once complete
const TEMP_PREFIX: &str = ".pending-";

/// Storage scope backed by a directory, one file per key.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create storage directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keys map straight to file names, so they must not contain path syntax.
    fn is_valid_key(key: &str) -> bool {
        !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    }

    fn item_path(&self, key: &str) -> Result<PathBuf> {
        if !Self::is_valid_key(key) {
            bail!("Invalid storage key: {:?}", key);
        }
        Ok(self.dir.join(format!("{}.{}", key, VALUE_EXT)))
    }

    fn key_of(path: &Path) -> Option<String> {
        if path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXT) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        Self::is_valid_key(stem).then(|| stem.to_string())
    }

    fn remove_path(path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove storage file"),
        }
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let path = match self.item_path(key) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Rejected storage read");
                return None;
            }
        };
        match fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read storage file");
                None
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.item_path(key)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)
            .with_context(|| format!("Failed to create storage file for key {}", key))?;
        tmp.write_all(value.as_bytes())
            .and_then(|_| tmp.flush())
            .with_context(|| format!("Failed to write storage file for key {}", key))?;
        // Dropping the temp file on error removes it
        tmp.persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to commit storage file for key {}", key))?;
        debug!(key = key, "Storage item written");
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        match self.item_path(key) {
            Ok(path) => Self::remove_path(&path),
            Err(e) => warn!(error = %e, "Rejected storage removal"),
        }
    }

    fn keys(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to list storage directory");
                return Vec::new();
            }
        };
        let mut keys: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| Self::key_of(&entry.path()))
            .collect();
        keys.sort();
        keys
    }

    fn clear(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to list storage directory");
                return;
            }
        };
        let mut removed = 0usize;
        for entry in entries.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            // In-flight writes of other callers are left alone
            let is_ours = path.extension().and_then(|e| e.to_str()) == Some(VALUE_EXT);
            if is_ours && path.is_file() {
                Self::remove_path(&path);
                removed += 1;
            }
        }
        debug!(removed, "Storage scope cleared");
    }
}
