use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::BlobError;
use crate::traits::{BlobMeta, BlobStore};

/// BlobStore backed by the local filesystem.
///
/// Key `EQU-0000001/Fotos/frente.jpg` maps to
/// `{base_dir}/EQU-0000001/Fotos/frente.jpg`.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed.
    pub fn open(base_dir: &Path) -> Result<Self, BlobError> {
        fs::create_dir_all(base_dir)?;
        debug!(path = %base_dir.display(), "opened file blob store");
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
        })
    }

    /// Map a key to a path under `base_dir`.
    ///
    /// Every component must be a plain name: no `..`, `.`, roots or drive
    /// prefixes. The empty key is the root itself.
    fn resolve(&self, key: &str) -> Result<PathBuf, BlobError> {
        if key.contains('\\') {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        let rel = Path::new(key);
        for component in rel.components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(BlobError::InvalidKey(key.to_string()));
            }
        }
        Ok(self.base_dir.join(rel))
    }

    fn key_of(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.base_dir).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    fn walk(&self, dir: &Path, out: &mut Vec<BlobMeta>) -> Result<(), BlobError> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.walk(&path, out)?;
            } else if file_type.is_file() {
                if let Some(key) = self.key_of(&path) {
                    out.push(BlobMeta {
                        key,
                        size: entry.metadata()?.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl BlobStore for FileStore {
    fn put(&self, key: &str, data: &[u8]) -> Result<(), BlobError> {
        if key.is_empty() {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let path = self.resolve(key)?;
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read(&path)?))
    }

    fn create_dir(&self, key: &str) -> Result<(), BlobError> {
        let path = self.resolve(key)?;
        fs::create_dir_all(&path)?;
        Ok(())
    }

    fn dir_exists(&self, key: &str) -> Result<bool, BlobError> {
        Ok(self.resolve(key)?.is_dir())
    }

    fn children(&self, key: &str) -> Result<Vec<String>, BlobError> {
        let dir = self.resolve(key)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn list(&self, key: &str) -> Result<Vec<BlobMeta>, BlobError> {
        let dir = self.resolve(key)?;
        let mut results = Vec::new();
        if dir.is_dir() {
            self.walk(&dir, &mut results)?;
        }
        results.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(results)
    }
}
