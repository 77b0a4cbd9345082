use anyhow::{Context, Result, anyhow};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Trait for the key-value blob storage the registry persists into
pub trait KeyValueStore: Send + Sync {
    /// Read the blob stored under `key`, `None` when nothing was ever written
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the blob stored under `key`
    fn set(&self, key: &str, blob: &[u8]) -> Result<()>;
}

/// Keys map to file names, so keep them to a safe character set
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(anyhow!("Invalid storage key {:?}", key))
    }
}

/// File-backed store: each key is a `<key>.bin` file inside one directory
/// Uses atomic write pattern with .tmp file for safety
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir` (created lazily on first write)
    pub fn new(dir: PathBuf) -> Self {
        FileStore { dir }
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.bin", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let path = self.path_for(key);

        // Only a missing file means "never written"; any other failure is reported
        match fs::read(&path) {
            Ok(bytes) => {
                log::debug!("Read {} bytes for {:?} from {:?}", bytes.len(), key, path);
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No stored blob for {:?} at {:?}", key, path);
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", path)),
        }
    }

    fn set(&self, key: &str, blob: &[u8]) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        let tmp_path = path.with_extension("bin.tmp");

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory {:?}", self.dir))?;

        fs::write(&tmp_path, blob)
            .with_context(|| format!("Failed to write to temporary file {:?}", tmp_path))?;

        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to rename {:?} to {:?}", tmp_path, path))?;

        log::debug!("Wrote {} bytes for {:?} to {:?}", blob.len(), key, path);
        Ok(())
    }
}

/// In-memory store, for tests and embedding without a filesystem
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys holding a blob
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(blobs.get(key).cloned())
    }

    fn set(&self, key: &str, blob: &[u8]) -> Result<()> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        blobs.insert(key.to_string(), blob.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));

        assert_eq!(store.get("vehicles").unwrap(), None);
    }

    #[test]
    fn test_file_store_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));

        store.set("vehicles", b"first").unwrap();
        store.set("vehicles", b"second").unwrap();

        assert_eq!(store.get("vehicles").unwrap(), Some(b"second".to_vec()));
        assert!(store.path_for("vehicles").exists());
        assert!(!store.path_for("vehicles").with_extension("bin.tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());

        assert!(store.set("../escape", b"x").is_err());
        assert!(store.set("a/b", b"x").is_err());
        assert!(store.get("").is_err());
        assert!(store.set("vehicles.corrupted", b"x").is_ok());
    }

    #[test]
    fn test_file_store_write_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the store directory should be
        let blocker = dir.path().join("data");
        fs::write(&blocker, b"not a directory").unwrap();
        let store = FileStore::new(blocker);

        assert!(store.set("vehicles", b"x").is_err());
    }

    #[test]
    fn test_file_store_unreadable_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the store directory should be: reads fail with
        // "not a directory" rather than "not found"
        let blocker = dir.path().join("data");
        fs::write(&blocker, b"not a directory").unwrap();
        let store = FileStore::new(blocker);

        assert!(store.get("vehicles").is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", &[1, 2, 3]).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.len(), 1);
    }
}
