use crate::Error;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

/// Prefix that turns the key of an original artifact into the key of its signed copy.
pub const SIGNED_PREFIX: &str = "signed-";

pub fn signed_key(filename: &str) -> String {
    format!("{}{}", SIGNED_PREFIX, filename)
}

/// Raw PDF bytes, stored per user under an opaque key.
pub trait ArtifactStore: Send + Sync {
    /// `Ok(None)` when there is no artifact under this key.
    fn read(&self, user_id: &str, key: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Create or replace the artifact.
    fn write(&self, user_id: &str, key: &str, bytes: &[u8]) -> Result<(), Error>;

    /// Returns `false` when there was nothing to delete.
    fn delete(&self, user_id: &str, key: &str) -> Result<bool, Error>;

    fn exists(&self, user_id: &str, key: &str) -> Result<bool, Error>;
}

/// Keys and user ids become path components, so they must not be able to escape the root.
fn check_component(value: &str, what: &str) -> Result<(), Error> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(Error::StorageFailure(format!(
            "{} `{}` is not a valid storage key",
            what, value
        )));
    }
    Ok(())
}

/// Stores artifacts as files: `<root>/<user_id>/<key>`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsArtifactStore { root: root.into() }
    }

    pub fn path_of(&self, user_id: &str, key: &str) -> Result<PathBuf, Error> {
        check_component(user_id, "user id")?;
        check_component(key, "key")?;
        Ok(self.root.join(user_id).join(key))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn read(&self, user_id: &str, key: &str) -> Result<Option<Vec<u8>>, Error> {
        match fs::read(self.path_of(user_id, key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, user_id: &str, key: &str, bytes: &[u8]) -> Result<(), Error> {
        let path = self.path_of(user_id, key)?;
        if let Some(user_dir) = path.parent() {
            fs::create_dir_all(user_dir)?;
        }
        // Readers never see a half written file.
        let tmp_path = path.with_file_name(format!(".{}.tmp", key));
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn delete(&self, user_id: &str, key: &str) -> Result<bool, Error> {
        match fs::remove_file(self.path_of(user_id, key)?) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn exists(&self, user_id: &str, key: &str) -> Result<bool, Error> {
        Ok(self.path_of(user_id, key)?.is_file())
    }
}

/// Keeps artifacts in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    artifacts: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn artifacts(&self) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), Vec<u8>>>, Error> {
        self.artifacts
            .lock()
            .map_err(|_| Error::StorageFailure("artifact store lock poisoned".to_owned()))
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn read(&self, user_id: &str, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self
            .artifacts()?
            .get(&(user_id.to_owned(), key.to_owned()))
            .cloned())
    }

    fn write(&self, user_id: &str, key: &str, bytes: &[u8]) -> Result<(), Error> {
        self.artifacts()?
            .insert((user_id.to_owned(), key.to_owned()), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, user_id: &str, key: &str) -> Result<bool, Error> {
        Ok(self
            .artifacts()?
            .remove(&(user_id.to_owned(), key.to_owned()))
            .is_some())
    }

    fn exists(&self, user_id: &str, key: &str) -> Result<bool, Error> {
        Ok(self
            .artifacts()?
            .contains_key(&(user_id.to_owned(), key.to_owned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_key_uses_prefix() {
        assert_eq!(signed_key("1700-contract.pdf"), "signed-1700-contract.pdf");
    }

    #[test]
    fn fs_store_lays_out_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        store.write("alice", "a.pdf", b"%PDF-1.7").unwrap();
        assert!(dir.path().join("alice").join("a.pdf").is_file());
        assert_eq!(store.read("alice", "a.pdf").unwrap().unwrap(), b"%PDF-1.7");
        assert!(store.read("bob", "a.pdf").unwrap().is_none());

        store.write("alice", "a.pdf", b"replaced").unwrap();
        assert_eq!(store.read("alice", "a.pdf").unwrap().unwrap(), b"replaced");

        assert!(store.exists("alice", "a.pdf").unwrap());
        assert!(store.delete("alice", "a.pdf").unwrap());
        assert!(!store.delete("alice", "a.pdf").unwrap());
        assert!(!store.exists("alice", "a.pdf").unwrap());
    }

    #[test]
    fn fs_store_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        assert!(store.write("alice", "../escape.pdf", b"x").is_err());
        assert!(store.read("..", "a.pdf").is_err());
        assert!(store.path_of("alice", "").is_err());
    }

    #[test]
    fn in_memory_store_is_scoped_by_user() {
        let store = InMemoryArtifactStore::new();
        store.write("alice", "a.pdf", b"one").unwrap();
        assert!(store.read("bob", "a.pdf").unwrap().is_none());
        assert!(store.exists("alice", "a.pdf").unwrap());
        assert!(store.delete("alice", "a.pdf").unwrap());
        assert!(store.read("alice", "a.pdf").unwrap().is_none());
    }
}
