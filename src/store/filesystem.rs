//! Filesystem-backed blob store: one file per key under a base directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{LwM2MError, Result};

use super::path::escape_for_filesystem;
use super::BlobStore;

#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o700;

/// Stores each key as a single file named after its escaped path, under a
/// configured base directory created on demand with owner-only permissions.
#[derive(Debug)]
pub struct FilesystemStore {
    base_dir: PathBuf,
}

impl FilesystemStore {
    /// Open (creating if necessary) a store rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        ensure_dir(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(escape_for_filesystem(key))
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(DIR_MODE))?;
    }
    Ok(())
}

impl BlobStore for FilesystemStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        match fs::read(self.file_path(key)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(LwM2MError::NotFound(key.to_string())),
            Err(e) => Err(LwM2MError::StoreError(e.to_string())),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        ensure_dir(&self.base_dir)?;
        let path = self.file_path(key);
        fs::write(&path, value).map_err(|e| LwM2MError::StoreError(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(FILE_MODE))
                .map_err(|e| LwM2MError::StoreError(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_on_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).unwrap();
        assert!(matches!(store.get("/0/0/0"), Err(LwM2MError::NotFound(_))));
    }

    #[test]
    fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path().join("nested")).unwrap();
        store.put("/0/0/0", b"hello").unwrap();
        assert_eq!(store.get("/0/0/0").unwrap(), b"hello");
    }

    #[test]
    fn key_is_escaped_to_a_flat_filename() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).unwrap();
        store.put("/1/2/3", b"x").unwrap();
        assert!(dir.path().join("_1_2_3").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn put_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).unwrap();
        store.put("/0/0/3", b"cert-der").unwrap();

        let mode = fs::metadata(dir.path().join("_0_0_3")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
