//! secrets::file_store
//!
//! Host passwords in `<got root>/credentials.toml`.
//!
//! The file is a flat TOML table of `"<host>.password" = "..."` entries,
//! written atomically with mode 0600 on Unix.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::traits::{SecretError, SecretStore};
use crate::core::paths::GotPaths;

/// File-backed credential store.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// The store under a Got root.
    pub fn new(paths: &GotPaths) -> Self {
        Self::with_path(paths.credentials_path())
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, SecretError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| SecretError::ReadError(format!("cannot read credentials file: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| SecretError::ReadError(format!("cannot parse credentials file: {}", e)))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), SecretError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SecretError::WriteError(format!("cannot create directory: {}", e)))?;
        }

        let content = toml::to_string(entries)
            .map_err(|e| SecretError::WriteError(format!("cannot serialize credentials: {}", e)))?;

        let temp_path = self.path.with_extension("toml.tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| SecretError::WriteError(format!("cannot create temp file: {}", e)))?;

            // Restrict before any secret hits the disk.
            #[cfg(unix)]
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| SecretError::WriteError(format!("cannot set permissions: {}", e)))?;

            file.write_all(content.as_bytes())
                .map_err(|e| SecretError::WriteError(format!("cannot write credentials: {}", e)))?;
            file.sync_all()
                .map_err(|e| SecretError::WriteError(format!("cannot sync to disk: {}", e)))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| SecretError::WriteError(format!("cannot rename temp file: {}", e)))
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_all(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, FileSecretStore) {
        let temp = TempDir::new().expect("create temp dir");
        let store = FileSecretStore::new(&GotPaths::new(temp.path().to_path_buf()));
        (temp, store)
    }

    #[test]
    fn lives_under_got_root() {
        let (temp, store) = create_test_store();
        assert_eq!(store.path(), &temp.path().join("credentials.toml"));
    }

    #[test]
    fn missing_key_is_none() {
        let (_temp, store) = create_test_store();
        assert!(store.get("bb.password").expect("get").is_none());
        assert!(!store.exists("bb.password").expect("exists"));
    }

    #[test]
    fn set_get_overwrite() {
        let (_temp, store) = create_test_store();
        store.set("bb.password", "first").expect("set");
        store.set("bb.password", "second").expect("set");
        store.set("other.password", "x").expect("set");

        assert_eq!(store.get("bb.password").expect("get").as_deref(), Some("second"));
        assert_eq!(store.get("other.password").expect("get").as_deref(), Some("x"));
    }

    #[test]
    fn delete_is_idempotent() {
        let (_temp, store) = create_test_store();
        store.set("bb.password", "pw").expect("set");
        store.delete("bb.password").expect("delete");
        store.delete("bb.password").expect("delete again");
        assert!(store.get("bb.password").expect("get").is_none());
    }

    #[test]
    fn values_with_quotes_survive() {
        let (_temp, store) = create_test_store();
        let tricky = "p\"a=ss\nword";
        store.set("bb.password", tricky).expect("set");
        assert_eq!(store.get("bb.password").expect("get").as_deref(), Some(tricky));
    }

    #[cfg(unix)]
    #[test]
    fn file_mode_is_0600() {
        let (_temp, store) = create_test_store();
        store.set("bb.password", "pw").expect("set");
        let mode = fs::metadata(store.path()).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn corrupt_file_reports_parse_failure() {
        let (_temp, store) = create_test_store();
        fs::write(store.path(), "broken = [").expect("write");
        let err = store.get("bb.password").unwrap_err();
        assert!(err.to_string().contains("cannot parse"));
    }
}
