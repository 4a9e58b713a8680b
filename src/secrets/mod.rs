//! secrets
//!
//! Storage for host passwords.
//!
//! Passwords never enter `registry.toml`. They are kept by a
//! [`SecretStore`] chosen with the `secrets.provider` config key:
//!
//! - `"file"` (default): [`FileSecretStore`] at `<got root>/credentials.toml`
//! - `"keychain"`: [`KeychainSecretStore`] (requires the `keychain` feature)
//!
//! [`MemorySecretStore`] backs tests.

mod file_store;
mod keychain_store;
mod memory_store;
mod traits;

pub use file_store::FileSecretStore;
pub use keychain_store::{KeychainSecretStore, KEYCHAIN_SERVICE};
pub use memory_store::MemorySecretStore;
pub use traits::{SecretError, SecretStore};

use crate::core::paths::GotPaths;

/// The default provider name.
pub const DEFAULT_PROVIDER: &str = "file";

/// Create the secret store for a provider name.
///
/// # Errors
///
/// [`SecretError::ProviderNotAvailable`] for unknown providers, or for
/// `"keychain"` when built without the `keychain` feature.
pub fn create_store(provider: &str, paths: &GotPaths) -> Result<Box<dyn SecretStore>, SecretError> {
    match provider {
        "file" => Ok(Box::new(FileSecretStore::new(paths))),
        "keychain" => Ok(Box::new(KeychainSecretStore::new()?)),
        other => Err(SecretError::ProviderNotAvailable(format!(
            "unknown secret provider: '{}' (valid: file, keychain)",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_provider() {
        let temp = TempDir::new().expect("temp dir");
        let store = create_store("file", &GotPaths::new(temp.path().to_path_buf())).expect("store");
        assert!(store.get("h.password").expect("get").is_none());
    }

    #[test]
    fn unknown_provider() {
        let temp = TempDir::new().expect("temp dir");
        let err = create_store("vault", &GotPaths::new(temp.path().to_path_buf()))
            .err()
            .expect("error");
        assert!(matches!(err, SecretError::ProviderNotAvailable(ref m) if m.contains("vault")));
    }

    #[cfg(not(feature = "keychain"))]
    #[test]
    fn keychain_without_feature() {
        let temp = TempDir::new().expect("temp dir");
        let err = create_store("keychain", &GotPaths::new(temp.path().to_path_buf()))
            .err()
            .expect("error");
        assert!(err.to_string().contains("not enabled"));
    }
}
