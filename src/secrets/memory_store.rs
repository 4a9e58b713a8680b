//! secrets::memory_store

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::{SecretError, SecretStore};

/// In-memory credential store. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, SecretError> {
        self.entries
            .lock()
            .map_err(|_| SecretError::ReadError("credential map poisoned".into()))
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let store = MemorySecretStore::new();
        let other = store.clone();
        store.set("h.password", "pw").unwrap();
        assert_eq!(other.get("h.password").unwrap().as_deref(), Some("pw"));
        other.delete("h.password").unwrap();
        assert!(!store.exists("h.password").unwrap());
    }
}
