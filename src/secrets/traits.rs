//! secrets::traits
//!
//! Credential storage trait.
//!
//! Keys are `<host>.password`; see [`crate::registry::password_key`].
//! Implementations never put a secret value in a log line or error message.

use thiserror::Error;

/// Errors from credential storage. Messages never contain secret values.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to read credentials: {0}")]
    ReadError(String),

    #[error("failed to write credentials: {0}")]
    WriteError(String),

    #[error("failed to delete credential: {0}")]
    DeleteError(String),

    #[error("credential provider not available: {0}")]
    ProviderNotAvailable(String),
}

/// Key-value storage for host passwords.
pub trait SecretStore: Send + Sync {
    /// Returns `Ok(None)` when the key has no value.
    fn get(&self, key: &str) -> Result<Option<String>, SecretError>;

    /// Store a value, overwriting any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), SecretError>;

    /// Remove a value. Deleting a missing key succeeds.
    fn delete(&self, key: &str) -> Result<(), SecretError>;

    fn exists(&self, key: &str) -> Result<bool, SecretError> {
        Ok(self.get(key)?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_operation() {
        assert!(SecretError::ReadError("x".into()).to_string().contains("read"));
        assert!(SecretError::WriteError("x".into()).to_string().contains("write"));
        assert!(SecretError::DeleteError("x".into()).to_string().contains("delete"));
        assert!(SecretError::ProviderNotAvailable("x".into())
            .to_string()
            .contains("provider"));
    }
}
