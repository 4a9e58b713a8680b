//! core::lock
//!
//! Exclusive lock on the Got registry.
//!
//! # Architecture
//!
//! Exactly one Got process reads and writes the registry at a time. The
//! lock is an OS-level exclusive lock (`fs2`) on `<got root>/lock`, held
//! for the whole invocation and released on drop.
//!
//! The credential helper mode runs while the parent `got` already holds
//! the lock (git asks for a password during a clone) and never takes it.
//!
//! # Example
//!
//! ```ignore
//! use got::core::lock::RegistryLock;
//!
//! let lock = RegistryLock::acquire_blocking(&paths)?;
//! // ... read and write the registry ...
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::GotPaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("registry is locked by another got process")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive lock on the registry.
///
/// The lock is released when this guard is dropped.
#[derive(Debug)]
pub struct RegistryLock {
    file: File,
}

impl RegistryLock {
    fn open(paths: &GotPaths) -> Result<File, LockError> {
        let root = paths.root();
        fs::create_dir_all(root).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", root.display(), e))
        })?;

        let path = paths.lock_path();
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e)))
    }

    /// Attempt to acquire the lock without waiting.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(paths: &GotPaths) -> Result<Self, LockError> {
        let file = Self::open(paths)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { file }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Acquire the lock, waiting for another process to release it.
    pub fn acquire_blocking(paths: &GotPaths) -> Result<Self, LockError> {
        match Self::acquire(paths) {
            Err(LockError::AlreadyLocked) => {
                log::warn!("waiting for lock on {}", paths.lock_path().display());
                let file = Self::open(paths)?;
                file.lock_exclusive()
                    .map_err(|e| LockError::AcquireFailed(e.to_string()))?;
                Ok(Self { file })
            }
            other => other,
        }
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
