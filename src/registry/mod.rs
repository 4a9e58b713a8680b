//! registry
//!
//! Persistent host and clone registries.
//!
//! # Modules
//!
//! - [`model`] - Host and clone record types
//! - [`hosts`] - Ordered host registry
//! - [`clones`] - Clone registry keyed by `(host, name)`
//! - `store` - The [`Store`] handle and its backends
//!
//! Both registries live in one document so a single flush keeps them
//! consistent with each other.

pub mod clones;
pub mod hosts;
pub mod model;
mod store;

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::HostName;

pub use clones::CloneRegistry;
pub use hosts::HostRegistry;
pub use model::{password_key, CloneRecord, Host, HostUpdate};
pub use store::{FileBackend, MemoryBackend, RegistryData, Store, StoreBackend, REGISTRY_VERSION};

/// Errors from the registry store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read registry {path}: {message}")]
    ReadFailed { path: PathBuf, message: String },

    #[error("failed to parse registry {path}: {message}")]
    ParseFailed { path: PathBuf, message: String },

    #[error("failed to write registry {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },

    #[error("host '{name}' already exists (url: {url})")]
    DuplicateHost { name: HostName, url: String },

    #[error("unknown host: {0}")]
    UnknownHost(HostName),
}
