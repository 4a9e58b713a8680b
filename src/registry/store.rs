//! registry::store
//!
//! The persisted store handle and its storage backends.
//!
//! # Design
//!
//! [`Store`] is opened once per invocation. It loads every host and clone
//! record into memory, hands out the [`HostRegistry`] and
//! [`CloneRegistry`] views, and writes everything back on [`Store::flush`]
//! if anything was borrowed mutably.
//!
//! Backends only move whole documents:
//! - [`FileBackend`] - `registry.toml`, written atomically (temp + rename)
//! - [`MemoryBackend`] - shared in-memory document for tests
//!
//! # Example
//!
//! ```
//! use got::registry::{MemoryBackend, Store};
//!
//! let backend = MemoryBackend::new();
//! let mut store = Store::open(Box::new(backend.clone())).unwrap();
//! assert!(store.hosts().is_empty());
//! store.flush().unwrap();
//! ```

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::clones::CloneRegistry;
use super::hosts::HostRegistry;
use super::model::{CloneRecord, Host};
use super::StoreError;

/// Current on-disk format version.
pub const REGISTRY_VERSION: u32 = 1;

/// The whole persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryData {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub hosts: Vec<Host>,
    #[serde(default)]
    pub clones: Vec<CloneRecord>,
}

fn default_version() -> u32 {
    REGISTRY_VERSION
}

impl Default for RegistryData {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION,
            hosts: Vec::new(),
            clones: Vec::new(),
        }
    }
}

/// Storage for the registry document.
pub trait StoreBackend: Send + Sync + fmt::Debug {
    /// Load the document. A backend with nothing stored returns the default.
    fn load(&self) -> Result<RegistryData, StoreError>;

    /// Replace the stored document.
    fn save(&self, data: &RegistryData) -> Result<(), StoreError>;
}

/// TOML file backend.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl StoreBackend for FileBackend {
    fn load(&self) -> Result<RegistryData, StoreError> {
        if !self.path.exists() {
            return Ok(RegistryData::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| StoreError::ReadFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let data: RegistryData = toml::from_str(&content).map_err(|e| StoreError::ParseFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        if data.version > REGISTRY_VERSION {
            return Err(StoreError::ParseFailed {
                path: self.path.clone(),
                message: format!(
                    "registry version {} is newer than supported version {}",
                    data.version, REGISTRY_VERSION
                ),
            });
        }

        Ok(data)
    }

    fn save(&self, data: &RegistryData) -> Result<(), StoreError> {
        let write_err = |message: String| StoreError::WriteFailed {
            path: self.path.clone(),
            message,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| write_err(format!("cannot create directory: {}", e)))?;
        }

        let content = toml::to_string_pretty(data)
            .map_err(|e| write_err(format!("cannot serialize registry: {}", e)))?;

        let temp_path = self.path.with_extension("toml.tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| write_err(format!("cannot create temp file: {}", e)))?;

            file.write_all(content.as_bytes())
                .map_err(|e| write_err(format!("cannot write registry: {}", e)))?;

            file.sync_all()
                .map_err(|e| write_err(format!("cannot sync to disk: {}", e)))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| write_err(format!("cannot rename temp file: {}", e)))?;

        Ok(())
    }
}

/// In-memory backend. Clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    data: RegistryData,
    fail_saves: bool,
    saves: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document.
    pub fn with_data(data: RegistryData) -> Self {
        let backend = Self::default();
        if let Ok(mut inner) = backend.inner.lock() {
            inner.data = data;
        }
        backend
    }

    /// Make every subsequent save fail.
    pub fn fail_saves(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_saves = fail;
        }
    }

    /// The last saved document.
    pub fn data(&self) -> RegistryData {
        self.inner
            .lock()
            .map(|inner| inner.data.clone())
            .unwrap_or_default()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.saves).unwrap_or(0)
    }
}

impl StoreBackend for MemoryBackend {
    fn load(&self) -> Result<RegistryData, StoreError> {
        Ok(self.data())
    }

    fn save(&self, data: &RegistryData) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::WriteFailed {
            path: PathBuf::from("<memory>"),
            message: "backend lock poisoned".into(),
        })?;
        if inner.fail_saves {
            return Err(StoreError::WriteFailed {
                path: PathBuf::from("<memory>"),
                message: "save failure injected".into(),
            });
        }
        inner.data = data.clone();
        inner.saves += 1;
        Ok(())
    }
}

/// The process-wide registry handle.
#[derive(Debug)]
pub struct Store {
    backend: Box<dyn StoreBackend>,
    hosts: HostRegistry,
    clones: CloneRegistry,
    dirty: bool,
}

impl Store {
    /// Load the registry from a backend.
    pub fn open(backend: Box<dyn StoreBackend>) -> Result<Self, StoreError> {
        let data = backend.load()?;
        log::debug!(
            "opened registry: {} host(s), {} clone(s)",
            data.hosts.len(),
            data.clones.len()
        );
        Ok(Self {
            backend,
            hosts: HostRegistry::new(data.hosts),
            clones: CloneRegistry::new(data.clones),
            dirty: false,
        })
    }

    /// An empty store that is never persisted anywhere but memory.
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
            hosts: HostRegistry::default(),
            clones: CloneRegistry::default(),
            dirty: false,
        }
    }

    pub fn hosts(&self) -> &HostRegistry {
        &self.hosts
    }

    /// Mutable host view; marks the store dirty.
    pub fn hosts_mut(&mut self) -> &mut HostRegistry {
        self.dirty = true;
        &mut self.hosts
    }

    pub fn clones(&self) -> &CloneRegistry {
        &self.clones
    }

    /// Mutable clone view; marks the store dirty.
    pub fn clones_mut(&mut self) -> &mut CloneRegistry {
        self.dirty = true;
        &mut self.clones
    }

    /// Whether there are changes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Snapshot of the whole document.
    pub fn snapshot(&self) -> RegistryData {
        RegistryData {
            version: REGISTRY_VERSION,
            hosts: self.hosts.clone().into_inner(),
            clones: self.clones.clone().into_inner(),
        }
    }

    /// Write pending changes to the backend.
    ///
    /// A failed flush leaves the store dirty so a later flush retries.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        self.backend.save(&self.snapshot())?;
        self.dirty = false;
        log::debug!("registry flushed");
        Ok(())
    }
}
