//! core::paths
//!
//! Centralized path routing for Got storage locations.
//!
//! # Storage Layout
//!
//! All Got data lives under a single root directory, `$GOT_ROOT` when set
//! and `~/.got` otherwise:
//! - `config.toml` - User configuration
//! - `registry.toml` - Hosts and clone records
//! - `credentials.toml` - Host passwords (file secret provider)
//! - `lock` - Exclusive lock file
//! - `repos/` - Default clone root
//!
//! **Hard rule:** no code outside this module joins file names onto the
//! Got root.
//!
//! # Example
//!
//! ```
//! use got::core::paths::GotPaths;
//! use std::path::PathBuf;
//!
//! let paths = GotPaths::new(PathBuf::from("/home/me/.got"));
//! assert_eq!(paths.registry_path(), PathBuf::from("/home/me/.got/registry.toml"));
//! assert_eq!(paths.default_clone_root(), PathBuf::from("/home/me/.got/repos"));
//! ```

use std::path::{Path, PathBuf};

/// Environment variable overriding the Got root.
pub const GOT_ROOT_ENV: &str = "GOT_ROOT";

/// Centralized path routing for Got storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GotPaths {
    /// The Got root directory.
    pub root: PathBuf,
}

impl GotPaths {
    /// Create paths rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Locate the Got root from the environment.
    ///
    /// Returns `None` only when `$GOT_ROOT` is unset and the home
    /// directory cannot be determined.
    pub fn from_env() -> Option<Self> {
        match std::env::var_os(GOT_ROOT_ENV) {
            Some(root) if !root.is_empty() => Some(Self::new(PathBuf::from(root))),
            _ => dirs::home_dir().map(|home| Self::new(home.join(".got"))),
        }
    }

    /// Get the root directory as a Path reference.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/config.toml`
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// `<root>/registry.toml`
    pub fn registry_path(&self) -> PathBuf {
        self.root.join("registry.toml")
    }

    /// `<root>/credentials.toml`
    pub fn credentials_path(&self) -> PathBuf {
        self.root.join("credentials.toml")
    }

    /// `<root>/lock`
    pub fn lock_path(&self) -> PathBuf {
        self.root.join("lock")
    }

    /// `<root>/repos`, used when no `clone_root` is configured.
    pub fn default_clone_root(&self) -> PathBuf {
        self.root.join("repos")
    }

    /// Ensure the root directory exists.
    ///
    /// # Errors
    ///
    /// Returns an IO error if directory creation fails.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }
}
