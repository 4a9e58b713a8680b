//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`HostName`] - Validated host name
//! - [`RepoKey`] - Identity of a clone record, `(host, name)`
//! - [`HostKind`] - Which adapter serves a host
//! - [`OnUncloned`] - What the resolver does when no usable clone exists
//!
//! # Validation
//!
//! These types enforce validity at construction time. Host names are
//! normalized to lower case so lookups are case-insensitive.
//!
//! # Examples
//!
//! ```
//! use got::core::types::{HostName, RepoKey};
//!
//! let host = HostName::new("Corp").unwrap();
//! assert_eq!(host.as_str(), "corp");
//!
//! let key = RepoKey::new(host, "proj/lib");
//! assert_eq!(key.to_string(), "corp:proj/lib");
//!
//! assert!(HostName::new("has space").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid host name: {0}")]
    InvalidHostName(String),

    #[error("unknown host type '{0}' (valid: bitbucket, daemon)")]
    UnknownHostKind(String),
}

/// A validated host name.
///
/// Host names are non-empty and consist of ASCII letters, digits, `_`
/// and `-`. They are stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostName(String);

impl HostName {
    /// Create a new validated host name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidHostName` for empty names or names with
    /// characters outside `[A-Za-z0-9_-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::InvalidHostName(
                "host name cannot be empty".into(),
            ));
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(TypeError::InvalidHostName(format!(
                "'{name}' contains '{c}'"
            )));
        }
        Ok(Self(name.to_ascii_lowercase()))
    }

    /// Get the host name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HostName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HostName> for String {
    fn from(name: HostName) -> Self {
        name.0
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HostName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity of a clone: the serving host and the repository name.
///
/// The version pin is deliberately not part of the key; a given
/// `(host, name)` has at most one active local clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoKey {
    pub host: HostName,
    pub name: String,
}

impl RepoKey {
    pub fn new(host: HostName, name: impl Into<String>) -> Self {
        Self {
            host,
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.name)
    }
}

/// Adapter variant serving a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostKind {
    /// Bitbucket Server, queried through its REST API.
    Bitbucket,
    /// Plain git daemon (or any URL-addressable git server).
    Daemon,
}

impl HostKind {
    /// All known host kinds.
    pub fn all() -> &'static [HostKind] {
        &[HostKind::Bitbucket, HostKind::Daemon]
    }

    /// The name used in configuration and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            HostKind::Bitbucket => "bitbucket",
            HostKind::Daemon => "daemon",
        }
    }
}

impl FromStr for HostKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bitbucket" => Ok(HostKind::Bitbucket),
            "daemon" => Ok(HostKind::Daemon),
            _ => Err(TypeError::UnknownHostKind(s.to_string())),
        }
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Policy applied when a repository has no usable local clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnUncloned {
    /// Clone it and record the new path.
    #[default]
    Clone,
    /// Produce nothing; not an error.
    Skip,
    /// Fail the resolution.
    Fail,
    /// Return a sentinel path without touching the registry, disk, or network.
    Fake,
}
