//! engine::errors
//!
//! The unified error type for resolution, traversal and command running.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::repospec::RepospecError;
use crate::core::template::TemplateError;
use crate::core::types::HostName;
use crate::git::GitError;
use crate::host::HostError;
use crate::registry::StoreError;
use crate::secrets::SecretError;

/// One host's answer during a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAttempt {
    pub host: HostName,
    pub error: HostError,
}

impl fmt::Display for HostAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.host, self.error)
    }
}

fn render_attempts(attempts: &[HostAttempt]) -> String {
    if attempts.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = attempts.iter().map(|a| format!("\n  {a}")).collect();
    lines.concat()
}

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum GotError {
    #[error("invalid repospec: {0}")]
    MalformedRepospec(String),

    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("unknown host: {0}")]
    UnknownHost(HostName),

    #[error("no hosts registered")]
    NoHosts,

    /// Every host rejected the repository. Each rejection is listed.
    #[error("no host has a repository named '{repospec}'{}", render_attempts(attempts))]
    RepositoryNotFound {
        repospec: String,
        attempts: Vec<HostAttempt>,
    },

    #[error("host '{host}' is unreachable: {reason}")]
    HostUnreachable { host: HostName, reason: String },

    #[error("{host}: {source}")]
    Host {
        host: HostName,
        #[source]
        source: HostError,
    },

    #[error("host '{host}' cannot {operation}: {reason}")]
    UnsupportedCapability {
        host: HostName,
        operation: String,
        reason: String,
    },

    #[error("'{repospec}' is served by more than one host: {}", join_hosts(hosts))]
    AmbiguousHost {
        repospec: String,
        hosts: Vec<HostName>,
    },

    #[error("cannot deduce the host of '{repospec}': {reason}")]
    HostDeductionFailed { repospec: String, reason: String },

    #[error("'{name}' has local clones from more than one host ({}); specify the host", join_hosts(hosts))]
    AmbiguousClone { name: String, hosts: Vec<HostName> },

    #[error("{0}")]
    Fatal(String),

    /// The filesystem and the registry disagree after a failed update.
    #[error("{action} succeeded but the registry was not updated: {reason}")]
    PartialState { action: String, reason: String },

    #[error("{repospec}: command failed{}", status.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    CommandFailed {
        repospec: String,
        status: Option<i32>,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

fn join_hosts(hosts: &[HostName]) -> String {
    hosts
        .iter()
        .map(HostName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl GotError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        GotError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn host(host: &HostName, source: HostError) -> Self {
        GotError::Host {
            host: host.clone(),
            source,
        }
    }
}

impl From<RepospecError> for GotError {
    fn from(err: RepospecError) -> Self {
        match err {
            RepospecError::FileNotFound { path } => GotError::FileNotFound { path },
            other => GotError::MalformedRepospec(other.to_string()),
        }
    }
}
