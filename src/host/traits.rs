//! host::traits
//!
//! The host adapter capability set.
//!
//! # Design
//!
//! The trait is async because Bitbucket adapters talk HTTP. Capabilities a
//! host cannot offer return [`HostError::Unsupported`] instead of an empty
//! result, so callers can tell "no match" apart from "cannot ask".
//!
//! # Example
//!
//! ```
//! use got::host::{HostAdapter, HostError};
//!
//! async fn url_or_none(adapter: &dyn HostAdapter, name: &str) -> Option<String> {
//!     match adapter.resolve_clone_url(name).await {
//!         Ok(url) => Some(url),
//!         Err(HostError::NotFound(_)) => None,
//!         Err(_) => None,
//!     }
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::template::TemplateError;

/// Errors from host adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    /// The host does not serve the repository.
    #[error("not found: {0}")]
    NotFound(String),

    /// The host could not be reached.
    #[error("host unreachable: {0}")]
    Unreachable(String),

    /// Credentials were rejected or are missing.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The host type or auth mode cannot perform the operation.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The API answered with an unexpected status.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// The repository name does not fit this host's naming scheme.
    #[error("{0}")]
    InvalidName(String),

    /// The configured clone-URL template is unusable.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl HostError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, HostError::Unsupported(_))
    }
}

/// Operations every host type provides.
#[async_trait]
pub trait HostAdapter: Send + Sync {
    /// Adapter type name, for diagnostics.
    fn kind(&self) -> &'static str;

    /// The URL to clone `name` from.
    async fn resolve_clone_url(&self, name: &str) -> Result<String, HostError>;

    /// Concrete repository names matching a glob pattern, sorted.
    async fn expand_glob(&self, pattern: &str) -> Result<Vec<String>, HostError>;

    /// Check that the host is reachable with its configured credentials.
    async fn validate(&self) -> Result<(), HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_errors_convert() {
        let err: HostError = TemplateError::InvalidSpecifier {
            template: "%".into(),
            position: 0,
        }
        .into();
        assert!(err.to_string().contains("invalid format string specifier"));
        assert!(!err.is_unsupported());
        assert!(HostError::Unsupported("x".into()).is_unsupported());
    }
}
