//! host::daemon
//!
//! Plain git servers addressed by URL.
//!
//! A daemon host has no API. The clone URL is `<url>/<name>` unless a
//! template is configured, and a failed clone is the only signal that the
//! repository does not exist.

use async_trait::async_trait;

use super::traits::{HostAdapter, HostError};
use crate::registry::Host;

#[derive(Debug, Clone)]
pub struct DaemonHost {
    host: Host,
}

impl DaemonHost {
    pub fn new(host: &Host) -> Result<Self, HostError> {
        host.clone_url_template()?;
        Ok(Self { host: host.clone() })
    }
}

#[async_trait]
impl HostAdapter for DaemonHost {
    fn kind(&self) -> &'static str {
        "daemon"
    }

    async fn resolve_clone_url(&self, name: &str) -> Result<String, HostError> {
        match self.host.templated_clone_url(name)? {
            Some(url) => Ok(url),
            None => Ok(format!("{}/{}", self.host.url, name)),
        }
    }

    async fn expand_glob(&self, _pattern: &str) -> Result<Vec<String>, HostError> {
        Err(HostError::Unsupported(format!(
            "daemon host '{}' cannot list repositories",
            self.host.name
        )))
    }

    async fn validate(&self) -> Result<(), HostError> {
        Err(HostError::Unsupported(format!(
            "daemon host '{}' has nothing to validate against",
            self.host.name
        )))
    }
}
