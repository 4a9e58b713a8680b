//! host::factory
//!
//! Adapter construction from host records.
//!
//! Engine code asks an [`AdapterFactory`] for adapters instead of naming
//! concrete host types; tests swap in [`super::mock::MockAdapterFactory`].

use super::bitbucket::BitbucketHost;
use super::daemon::DaemonHost;
use super::traits::{HostAdapter, HostError};
use crate::core::types::HostKind;
use crate::registry::Host;
use crate::secrets::SecretStore;

/// Builds the adapter for a host record.
pub trait AdapterFactory: Send + Sync {
    fn create(&self, host: &Host) -> Result<Box<dyn HostAdapter>, HostError>;
}

/// Builds real adapters, reading passwords from a secret store.
pub struct DefaultAdapterFactory {
    secrets: Box<dyn SecretStore>,
}

impl DefaultAdapterFactory {
    pub fn new(secrets: Box<dyn SecretStore>) -> Self {
        Self { secrets }
    }

    pub fn secrets(&self) -> &dyn SecretStore {
        self.secrets.as_ref()
    }
}

impl std::fmt::Debug for DefaultAdapterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultAdapterFactory").finish_non_exhaustive()
    }
}

impl AdapterFactory for DefaultAdapterFactory {
    fn create(&self, host: &Host) -> Result<Box<dyn HostAdapter>, HostError> {
        match host.kind {
            HostKind::Bitbucket => {
                let password = self.secrets.get(&host.password_key()).map_err(|e| {
                    HostError::AuthFailed(format!(
                        "cannot read password for host '{}': {}",
                        host.name, e
                    ))
                })?;
                Ok(Box::new(BitbucketHost::new(host, password)?))
            }
            HostKind::Daemon => Ok(Box::new(DaemonHost::new(host)?)),
        }
    }
}
