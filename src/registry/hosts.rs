//! registry::hosts
//!
//! In-memory view of configured hosts, in insertion order.
//!
//! Insertion order is the host search order used when a repospec does
//! not name its host, so it is preserved exactly through persistence.

use super::model::{Host, HostUpdate};
use super::StoreError;
use crate::core::types::HostName;

/// Configured hosts, unique by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostRegistry {
    hosts: Vec<Host>,
}

impl HostRegistry {
    pub fn new(hosts: Vec<Host>) -> Self {
        Self { hosts }
    }

    /// Look up a host by name.
    pub fn lookup(&self, name: &HostName) -> Option<&Host> {
        self.hosts.iter().find(|h| &h.name == name)
    }

    /// Look up a host by name, failing if it is not registered.
    pub fn get(&self, name: &HostName) -> Result<&Host, StoreError> {
        self.lookup(name)
            .ok_or_else(|| StoreError::UnknownHost(name.clone()))
    }

    pub fn contains(&self, name: &HostName) -> bool {
        self.lookup(name).is_some()
    }

    /// All hosts in insertion order.
    pub fn all(&self) -> &[Host] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Append a host.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateHost`] if the name is taken.
    pub fn insert(&mut self, host: Host) -> Result<(), StoreError> {
        if let Some(existing) = self.lookup(&host.name) {
            return Err(StoreError::DuplicateHost {
                name: host.name,
                url: existing.url.clone(),
            });
        }
        self.hosts.push(host);
        Ok(())
    }

    /// Remove a host, returning it.
    pub fn remove(&mut self, name: &HostName) -> Result<Host, StoreError> {
        let index = self
            .hosts
            .iter()
            .position(|h| &h.name == name)
            .ok_or_else(|| StoreError::UnknownHost(name.clone()))?;
        Ok(self.hosts.remove(index))
    }

    /// Apply field updates to a host in place, keeping its position.
    pub fn edit(&mut self, name: &HostName, update: &HostUpdate) -> Result<&Host, StoreError> {
        let host = self
            .hosts
            .iter_mut()
            .find(|h| &h.name == name)
            .ok_or_else(|| StoreError::UnknownHost(name.clone()))?;
        host.apply(update);
        Ok(host)
    }

    /// Replace a host record with the same name, keeping its position.
    pub fn replace(&mut self, host: Host) -> Result<(), StoreError> {
        let slot = self
            .hosts
            .iter_mut()
            .find(|h| h.name == host.name)
            .ok_or_else(|| StoreError::UnknownHost(host.name.clone()))?;
        *slot = host;
        Ok(())
    }

    pub(crate) fn into_inner(self) -> Vec<Host> {
        self.hosts
    }
}
