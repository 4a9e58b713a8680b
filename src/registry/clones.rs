//! registry::clones
//!
//! In-memory view of registered clones, keyed by `(host, name)`.

use std::path::Path;

use super::model::CloneRecord;
use crate::core::types::{HostName, RepoKey};

/// Registered clones. At most one record per [`RepoKey`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneRegistry {
    records: Vec<CloneRecord>,
}

impl CloneRegistry {
    pub fn new(records: Vec<CloneRecord>) -> Self {
        let mut registry = Self::default();
        for record in records {
            registry.upsert(record);
        }
        registry
    }

    pub fn get(&self, key: &RepoKey) -> Option<&CloneRecord> {
        self.records
            .iter()
            .find(|r| r.host == key.host && r.name == key.name)
    }

    /// All records for a repository name, across hosts.
    pub fn find_by_name(&self, name: &str) -> Vec<&CloneRecord> {
        self.records.iter().filter(|r| r.name == name).collect()
    }

    /// All records served by `host`.
    pub fn for_host<'a>(&'a self, host: &'a HostName) -> impl Iterator<Item = &'a CloneRecord> {
        self.records.iter().filter(move |r| &r.host == host)
    }

    /// Insert or replace the record with the same key.
    ///
    /// Returns the record it replaced, if any.
    pub fn upsert(&mut self, record: CloneRecord) -> Option<CloneRecord> {
        match self
            .records
            .iter_mut()
            .find(|r| r.host == record.host && r.name == record.name)
        {
            Some(slot) => Some(std::mem::replace(slot, record)),
            None => {
                self.records.push(record);
                None
            }
        }
    }

    pub fn remove(&mut self, key: &RepoKey) -> Option<CloneRecord> {
        let index = self
            .records
            .iter()
            .position(|r| r.host == key.host && r.name == key.name)?;
        Some(self.records.remove(index))
    }

    /// Find the clone whose path is `dir` or the nearest ancestor of it.
    ///
    /// Nested clones resolve to the innermost one.
    pub fn containing(&self, dir: &Path) -> Option<&CloneRecord> {
        self.records
            .iter()
            .filter(|r| dir.starts_with(&r.path))
            .max_by_key(|r| r.path.components().count())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CloneRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn into_inner(self) -> Vec<CloneRecord> {
        self.records
    }
}
