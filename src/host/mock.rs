//! host::mock
//!
//! Deterministic in-memory host for tests.
//!
//! # Example
//!
//! ```
//! use got::host::mock::{MockHost, MockOperation};
//! use got::host::HostAdapter;
//!
//! # tokio_test::block_on(async {
//! let host = MockHost::new().with_repo("proj/repo", "git://h/proj/repo");
//! assert_eq!(host.resolve_clone_url("proj/repo").await.unwrap(), "git://h/proj/repo");
//! assert!(host.resolve_clone_url("proj/other").await.is_err());
//! assert_eq!(host.operations().len(), 2);
//! # });
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::factory::AdapterFactory;
use super::traits::{HostAdapter, HostError};
use crate::core::types::HostName;
use crate::registry::Host;

/// Mock host. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    inner: Arc<Mutex<MockHostInner>>,
}

#[derive(Debug, Default)]
struct MockHostInner {
    /// name -> clone URL
    repos: BTreeMap<String, String>,
    fail_with: Option<HostError>,
    globs_supported: bool,
    operations: Vec<MockOperation>,
}

/// Recorded adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ResolveCloneUrl(String),
    ExpandGlob(String),
    Validate,
}

impl MockHost {
    pub fn new() -> Self {
        let host = Self::default();
        host.update(|inner| inner.globs_supported = true);
        host
    }

    /// Serve `name` at `url`.
    pub fn with_repo(self, name: &str, url: &str) -> Self {
        self.update(|inner| {
            inner.repos.insert(name.to_string(), url.to_string());
        });
        self
    }

    /// Fail every operation with `err`.
    pub fn failing(self, err: HostError) -> Self {
        self.update(|inner| inner.fail_with = Some(err));
        self
    }

    /// Make `expand_glob` report unsupported.
    pub fn without_globs(self) -> Self {
        self.update(|inner| inner.globs_supported = false);
        self
    }

    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner
            .lock()
            .map(|inner| inner.operations.clone())
            .unwrap_or_default()
    }

    pub fn clear_operations(&self) {
        self.update(|inner| inner.operations.clear());
    }

    fn update(&self, f: impl FnOnce(&mut MockHostInner)) {
        if let Ok(mut inner) = self.inner.lock() {
            f(&mut inner);
        }
    }

    fn record(&self, op: MockOperation) -> Result<(), HostError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| HostError::Unreachable("mock poisoned".into()))?;
        inner.operations.push(op);
        match &inner.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl HostAdapter for MockHost {
    fn kind(&self) -> &'static str {
        "mock"
    }

    async fn resolve_clone_url(&self, name: &str) -> Result<String, HostError> {
        self.record(MockOperation::ResolveCloneUrl(name.to_string()))?;
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.repos.get(name).cloned())
            .ok_or_else(|| HostError::NotFound(name.to_string()))
    }

    async fn expand_glob(&self, pattern: &str) -> Result<Vec<String>, HostError> {
        self.record(MockOperation::ExpandGlob(pattern.to_string()))?;
        let inner = self
            .inner
            .lock()
            .map_err(|_| HostError::Unreachable("mock poisoned".into()))?;
        if !inner.globs_supported {
            return Err(HostError::Unsupported("mock host without listing".into()));
        }
        let matcher = glob::Pattern::new(pattern)
            .map_err(|e| HostError::InvalidName(e.to_string()))?;
        let options = glob::MatchOptions {
            require_literal_separator: true,
            ..Default::default()
        };
        Ok(inner
            .repos
            .keys()
            .filter(|name| matcher.matches_with(name, options))
            .cloned()
            .collect())
    }

    async fn validate(&self) -> Result<(), HostError> {
        self.record(MockOperation::Validate)
    }
}

/// Hands out [`MockHost`]s by host name.
#[derive(Debug, Clone, Default)]
pub struct MockAdapterFactory {
    hosts: HashMap<HostName, MockHost>,
}

impl MockAdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, name: &str, host: MockHost) -> Self {
        if let Ok(name) = HostName::new(name) {
            self.hosts.insert(name, host);
        }
        self
    }

    pub fn host(&self, name: &str) -> Option<&MockHost> {
        HostName::new(name).ok().and_then(|n| self.hosts.get(&n))
    }
}

impl AdapterFactory for MockAdapterFactory {
    fn create(&self, host: &Host) -> Result<Box<dyn HostAdapter>, HostError> {
        let mock = self.hosts.get(&host.name).cloned().unwrap_or_default();
        Ok(Box::new(mock))
    }
}
