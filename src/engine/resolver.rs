//! engine::resolver
//!
//! Maps repospecs to local clone paths.
//!
//! # Algorithm
//!
//! 1. A registry record for the repository wins when its path is still on
//!    disk (or missing paths are ignored). No host is contacted.
//! 2. Otherwise the `OnUncloned` policy decides: `Fake`, `Skip` and `Fail`
//!    never touch the network.
//! 3. `Clone` searches hosts in registry order until one serves the name,
//!    clones into the default (or overridden) location and records the
//!    result.
//!
//! A destination that already holds a clone of the right origin is
//! recorded as-is instead of being cloned again.
//!
//! # Example
//!
//! ```
//! use got::engine::{ResolveOptions, Resolver};
//! use got::git::MockVcs;
//! use got::host::mock::{MockAdapterFactory, MockHost};
//! use got::core::repospec::Repospec;
//! use got::core::types::{HostKind, HostName};
//! use got::registry::{Host, Store};
//!
//! # tokio_test::block_on(async {
//! let root = tempfile::TempDir::new().unwrap();
//! let mut store = Store::in_memory();
//! store
//!     .hosts_mut()
//!     .insert(Host::new(HostName::new("h").unwrap(), HostKind::Daemon, "git://h"))
//!     .unwrap();
//! let factory = MockAdapterFactory::new()
//!     .with_host("h", MockHost::new().with_repo("tools", "git://h/tools"));
//! let vcs = MockVcs::new();
//!
//! let mut resolver = Resolver::new(&mut store, &factory, &vcs, root.path().to_path_buf());
//! let spec = Repospec::parse("tools").unwrap();
//! let resolved = resolver
//!     .resolve(&spec, &ResolveOptions::default())
//!     .await
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(resolved.path, root.path().join("h").join("tools"));
//! assert_eq!(resolved.spec.to_string(), "h:tools");
//! # });
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{GotError, HostAttempt};
use crate::core::repospec::Repospec;
use crate::core::types::{HostName, OnUncloned, RepoKey};
use crate::git::Vcs;
use crate::host::{AdapterFactory, HostAdapter, HostError};
use crate::registry::{CloneRecord, Host, Store};

/// Directory prefix of the sentinel paths produced by [`OnUncloned::Fake`].
pub const FAKE_ROOT: &str = "REPO_NOT_FOUND";

/// The sentinel path for a repository that has no clone.
///
/// Deterministic per repospec and never created on disk.
pub fn fake_path(spec: &Repospec) -> PathBuf {
    Path::new(FAKE_ROOT).join(spec.to_string())
}

/// Options for [`Resolver::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    pub on_uncloned: OnUncloned,
    /// Clone here instead of the computed default.
    pub dest: Option<PathBuf>,
    /// Trust records even when their path has vanished.
    pub ignore_missing: bool,
}

impl ResolveOptions {
    pub fn with_policy(on_uncloned: OnUncloned) -> Self {
        Self {
            on_uncloned,
            ..Self::default()
        }
    }
}

/// A resolved repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Fully-qualified when a host is known; a faked spec keeps what was asked.
    pub spec: Repospec,
    pub path: PathBuf,
    /// `path` is a sentinel, not a clone.
    pub fake: bool,
}

impl Resolved {
    fn fake(spec: &Repospec) -> Self {
        Self {
            spec: spec.clone(),
            path: fake_path(spec),
            fake: true,
        }
    }

    fn from_record(record: &CloneRecord) -> Self {
        Self {
            spec: record.repospec(),
            path: record.path.clone(),
            fake: false,
        }
    }

    pub fn key(&self) -> Option<RepoKey> {
        self.spec.key()
    }
}

/// Resolution session over one registry handle.
///
/// Adapters are built lazily and cached per host for the session.
pub struct Resolver<'a> {
    store: &'a mut Store,
    factory: &'a dyn AdapterFactory,
    vcs: &'a dyn Vcs,
    clone_root: PathBuf,
    adapters: HashMap<HostName, Box<dyn HostAdapter>>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        store: &'a mut Store,
        factory: &'a dyn AdapterFactory,
        vcs: &'a dyn Vcs,
        clone_root: PathBuf,
    ) -> Self {
        Self {
            store,
            factory,
            vcs,
            clone_root,
            adapters: HashMap::new(),
        }
    }

    pub fn store(&self) -> &Store {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut *self.store
    }

    pub fn vcs(&self) -> &dyn Vcs {
        self.vcs
    }

    pub fn clone_root(&self) -> &Path {
        &self.clone_root
    }

    /// Resolve one concrete repospec.
    ///
    /// Returns `Ok(None)` when the policy is [`OnUncloned::Skip`] and there
    /// is no usable clone.
    ///
    /// # Errors
    ///
    /// - [`GotError::MalformedRepospec`] for an unexpanded glob
    /// - [`GotError::UnknownHost`] if the named host is not registered
    /// - [`GotError::AmbiguousClone`] if a hostless name has records on
    ///   several hosts
    /// - [`GotError::RepositoryNotFound`] if no host serves the name
    /// - [`GotError::Fatal`] under [`OnUncloned::Fail`]
    pub async fn resolve(
        &mut self,
        spec: &Repospec,
        options: &ResolveOptions,
    ) -> Result<Option<Resolved>, GotError> {
        if spec.is_glob() {
            return Err(GotError::MalformedRepospec(format!(
                "'{spec}' is a pattern and must be expanded first"
            )));
        }

        let mut request = spec.clone();
        // Records of removed hosts still resolve.
        if let Some(record) = self.lookup_record(spec)? {
            if options.ignore_missing || record.exists_on_disk() {
                warn_on_pin_conflict(spec, &record);
                log::debug!("{}: registry hit at {}", record.key(), record.path.display());
                return Ok(Some(Resolved::from_record(&record)));
            }
            log::debug!(
                "{}: recorded clone at {} no longer exists",
                record.key(),
                record.path.display()
            );
            request.version = recorded_pin(spec, &record)?;
        }
        let spec = &request;
        if let Some(host) = &spec.host {
            if !self.store.hosts().contains(host) {
                return Err(GotError::UnknownHost(host.clone()));
            }
        }

        match options.on_uncloned {
            OnUncloned::Fake => Ok(Some(Resolved::fake(spec))),
            OnUncloned::Skip => {
                log::info!("{spec}: no local clone on record");
                Ok(None)
            }
            OnUncloned::Fail => Err(GotError::Fatal(format!(
                "{spec}: no local clone on record"
            ))),
            OnUncloned::Clone => self
                .clone_into_place(spec, options.dest.as_deref())
                .await
                .map(Some),
        }
    }

    /// Find the host serving `spec` and its clone URL.
    ///
    /// An explicit host is the only one asked. Otherwise hosts are asked in
    /// registry order and the first to answer wins; later hosts are never
    /// queried.
    pub async fn find_host(&mut self, spec: &Repospec) -> Result<(Host, String), GotError> {
        let candidates: Vec<Host> = match &spec.host {
            Some(name) => vec![self
                .store
                .hosts()
                .lookup(name)
                .cloned()
                .ok_or_else(|| GotError::UnknownHost(name.clone()))?],
            None => self.store.hosts().all().to_vec(),
        };
        if candidates.is_empty() {
            return Err(GotError::NoHosts);
        }

        let mut attempts = Vec::new();
        for host in candidates {
            let result = match self.adapter(&host) {
                Ok(adapter) => adapter.resolve_clone_url(&spec.name).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(url) => {
                    log::debug!("{}: {} is at {}", host.name, spec.name, url);
                    return Ok((host, url));
                }
                Err(error) if spec.host.is_some() && !matches!(error, HostError::NotFound(_)) => {
                    return Err(GotError::host(&host.name, error));
                }
                Err(error) => {
                    log::debug!("{}: {}", host.name, error);
                    attempts.push(HostAttempt {
                        host: host.name.clone(),
                        error,
                    });
                }
            }
        }
        log::debug!("no valid host has a record of {}", spec);
        Err(GotError::RepositoryNotFound {
            repospec: spec.to_string(),
            attempts,
        })
    }

    /// Clone URL for `spec`, with the host that serves it.
    pub async fn whence(&mut self, spec: &Repospec) -> Result<(HostName, String), GotError> {
        let (host, url) = self.find_host(spec).await?;
        Ok((host.name, url))
    }

    /// The registry record for `spec`, if there is exactly one candidate.
    pub fn lookup_record(&self, spec: &Repospec) -> Result<Option<CloneRecord>, GotError> {
        if let Some(key) = spec.key() {
            return Ok(self.store.clones().get(&key).cloned());
        }
        let matches = self.store.clones().find_by_name(&spec.name);
        match matches.as_slice() {
            [] => Ok(None),
            [record] => Ok(Some((*record).clone())),
            many => Err(GotError::AmbiguousClone {
                name: spec.name.clone(),
                hosts: many.iter().map(|r| r.host.clone()).collect(),
            }),
        }
    }

    /// The registry key `spec` already refers to, without resolving it.
    ///
    /// Hostless names map to the key of their only record, if any.
    pub(crate) fn known_key(&self, spec: &Repospec) -> Option<RepoKey> {
        spec.key().or_else(|| {
            self.lookup_record(spec)
                .ok()
                .flatten()
                .map(|record| record.key())
        })
    }

    pub(crate) fn adapter(&mut self, host: &Host) -> Result<&dyn HostAdapter, HostError> {
        if !self.adapters.contains_key(&host.name) {
            let adapter = self.factory.create(host)?;
            self.adapters.insert(host.name.clone(), adapter);
        }
        self.adapters
            .get(&host.name)
            .map(|adapter| adapter.as_ref())
            .ok_or_else(|| HostError::Unreachable(format!("no adapter for {}", host.name)))
    }

    pub(crate) fn forget_adapter(&mut self, host: &HostName) {
        self.adapters.remove(host);
    }

    pub(crate) fn factory(&self) -> &dyn AdapterFactory {
        self.factory
    }

    async fn clone_into_place(
        &mut self,
        spec: &Repospec,
        dest: Option<&Path>,
    ) -> Result<Resolved, GotError> {
        let (host, url) = self.find_host(spec).await?;
        let spec = spec.clone().with_host(host.name.clone());
        let dest = match dest {
            Some(dest) => absolutize(dest)?,
            None => host.default_clone_path(&self.clone_root, &spec),
        };

        if self.holds_clone_of(&dest, &url)? {
            log::info!(
                "{} already holds a clone of {}; switching to here mode",
                dest.display(),
                spec
            );
        } else {
            if dir_has_entries(&dest)? {
                return Err(GotError::Fatal(format!(
                    "Destination already exists: {}",
                    dest.display()
                )));
            }
            log::info!("cloning {} from {} into {}", spec, url, dest.display());
            self.vcs.clone_repo(&url, &dest, &host.name)?;
        }

        let key = RepoKey::new(host.name.clone(), spec.name.clone());
        let record = CloneRecord::new(key, spec.version.clone(), dest);
        self.store.clones_mut().upsert(record.clone());
        Ok(Resolved::from_record(&record))
    }

    fn holds_clone_of(&self, dest: &Path, url: &str) -> Result<bool, GotError> {
        if !dest.is_dir() || !self.vcs.is_repo(dest) {
            return Ok(false);
        }
        let origin = self.vcs.remote_url(dest)?;
        Ok(origin.as_deref().is_some_and(|o| same_url(o, url)))
    }
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("clone_root", &self.clone_root)
            .finish_non_exhaustive()
    }
}

fn warn_on_pin_conflict(spec: &Repospec, record: &CloneRecord) {
    if let Some(wanted) = &spec.version {
        if record.version.as_ref() != Some(wanted) {
            log::warn!(
                "{}: requested version {} but the clone at {} is {}",
                record.key(),
                wanted,
                record.path.display(),
                record
                    .version
                    .as_deref()
                    .map(|v| format!("pinned to {v}"))
                    .unwrap_or_else(|| "not pinned".to_string())
            );
        }
    }
}

/// The version a vanished clone must be re-cloned at.
///
/// A recorded pin never changes; asking for another version fails.
fn recorded_pin(spec: &Repospec, record: &CloneRecord) -> Result<Option<String>, GotError> {
    match (&record.version, &spec.version) {
        (Some(pinned), Some(wanted)) if pinned != wanted => Err(GotError::Fatal(format!(
            "{} is pinned to {}; cannot re-clone it at {}",
            record.key(),
            pinned,
            wanted
        ))),
        (Some(pinned), _) => Ok(Some(pinned.clone())),
        (None, wanted) => Ok(wanted.clone()),
    }
}

/// Compare clone URLs, ignoring a trailing `/`.
pub(crate) fn same_url(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

fn dir_has_entries(dir: &Path) -> Result<bool, GotError> {
    if !dir.exists() {
        return Ok(false);
    }
    if !dir.is_dir() {
        return Ok(true);
    }
    let mut entries =
        fs::read_dir(dir).map_err(|e| GotError::io(format!("cannot read {}", dir.display()), e))?;
    Ok(entries.next().is_some())
}

/// Make `path` absolute against the current directory.
pub(crate) fn absolutize(path: &Path) -> Result<PathBuf, GotError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| GotError::io("cannot determine the current directory", e))?;
    Ok(cwd.join(path))
}
