//! engine::expand
//!
//! Turns extended repospec requests into resolved repositories: globs are
//! expanded through host listings and `+` entries through the dependency
//! walker.

use std::collections::HashSet;
use std::path::PathBuf;

use super::deps::DepsOptions;
use super::errors::GotError;
use super::resolver::{ResolveOptions, Resolved, Resolver};
use crate::core::repospec::{Repospec, RepospecRequest};
use crate::core::types::RepoKey;
use crate::host::HostError;
use crate::registry::Host;

/// Result of [`Resolver::resolve_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Resolved repositories in request order, each at most once.
    pub resolved: Vec<Resolved>,
    /// Repositories with no clone under [`crate::core::types::OnUncloned::Skip`].
    pub skipped: Vec<Repospec>,
}

impl Expansion {
    fn push(&mut self, resolved: Resolved, seen: &mut HashSet<Seen>) {
        let marker = match resolved.key() {
            Some(key) if !resolved.fake => Seen::Key(key),
            _ => Seen::Path(resolved.path.clone()),
        };
        if seen.insert(marker) {
            self.resolved.push(resolved);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Seen {
    Key(RepoKey),
    Path(PathBuf),
}

impl Resolver<'_> {
    /// Expand a glob repospec into concrete ones.
    ///
    /// An explicit host must support listing. Without a host every host is
    /// asked; hosts that cannot list are skipped, and it is an error only
    /// if none can.
    pub async fn expand_glob(&mut self, spec: &Repospec) -> Result<Vec<Repospec>, GotError> {
        let hosts: Vec<Host> = match &spec.host {
            Some(name) => vec![self
                .store()
                .hosts()
                .lookup(name)
                .cloned()
                .ok_or_else(|| GotError::UnknownHost(name.clone()))?],
            None => self.store().hosts().all().to_vec(),
        };
        if hosts.is_empty() {
            return Err(GotError::NoHosts);
        }

        let mut out = Vec::new();
        let mut unsupported: Option<(Host, HostError)> = None;
        let mut listed = false;
        for host in hosts {
            let names = match self.adapter(&host) {
                Ok(adapter) => adapter.expand_glob(&spec.name).await,
                Err(err) => Err(err),
            };
            match names {
                Ok(names) => {
                    listed = true;
                    log::debug!("{}: {} matched {} repositories", host.name, spec.name, names.len());
                    out.extend(names.into_iter().map(|name| {
                        Repospec::new(Some(host.name.clone()), name, spec.version.clone())
                    }));
                }
                Err(err) if err.is_unsupported() => {
                    log::debug!("{}: {}", host.name, err);
                    if spec.host.is_some() {
                        return Err(unsupported_glob(&host, &err));
                    }
                    unsupported.get_or_insert((host, err));
                }
                Err(err) if spec.host.is_some() => return Err(GotError::host(&host.name, err)),
                Err(err) => log::debug!("{}: {}", host.name, err),
            }
        }

        if !listed {
            if let Some((host, err)) = unsupported {
                return Err(unsupported_glob(&host, &err));
            }
        }
        if out.is_empty() {
            log::warn!("{spec} matched no repositories");
        }
        Ok(out)
    }

    /// Resolve a list of extended requests.
    ///
    /// Globs expand in place; `+` entries expand to their dependency closure
    /// (root included). A repository reached twice is listed once.
    pub async fn resolve_all(
        &mut self,
        requests: &[RepospecRequest],
        options: &ResolveOptions,
        deps_file: &str,
    ) -> Result<Expansion, GotError> {
        let mut expansion = Expansion::default();
        let mut seen = HashSet::new();

        for request in requests {
            let specs = if request.spec.is_glob() {
                self.expand_glob(&request.spec).await?
            } else {
                vec![request.spec.clone()]
            };

            for spec in specs {
                if request.transitive {
                    let deps_options = DepsOptions {
                        include_root: true,
                        on_uncloned: options.on_uncloned,
                        ..DepsOptions::default()
                    };
                    for entry in self.list_dependencies(&spec, deps_file, &deps_options).await? {
                        expansion.push(entry, &mut seen);
                    }
                    continue;
                }
                match self.resolve(&spec, options).await? {
                    Some(resolved) => expansion.push(resolved, &mut seen),
                    None => expansion.skipped.push(spec),
                }
            }
        }
        Ok(expansion)
    }
}

fn unsupported_glob(host: &Host, err: &HostError) -> GotError {
    GotError::UnsupportedCapability {
        host: host.name.clone(),
        operation: "expand repository patterns".to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repospec::parse_extended;
    use crate::core::types::{HostKind, HostName, OnUncloned};
    use crate::git::MockVcs;
    use crate::host::mock::{MockAdapterFactory, MockHost};
    use crate::registry::Store;
    use tempfile::TempDir;

    fn store(names: &[&str]) -> Store {
        let mut store = Store::in_memory();
        for name in names {
            store
                .hosts_mut()
                .insert(Host::new(
                    HostName::new(*name).unwrap(),
                    HostKind::Daemon,
                    format!("git://{name}"),
                ))
                .unwrap();
        }
        store
    }

    fn requests(tokens: &[&str]) -> Vec<RepospecRequest> {
        tokens
            .iter()
            .flat_map(|t| parse_extended(t).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn glob_equals_explicit_specs() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&["h"]);
        let factory = MockAdapterFactory::new().with_host(
            "h",
            MockHost::new()
                .with_repo("project/repo2", "git://h/project/repo2")
                .with_repo("project/repo1", "git://h/project/repo1")
                .with_repo("other/repo3", "git://h/other/repo3"),
        );
        let vcs = MockVcs::new();
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());

        let globbed = resolver
            .resolve_all(&requests(&["project/*"]), &ResolveOptions::default(), "deps.got")
            .await
            .unwrap();
        let explicit = resolver
            .resolve_all(
                &requests(&["project/repo1", "project/repo2"]),
                &ResolveOptions::default(),
                "deps.got",
            )
            .await
            .unwrap();

        let names: Vec<String> = globbed.resolved.iter().map(|r| r.spec.to_string()).collect();
        assert_eq!(names, vec!["h:project/repo1", "h:project/repo2"]);
        assert_eq!(globbed, explicit);
        assert_eq!(vcs.clone_count(), 2);
    }

    #[tokio::test]
    async fn glob_skips_hosts_without_listing() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&["daemon", "bb"]);
        let factory = MockAdapterFactory::new()
            .with_host("daemon", MockHost::new().without_globs())
            .with_host("bb", MockHost::new().with_repo("p/a", "git://bb/p/a"));
        let vcs = MockVcs::new();
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());

        let specs = resolver
            .expand_glob(&Repospec::parse("p/*").unwrap())
            .await
            .unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].to_string(), "bb:p/a");

        let err = resolver
            .expand_glob(&Repospec::parse("daemon:p/*").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, GotError::UnsupportedCapability { .. }));
    }

    #[tokio::test]
    async fn glob_with_no_listing_host_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&["d"]);
        let factory = MockAdapterFactory::new().with_host("d", MockHost::new().without_globs());
        let vcs = MockVcs::new();
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());
        assert!(matches!(
            resolver.expand_glob(&Repospec::parse("p/*").unwrap()).await,
            Err(GotError::UnsupportedCapability { .. })
        ));
    }

    #[tokio::test]
    async fn skipped_entries_are_reported() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&["h"]);
        let factory = MockAdapterFactory::new();
        let vcs = MockVcs::new();
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());

        let expansion = resolver
            .resolve_all(
                &requests(&["a", "b"]),
                &ResolveOptions::with_policy(OnUncloned::Skip),
                "deps.got",
            )
            .await
            .unwrap();
        assert!(expansion.resolved.is_empty());
        assert_eq!(expansion.skipped.len(), 2);
    }

    #[tokio::test]
    async fn transitive_request_includes_closure() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&["h"]);
        let factory = MockAdapterFactory::new().with_host(
            "h",
            MockHost::new()
                .with_repo("app", "git://h/app")
                .with_repo("lib", "git://h/lib"),
        );
        let vcs = MockVcs::new().with_file("git://h/app", "deps.got", "lib\n");
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());

        let expansion = resolver
            .resolve_all(&requests(&["app+", "lib"]), &ResolveOptions::default(), "deps.got")
            .await
            .unwrap();
        let names: Vec<String> = expansion.resolved.iter().map(|r| r.spec.name.clone()).collect();
        assert_eq!(names, vec!["app", "lib"]);
    }
}
