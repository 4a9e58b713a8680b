//! engine::deps
//!
//! The dependency graph walker.
//!
//! # Algorithm
//!
//! Depth-first, preorder. Each repository is resolved (cloning when
//! needed), marked visited by `(host, name)`, and then its dependency file
//! is read and each entry walked in file order. A repository already
//! visited is skipped entirely, which keeps cyclic graphs finite and
//! guarantees one fetch per repository.
//!
//! The dependency file is re-read on every walk; nothing is cached.
//!
//! # Dependency files
//!
//! One repospec per line. Blank lines and lines starting with `#` are
//! ignored. `@file` lines resolve relative to the clone. Patterns are not
//! allowed.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::errors::GotError;
use super::resolver::{ResolveOptions, Resolved, Resolver};
use crate::core::repospec::{parse_extended_in, Repospec};
use crate::core::template::Template;
use crate::core::types::{OnUncloned, RepoKey};
use crate::git::Vcs;

/// Placeholders accepted by [`DepsFormat`].
pub const FORMAT_PLACEHOLDERS: &[&str] = &["rs", "RS", "p", "h", "H"];

/// Listing format used when none is given.
pub const DEFAULT_FORMAT: &str = "%p";

/// Options for [`Resolver::list_dependencies`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepsOptions {
    /// Dependency file name for the root only.
    pub file: Option<String>,
    /// Emit the root itself first.
    pub include_root: bool,
    pub on_uncloned: OnUncloned,
}

impl Default for DepsOptions {
    fn default() -> Self {
        Self {
            file: None,
            include_root: true,
            on_uncloned: OnUncloned::Clone,
        }
    }
}

impl Resolver<'_> {
    /// List `root` and its transitive dependencies in traversal order.
    ///
    /// # Errors
    ///
    /// Any failure to resolve a dependency or read a dependency file aborts
    /// the whole walk.
    pub async fn list_dependencies(
        &mut self,
        root: &Repospec,
        deps_file: &str,
        options: &DepsOptions,
    ) -> Result<Vec<Resolved>, GotError> {
        let resolve_options = ResolveOptions::with_policy(options.on_uncloned);
        let mut visited: HashSet<RepoKey> = HashSet::new();
        let mut faked: HashSet<PathBuf> = HashSet::new();
        let mut unresolved: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        let mut stack = vec![(root.clone(), true)];

        while let Some((spec, is_root)) = stack.pop() {
            if self.known_key(&spec).is_some_and(|key| visited.contains(&key))
                || unresolved.contains(&spec.to_string())
            {
                continue;
            }
            let Some(resolved) = self.resolve(&spec, &resolve_options).await? else {
                unresolved.insert(spec.to_string());
                continue;
            };
            let emit = !is_root || options.include_root;

            if resolved.fake {
                if emit && faked.insert(resolved.path.clone()) {
                    out.push(resolved);
                }
                continue;
            }
            let Some(key) = resolved.key() else {
                continue;
            };
            if !visited.insert(key) {
                continue;
            }

            let file = match (is_root, &options.file) {
                (true, Some(file)) => file.as_str(),
                _ => deps_file,
            };
            let deps = read_dependency_file(&resolved.path, file, &resolved.spec)?;
            if emit {
                out.push(resolved);
            }
            stack.extend(deps.into_iter().rev().map(|dep| (dep, false)));
        }
        Ok(out)
    }
}

/// Read the dependency file of the clone at `dir`.
///
/// A missing file means no dependencies.
pub fn read_dependency_file(
    dir: &Path,
    file: &str,
    owner: &Repospec,
) -> Result<Vec<Repospec>, GotError> {
    let path = dir.join(file);
    if !path.is_file() {
        log::info!("{} has no dependencies file ({})", owner, path.display());
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path)
        .map_err(|e| GotError::io(format!("cannot read {}", path.display()), e))?;

    let mut deps = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let requests = parse_extended_in(line, dir).map_err(|e| {
            GotError::MalformedRepospec(format!("{}: {}", path.display(), e))
        })?;
        for request in requests {
            if request.spec.is_glob() {
                return Err(GotError::MalformedRepospec(format!(
                    "{}: patterns are not allowed in dependency files ({})",
                    path.display(),
                    request.spec
                )));
            }
            deps.push(request.spec);
        }
    }
    log::debug!("{}: {} dependencies", owner, deps.len());
    Ok(deps)
}

/// A dependency listing format (`%rs`, `%RS`, `%p`, `%h`, `%H`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepsFormat {
    template: Template,
    needs_hash: bool,
}

impl DepsFormat {
    /// Parse a listing format.
    ///
    /// # Errors
    ///
    /// "invalid format string specifier" for unknown placeholders.
    pub fn parse(source: &str) -> Result<Self, GotError> {
        let template = Template::parse(source)?;
        template.check_placeholders(FORMAT_PLACEHOLDERS)?;
        let needs_hash = template.placeholders().any(|p| p == "h" || p == "H");
        Ok(Self {
            template,
            needs_hash,
        })
    }

    /// Render one entry. Hashes are read only when the format uses them.
    pub fn render(&self, entry: &Resolved, vcs: &dyn Vcs) -> Result<String, GotError> {
        let hash = if self.needs_hash && !entry.fake {
            vcs.head_hash(&entry.path)?.unwrap_or_default()
        } else {
            String::new()
        };
        let rendered = self.template.render_with(|name| match name {
            "rs" => Some(entry.spec.without_host()),
            "RS" => Some(entry.spec.to_string()),
            "p" => Some(entry.path.display().to_string()),
            "h" => Some(hash.chars().take(7).collect()),
            "H" => Some(hash.clone()),
            _ => None,
        })?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{HostKind, HostName};
    use crate::git::MockVcs;
    use crate::host::mock::{MockAdapterFactory, MockHost};
    use crate::registry::{Host, Store};
    use tempfile::TempDir;

    fn store() -> Store {
        let mut store = Store::in_memory();
        store
            .hosts_mut()
            .insert(Host::new(HostName::new("h").unwrap(), HostKind::Daemon, "git://h"))
            .unwrap();
        store
    }

    fn mock_host(names: &[&str]) -> MockHost {
        names.iter().fold(MockHost::new(), |host, name| {
            host.with_repo(name, &format!("git://h/{name}"))
        })
    }

    fn spec(s: &str) -> Repospec {
        Repospec::parse(s).unwrap()
    }

    fn names(entries: &[Resolved]) -> Vec<String> {
        entries.iter().map(|e| e.spec.name.clone()).collect()
    }

    #[tokio::test]
    async fn cycle_visits_each_once() {
        let dir = TempDir::new().unwrap();
        let mut store = store();
        let factory = MockAdapterFactory::new().with_host("h", mock_host(&["a", "b"]));
        let vcs = MockVcs::new()
            .with_file("git://h/a", "deps.got", "b\n")
            .with_file("git://h/b", "deps.got", "a\n");
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());

        let entries = resolver
            .list_dependencies(&spec("a"), "deps.got", &DepsOptions::default())
            .await
            .unwrap();
        assert_eq!(names(&entries), vec!["a", "b"]);
        assert_eq!(vcs.clone_count(), 2);
    }

    #[tokio::test]
    async fn preorder_with_shared_dependency() {
        let dir = TempDir::new().unwrap();
        let mut store = store();
        let factory =
            MockAdapterFactory::new().with_host("h", mock_host(&["app", "b", "c", "d"]));
        let vcs = MockVcs::new()
            .with_file("git://h/app", "deps.got", "# deps\nb\n\nc\n")
            .with_file("git://h/b", "deps.got", "d\nc\n");
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());

        let entries = resolver
            .list_dependencies(&spec("app"), "deps.got", &DepsOptions::default())
            .await
            .unwrap();
        assert_eq!(names(&entries), vec!["app", "b", "d", "c"]);

        let without_root = resolver
            .list_dependencies(
                &spec("app"),
                "deps.got",
                &DepsOptions {
                    include_root: false,
                    ..DepsOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(names(&without_root), vec!["b", "d", "c"]);
        assert_eq!(vcs.clone_count(), 4);
    }

    #[tokio::test]
    async fn hostless_and_qualified_names_share_a_visit() {
        let dir = TempDir::new().unwrap();
        let mut store = store();
        let factory = MockAdapterFactory::new().with_host("h", mock_host(&["app", "b", "c"]));
        let vcs = MockVcs::new()
            .with_file("git://h/app", "deps.got", "h:c\nb\nc\n")
            .with_file("git://h/b", "deps.got", "c\nh:c\n");
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());

        let entries = resolver
            .list_dependencies(&spec("app"), "deps.got", &DepsOptions::default())
            .await
            .unwrap();
        assert_eq!(names(&entries), vec!["app", "c", "b"]);
        assert_eq!(vcs.clone_count(), 3);
    }

    #[tokio::test]
    async fn file_override_applies_to_root_only() {
        let dir = TempDir::new().unwrap();
        let mut store = store();
        let factory = MockAdapterFactory::new().with_host("h", mock_host(&["app", "b", "c"]));
        let vcs = MockVcs::new()
            .with_file("git://h/app", "other.got", "b\n")
            .with_file("git://h/b", "other.got", "c\n");
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());

        let entries = resolver
            .list_dependencies(
                &spec("app"),
                "deps.got",
                &DepsOptions {
                    file: Some("other.got".into()),
                    ..DepsOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(names(&entries), vec!["app", "b"]);
    }

    #[tokio::test]
    async fn missing_dependency_aborts_walk() {
        let dir = TempDir::new().unwrap();
        let mut store = store();
        let factory = MockAdapterFactory::new().with_host("h", mock_host(&["app"]));
        let vcs = MockVcs::new().with_file("git://h/app", "deps.got", "ghost\n");
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());

        assert!(matches!(
            resolver
                .list_dependencies(&spec("app"), "deps.got", &DepsOptions::default())
                .await,
            Err(GotError::RepositoryNotFound { .. })
        ));
    }

    #[test]
    fn dependency_file_rejects_patterns() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("deps.got"), "p/*\n").unwrap();
        let err = read_dependency_file(dir.path(), "deps.got", &spec("x")).unwrap_err();
        assert!(err.to_string().contains("patterns are not allowed"));
    }

    #[test]
    fn format_renders_every_placeholder() {
        let vcs = MockVcs::new().with_repo(Path::new("/c/lib"), "git://h/lib");
        let entry = Resolved {
            spec: spec("h:lib@v1"),
            path: PathBuf::from("/c/lib"),
            fake: false,
        };
        let format = DepsFormat::parse("%rs|%RS|%p|%h|%%").unwrap();
        let out = format.render(&entry, &vcs).unwrap();
        let parts: Vec<&str> = out.split('|').collect();
        assert_eq!(parts[0], "lib@v1");
        assert_eq!(parts[1], "h:lib@v1");
        assert_eq!(parts[2], "/c/lib");
        assert_eq!(parts[3].len(), 7);
        assert_eq!(parts[4], "%");

        let full = DepsFormat::parse("%H").unwrap().render(&entry, &vcs).unwrap();
        assert!(full.starts_with(parts[3]));
    }

    #[test]
    fn format_rejects_unknown_specifier() {
        let err = DepsFormat::parse("%q").unwrap_err();
        assert!(err.to_string().contains("invalid format string specifier"));
        assert!(DepsFormat::parse(DEFAULT_FORMAT).is_ok());
    }
}
