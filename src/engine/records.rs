//! engine::records
//!
//! Operations on clone records that do not clone: registering an existing
//! directory (`here`), reverse lookup (`what`, `find_root`), relocation
//! (`move`) and pruning.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::errors::GotError;
use super::resolver::{absolutize, same_url, Resolver};
use crate::core::repospec::Repospec;
use crate::core::types::{HostName, RepoKey};
use crate::registry::CloneRecord;

/// What `here` should do with a repository's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HereTarget {
    /// Record the clone at this directory.
    Path(PathBuf),
    /// Remove the record, leaving the directory alone.
    Unregister,
}

impl HereTarget {
    /// `-` unregisters; anything else is a path.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            HereTarget::Unregister
        } else {
            HereTarget::Path(PathBuf::from(arg))
        }
    }
}

/// Result of [`Resolver::here`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HereOutcome {
    Registered {
        record: CloneRecord,
        /// The host was deduced from the clone's origin.
        deduced: bool,
        previous: Option<CloneRecord>,
    },
    Unregistered {
        record: CloneRecord,
    },
}

/// Result of [`Resolver::prune`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub removed: Vec<CloneRecord>,
    pub kept: usize,
}

impl Resolver<'_> {
    /// Register, or unregister, the local clone of `spec`.
    ///
    /// With an explicit host no host is contacted. Without one, the host is
    /// deduced by comparing the clone's origin against every host's clone
    /// URL for the name. `force` skips the existence and repository checks.
    ///
    /// # Errors
    ///
    /// - [`GotError::HostDeductionFailed`] when no host matches the origin
    /// - [`GotError::AmbiguousHost`] when more than one does
    /// - [`GotError::Fatal`] for a missing path or a non-repository
    pub async fn here(
        &mut self,
        spec: &Repospec,
        target: HereTarget,
        force: bool,
    ) -> Result<HereOutcome, GotError> {
        if spec.is_glob() {
            return Err(GotError::MalformedRepospec(format!(
                "'{spec}' is a pattern; name a single repository"
            )));
        }

        let dir = match target {
            HereTarget::Unregister => return self.unregister(spec),
            HereTarget::Path(dir) => absolutize(&dir)?,
        };

        let dir = if dir.exists() {
            dir.canonicalize()
                .map_err(|e| GotError::io(format!("cannot resolve {}", dir.display()), e))?
        } else if force {
            dir
        } else {
            return Err(GotError::Fatal(format!("Path not found: {}", dir.display())));
        };
        if !force && !self.vcs().is_repo(&dir) {
            return Err(GotError::Fatal(format!(
                "{} is not a git repository",
                dir.display()
            )));
        }

        let (host, deduced) = match &spec.host {
            Some(host) => {
                if !self.store().hosts().contains(host) {
                    return Err(GotError::UnknownHost(host.clone()));
                }
                (host.clone(), false)
            }
            None => {
                let host = self.deduce_host(spec, &dir).await?;
                log::info!("Deduced host {host}");
                (host, true)
            }
        };

        let record = CloneRecord::new(
            RepoKey::new(host, spec.name.clone()),
            spec.version.clone(),
            dir,
        );
        let previous = self.store_mut().clones_mut().upsert(record.clone());
        log::info!("{} is located at {}", record.repospec(), record.path.display());
        Ok(HereOutcome::Registered {
            record,
            deduced,
            previous,
        })
    }

    fn unregister(&mut self, spec: &Repospec) -> Result<HereOutcome, GotError> {
        let record = self
            .lookup_record(spec)?
            .ok_or_else(|| GotError::Fatal(format!("{spec}: no local clone on record")))?;
        self.store_mut().clones_mut().remove(&record.key());
        log::info!("{} no longer has a registered local clone", record.repospec());
        Ok(HereOutcome::Unregistered { record })
    }

    async fn deduce_host(&mut self, spec: &Repospec, dir: &Path) -> Result<HostName, GotError> {
        let origin = self
            .vcs()
            .remote_url(dir)?
            .ok_or_else(|| GotError::HostDeductionFailed {
                repospec: spec.to_string(),
                reason: format!("{} has no origin remote", dir.display()),
            })?;

        let hosts = self.store().hosts().all().to_vec();
        if hosts.is_empty() {
            return Err(GotError::NoHosts);
        }

        let mut matches = Vec::new();
        for host in hosts {
            if host.name_from_clone_url(&origin).as_deref() == Some(spec.name.as_str()) {
                matches.push(host.name.clone());
                continue;
            }
            let url = match self.adapter(&host) {
                Ok(adapter) => adapter.resolve_clone_url(&spec.name).await,
                Err(err) => Err(err),
            };
            match url {
                Ok(url) if same_url(&url, &origin) => matches.push(host.name.clone()),
                Ok(url) => log::debug!("{}: clone URL {} does not match {}", host.name, url, origin),
                Err(err) => log::debug!("{}: {}", host.name, err),
            }
        }

        match matches.len() {
            0 => Err(GotError::HostDeductionFailed {
                repospec: spec.to_string(),
                reason: format!("no host's clone URL matches origin {origin}"),
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(GotError::AmbiguousHost {
                repospec: spec.to_string(),
                hosts: matches,
            }),
        }
    }

    /// The record of the clone that contains `dir`.
    pub fn what(&self, dir: &Path) -> Result<CloneRecord, GotError> {
        self.record_containing(dir)?
            .ok_or_else(|| GotError::Fatal(format!("Not a got repository: {}", dir.display())))
    }

    /// Root directory of the clone that contains `dir`.
    pub fn find_root(&self, dir: &Path) -> Result<PathBuf, GotError> {
        self.record_containing(dir)?
            .map(|record| record.path)
            .ok_or_else(|| {
                GotError::Fatal(format!(
                    "{} is not within a got repository",
                    dir.display()
                ))
            })
    }

    fn record_containing(&self, dir: &Path) -> Result<Option<CloneRecord>, GotError> {
        let dir = absolutize(dir)?;
        if let Some(record) = self.store().clones().containing(&dir) {
            return Ok(Some(record.clone()));
        }
        Ok(dir
            .canonicalize()
            .ok()
            .and_then(|canonical| self.store().clones().containing(&canonical).cloned()))
    }

    /// Move the clone of `spec` to `dest` and record the new location.
    ///
    /// An existing directory at `dest` receives the clone under its current
    /// directory name. The registry is flushed straight away.
    ///
    /// # Errors
    ///
    /// [`GotError::PartialState`] if the directory moved but the registry
    /// could not be written.
    pub fn move_clone(&mut self, spec: &Repospec, dest: &Path) -> Result<CloneRecord, GotError> {
        let record = self
            .lookup_record(spec)?
            .ok_or_else(|| GotError::Fatal(format!("No clone found for {spec}")))?;
        if !record.exists_on_disk() {
            return Err(GotError::Fatal(format!(
                "{}: {} no longer exists",
                record.repospec(),
                record.path.display()
            )));
        }

        let mut dest = absolutize(dest)?;
        if dest.exists() {
            let base = match (dest.is_dir(), record.path.file_name()) {
                (true, Some(base)) => base.to_os_string(),
                _ => {
                    return Err(GotError::Fatal(format!(
                        "Destination already exists: {}",
                        dest.display()
                    )))
                }
            };
            dest.push(base);
            if dest.exists() {
                return Err(GotError::Fatal(format!(
                    "Destination already exists: {}",
                    dest.display()
                )));
            }
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| GotError::io(format!("cannot create {}", parent.display()), e))?;
        }
        move_dir(&record.path, &dest).map_err(|e| {
            GotError::io(
                format!(
                    "cannot move {} to {}",
                    record.path.display(),
                    dest.display()
                ),
                e,
            )
        })?;

        let mut moved = record.clone();
        moved.path = dest;
        self.store_mut().clones_mut().upsert(moved.clone());
        if let Err(err) = self.store_mut().flush() {
            return Err(GotError::PartialState {
                action: format!(
                    "moving {} from {} to {}",
                    record.repospec(),
                    record.path.display(),
                    moved.path.display()
                ),
                reason: err.to_string(),
            });
        }
        log::info!("{} moved to {}", moved.repospec(), moved.path.display());
        Ok(moved)
    }

    /// Drop every record whose path no longer exists.
    ///
    /// `confirm` is asked before each removal; records it declines are kept.
    pub fn prune<F>(&mut self, mut confirm: F) -> PruneReport
    where
        F: FnMut(&CloneRecord) -> bool,
    {
        let records: Vec<CloneRecord> = self.store().clones().iter().cloned().collect();
        let mut report = PruneReport::default();
        for record in records {
            if record.exists_on_disk() || !confirm(&record) {
                report.kept += 1;
                continue;
            }
            self.store_mut().clones_mut().remove(&record.key());
            log::info!("Removed {}", record.repospec());
            report.removed.push(record);
        }
        report
    }
}

/// Rename a directory, copying then deleting when `to` is on another
/// filesystem.
fn move_dir(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            log::debug!(
                "{} and {} are on different filesystems; copying",
                from.display(),
                to.display()
            );
            copy_then_remove(from, to)
        }
        other => other,
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    if let Err(err) = copy_tree(from, to) {
        if let Err(cleanup) = fs::remove_dir_all(to) {
            log::warn!("cannot remove partial copy {}: {}", to.display(), cleanup);
        }
        return Err(err);
    }
    fs::remove_dir_all(from)
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = to.join(relative);
        let kind = entry.file_type();
        if kind.is_dir() {
            fs::create_dir_all(&target)?;
        } else if kind.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(link)?, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    fs::copy(link, target).map(|_| ())
}
