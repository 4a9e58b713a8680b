//! engine::runner
//!
//! The multi-repository command runner.
//!
//! # Modes
//!
//! - **Dependency-ordered** ([`Resolver::run_git`]): runs a git subcommand
//!   in a repository, then reads its dependency file and recurses. The
//!   file is read after the command so a command that changes it affects
//!   the rest of the walk.
//! - **Flat** ([`run_flat`]): runs a shell command in each of an explicit
//!   list of clones, sequentially or all at once.
//!
//! Progress is reported as [`RunEvent`]s; callers decide how to print them.
//!
//! # Version-pinned repositories
//!
//! | Subcommand      | Behaviour                         |
//! |-----------------|-----------------------------------|
//! | `commit`,`push` | skipped                           |
//! | `fetch`,`pull`  | fetch, then hard reset to the pin |
//! | anything else   | run as given                      |
//!
//! Every pinned repository is checked for local changes and a HEAD that
//! differs from the pin. Both produce warnings; neither is corrected.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::task::JoinSet;

use super::deps::read_dependency_file;
use super::errors::GotError;
use super::resolver::{ResolveOptions, Resolved, Resolver};
use crate::core::types::RepoKey;
use crate::git::{CommandOutput, GitError, Vcs};

/// Progress reported by the runners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// Work is starting in a repository.
    Header { repospec: String, path: PathBuf },
    /// A command finished.
    Output {
        repospec: String,
        output: CommandOutput,
    },
    Warning { repospec: String, message: String },
    /// Nothing was run in this repository.
    Skipped { repospec: String, reason: String },
    /// A command failed and the run continues.
    IgnoredError {
        repospec: String,
        status: Option<i32>,
    },
}

/// Totals for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Commands started.
    pub runs: usize,
    pub failures: usize,
    /// A sequential flat run stopped at its first failure.
    pub aborted: bool,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.failures == 0
    }
}

/// How a git subcommand treats version-pinned repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinnedBehavior {
    Skip,
    Reset,
    Normal,
}

impl PinnedBehavior {
    pub fn for_subcommand(subcommand: &str) -> Self {
        match subcommand {
            "commit" | "push" => PinnedBehavior::Skip,
            "fetch" | "pull" => PinnedBehavior::Reset,
            _ => PinnedBehavior::Normal,
        }
    }
}

impl Resolver<'_> {
    /// Run `git <args>` in the clone containing `start`, then in each of
    /// its dependencies, depth-first.
    ///
    /// # Errors
    ///
    /// Without `ignore_errors`, the first failing command stops the walk
    /// with [`GotError::CommandFailed`].
    pub async fn run_git<F>(
        &mut self,
        start: &Path,
        args: &[String],
        ignore_errors: bool,
        deps_file: &str,
        mut emit: F,
    ) -> Result<RunReport, GotError>
    where
        F: FnMut(RunEvent),
    {
        let Some(subcommand) = args.first() else {
            return Err(GotError::Fatal("No git command specified".into()));
        };
        let behavior = PinnedBehavior::for_subcommand(subcommand);
        let root = self.what(start)?;

        let mut report = RunReport::default();
        let mut visited: HashSet<RepoKey> = HashSet::new();
        let mut stack = vec![root.repospec()];

        while let Some(spec) = stack.pop() {
            if self.known_key(&spec).is_some_and(|key| visited.contains(&key)) {
                continue;
            }
            let Some(resolved) = self.resolve(&spec, &ResolveOptions::default()).await? else {
                continue;
            };
            let (Some(key), Some(host)) = (resolved.key(), resolved.spec.host.clone()) else {
                continue;
            };
            if !visited.insert(key) {
                continue;
            }

            let repospec = resolved.spec.to_string();
            let path = resolved.path.clone();
            emit(RunEvent::Header {
                repospec: repospec.clone(),
                path: path.clone(),
            });

            let pin = resolved.spec.version.clone();
            let checked = match &pin {
                Some(version) => pin_warning(self.vcs(), &path, version).map(|warning| {
                    if let Some(message) = warning {
                        emit(RunEvent::Warning {
                            repospec: repospec.clone(),
                            message: message.into(),
                        });
                    }
                }),
                None => Ok(()),
            };

            match (checked, &pin, behavior) {
                (Err(err), _, _) => {
                    absorb(err, &repospec, ignore_errors, &mut report, &mut emit)?;
                }
                (Ok(()), Some(_), PinnedBehavior::Skip) => emit(RunEvent::Skipped {
                    repospec: repospec.clone(),
                    reason: format!("'{subcommand}' is not run in version-pinned repositories"),
                }),
                (Ok(()), Some(version), PinnedBehavior::Reset) => {
                    report.runs += 1;
                    if let Err(err) = self.vcs().fetch_and_reset(&path, version, &host) {
                        absorb(err, &repospec, ignore_errors, &mut report, &mut emit)?;
                    }
                }
                (Ok(()), _, _) => {
                    report.runs += 1;
                    match self.vcs().run(&path, args, &host) {
                        Ok(output) => {
                            let status = output.status;
                            let ok = output.success();
                            emit(RunEvent::Output {
                                repospec: repospec.clone(),
                                output,
                            });
                            if !ok {
                                report.failures += 1;
                                if !ignore_errors {
                                    return Err(GotError::CommandFailed { repospec, status });
                                }
                                emit(RunEvent::IgnoredError {
                                    repospec: repospec.clone(),
                                    status,
                                });
                            }
                        }
                        Err(err) => absorb(err, &repospec, ignore_errors, &mut report, &mut emit)?,
                    }
                }
            }

            let deps = read_dependency_file(&path, deps_file, &resolved.spec)?;
            stack.extend(deps.into_iter().rev());
        }
        Ok(report)
    }
}

/// The warning a pinned clone deserves, if any.
fn pin_warning(vcs: &dyn Vcs, path: &Path, version: &str) -> Result<Option<&'static str>, GitError> {
    if vcs.is_dirty(path)? {
        Ok(Some("Unexpected changes in version-pinned repository"))
    } else if !vcs.head_matches(path, version)? {
        Ok(Some("Wrong HEAD in version-pinned repository"))
    } else {
        Ok(None)
    }
}

/// Count a git error as a failure. It stops the walk unless errors are
/// ignored.
fn absorb<F>(
    err: GitError,
    repospec: &str,
    ignore_errors: bool,
    report: &mut RunReport,
    emit: &mut F,
) -> Result<(), GotError>
where
    F: FnMut(RunEvent),
{
    log::debug!("{repospec}: {err}");
    report.failures += 1;
    if !ignore_errors {
        return Err(GotError::Git(err));
    }
    emit(RunEvent::IgnoredError {
        repospec: repospec.to_string(),
        status: None,
    });
    Ok(())
}

/// Run `command` through the shell in every target clone.
///
/// Sequential runs stop at the first failure unless `ignore_errors` is set.
/// Background runs start every command at once, wait for all of them and
/// never stop early. Faked targets are skipped.
pub async fn run_flat<F>(
    targets: &[Resolved],
    command: &str,
    background: bool,
    ignore_errors: bool,
    mut emit: F,
) -> RunReport
where
    F: FnMut(RunEvent),
{
    let mut report = RunReport::default();
    let mut runnable = Vec::new();
    for target in targets {
        if target.fake {
            emit(RunEvent::Skipped {
                repospec: target.spec.to_string(),
                reason: "no local clone".into(),
            });
        } else {
            runnable.push((target.spec.to_string(), target.path.clone()));
        }
    }

    if background {
        let mut workers = JoinSet::new();
        for (repospec, path) in runnable {
            let command = command.to_string();
            workers.spawn(async move {
                let output = shell(&command, &path).await;
                (repospec, path, output)
            });
        }
        report.runs = workers.len();
        while let Some(joined) = workers.join_next().await {
            let (repospec, path, output) = match joined {
                Ok(done) => done,
                Err(err) => {
                    log::warn!("command worker failed: {err}");
                    report.failures += 1;
                    continue;
                }
            };
            emit(RunEvent::Header {
                repospec: repospec.clone(),
                path,
            });
            finish(&mut report, repospec, output, true, &mut emit);
        }
        return report;
    }

    for (repospec, path) in runnable {
        emit(RunEvent::Header {
            repospec: repospec.clone(),
            path: path.clone(),
        });
        report.runs += 1;
        let output = shell(command, &path).await;
        if !finish(&mut report, repospec, output, ignore_errors, &mut emit) {
            report.aborted = true;
            break;
        }
    }
    report
}

/// Record one command result. Returns false if the run should stop.
fn finish<F>(
    report: &mut RunReport,
    repospec: String,
    output: CommandOutput,
    ignore_errors: bool,
    emit: &mut F,
) -> bool
where
    F: FnMut(RunEvent),
{
    let status = output.status;
    let ok = output.success();
    emit(RunEvent::Output {
        repospec: repospec.clone(),
        output,
    });
    if ok {
        return true;
    }
    report.failures += 1;
    if ignore_errors {
        emit(RunEvent::IgnoredError { repospec, status });
        true
    } else {
        false
    }
}

async fn shell(command: &str, dir: &Path) -> CommandOutput {
    log::debug!("running '{}' in {}", command, dir.display());
    let result = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(dir)
        .stdin(std::process::Stdio::null())
        .output()
        .await;
    match result {
        Ok(output) => CommandOutput::from_output(output),
        Err(err) => CommandOutput {
            status: None,
            stdout: String::new(),
            stderr: format!("cannot run '{command}' in {}: {err}", dir.display()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repospec::Repospec;
    use crate::core::types::{HostKind, HostName};
    use crate::engine::HereTarget;
    use crate::git::{MockVcs, VcsCall};
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

    fn factory(names: &[&str]) -> MockAdapterFactory {
        let host = names.iter().fold(MockHost::new(), |host, name| {
            host.with_repo(name, &format!("git://h/{name}"))
        });
        MockAdapterFactory::new().with_host("h", host)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn headers(events: &[RunEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Header { repospec, .. } => Some(repospec.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn pinned_behavior_by_subcommand() {
        assert_eq!(PinnedBehavior::for_subcommand("push"), PinnedBehavior::Skip);
        assert_eq!(PinnedBehavior::for_subcommand("pull"), PinnedBehavior::Reset);
        assert_eq!(PinnedBehavior::for_subcommand("status"), PinnedBehavior::Normal);
    }

    #[tokio::test]
    async fn git_runs_root_then_dependencies() {
        let dir = TempDir::new().unwrap();
        let mut store = store();
        let factory = factory(&["app", "lib", "util"]);
        let vcs = MockVcs::new()
            .with_file("git://h/app", "deps.got", "lib\n")
            .with_file("git://h/lib", "deps.got", "util\napp\n");
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());
        let app = resolver
            .resolve(&Repospec::parse("app").unwrap(), &ResolveOptions::default())
            .await
            .unwrap()
            .unwrap();

        let mut events = Vec::new();
        let report = resolver
            .run_git(&app.path, &args(&["status"]), false, "deps.got", |e| events.push(e))
            .await
            .unwrap();

        assert_eq!(headers(&events), vec!["h:app", "h:lib", "h:util"]);
        assert_eq!(report.runs, 3);
        assert!(report.succeeded());
    }

    #[tokio::test]
    async fn dependency_file_is_read_after_command() {
        let dir = TempDir::new().unwrap();
        let mut store = store();
        let factory = factory(&["app", "late"]);
        let vcs = MockVcs::new();
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());
        let app = resolver
            .resolve(&Repospec::parse("app").unwrap(), &ResolveOptions::default())
            .await
            .unwrap()
            .unwrap();
        vcs.on_run_write(&app.path, "deps.got", "late\n");

        let mut events = Vec::new();
        resolver
            .run_git(&app.path, &args(&["pull"]), false, "deps.got", |e| events.push(e))
            .await
            .unwrap();
        assert_eq!(headers(&events), vec!["h:app", "h:late"]);
    }

    #[tokio::test]
    async fn pinned_repositories_are_special_cased() {
        let dir = TempDir::new().unwrap();
        let mut store = store();
        let factory = factory(&["app", "pinned"]);
        let vcs = MockVcs::new().with_file("git://h/app", "deps.got", "pinned@v1\n");
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());
        let app = resolver
            .resolve(&Repospec::parse("app").unwrap(), &ResolveOptions::default())
            .await
            .unwrap()
            .unwrap();
        let pinned = resolver
            .resolve(&Repospec::parse("pinned@v1").unwrap(), &ResolveOptions::default())
            .await
            .unwrap()
            .unwrap();
        vcs.set_dirty(&pinned.path);

        let mut events = Vec::new();
        resolver
            .run_git(&app.path, &args(&["push"]), false, "deps.got", |e| events.push(e))
            .await
            .unwrap();
        assert!(events.iter().any(|e| matches!(e,
            RunEvent::Warning { message, .. } if message.contains("Unexpected changes"))));
        assert!(events.iter().any(|e| matches!(e, RunEvent::Skipped { .. })));
        let pushed: Vec<_> = vcs
            .calls()
            .into_iter()
            .filter(|c| matches!(c, VcsCall::Run { .. }))
            .collect();
        assert_eq!(pushed.len(), 1);

        resolver
            .run_git(&app.path, &args(&["fetch"]), false, "deps.got", |_| {})
            .await
            .unwrap();
        assert!(vcs.calls().contains(&VcsCall::FetchAndReset {
            path: pinned.path.clone(),
            rev: "v1".into()
        }));
    }

    #[tokio::test]
    async fn wrong_head_warns() {
        let dir = TempDir::new().unwrap();
        let mut store = store();
        let factory = factory(&["pinned"]);
        let vcs = MockVcs::new();
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());
        let pinned = resolver
            .resolve(&Repospec::parse("pinned@v1").unwrap(), &ResolveOptions::default())
            .await
            .unwrap()
            .unwrap();
        vcs.set_wrong_head(&pinned.path);

        let mut events = Vec::new();
        resolver
            .run_git(&pinned.path, &args(&["status"]), false, "deps.got", |e| events.push(e))
            .await
            .unwrap();
        assert!(events.iter().any(|e| matches!(e,
            RunEvent::Warning { message, .. } if message.contains("Wrong HEAD"))));
    }

    #[tokio::test]
    async fn failures_abort_unless_ignored() {
        let dir = TempDir::new().unwrap();
        let mut store = store();
        let factory = factory(&["app", "lib"]);
        let vcs = MockVcs::new().with_file("git://h/app", "deps.got", "lib\n");
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());
        let app = resolver
            .resolve(&Repospec::parse("app").unwrap(), &ResolveOptions::default())
            .await
            .unwrap()
            .unwrap();
        vcs.set_exit_code(&app.path, 1);

        let err = resolver
            .run_git(&app.path, &args(&["status"]), false, "deps.got", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, GotError::CommandFailed { status: Some(1), .. }));

        let mut events = Vec::new();
        let report = resolver
            .run_git(&app.path, &args(&["status"]), true, "deps.got", |e| events.push(e))
            .await
            .unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(report.runs, 2);
        assert!(!report.succeeded());
        assert!(events.iter().any(|e| matches!(e, RunEvent::IgnoredError { .. })));
    }

    #[tokio::test]
    async fn git_errors_are_counted_when_ignored() {
        let dir = TempDir::new().unwrap();
        let mut store = store();
        let factory = factory(&["app", "lib", "util"]);
        let vcs = MockVcs::new().with_file("git://h/app", "deps.got", "lib@v1\nutil\n");
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());
        let mut paths = Vec::new();
        for name in ["app", "lib@v1", "util"] {
            let resolved = resolver
                .resolve(&Repospec::parse(name).unwrap(), &ResolveOptions::default())
                .await
                .unwrap()
                .unwrap();
            paths.push(resolved.path);
        }
        vcs.set_broken(&paths[1]);
        vcs.set_broken(&paths[2]);

        let err = resolver
            .run_git(&paths[0], &args(&["status"]), false, "deps.got", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, GotError::Git(_)));

        let mut events = Vec::new();
        let report = resolver
            .run_git(&paths[0], &args(&["status"]), true, "deps.got", |e| events.push(e))
            .await
            .unwrap();
        assert_eq!(headers(&events), vec!["h:app", "h:lib@v1", "h:util"]);
        assert_eq!(report.runs, 2);
        assert_eq!(report.failures, 2);
        let ignored = events
            .iter()
            .filter(|e| matches!(e, RunEvent::IgnoredError { status: None, .. }))
            .count();
        assert_eq!(ignored, 2);
    }

    #[tokio::test]
    async fn git_requires_tracked_start() {
        let dir = TempDir::new().unwrap();
        let mut store = store();
        let factory = factory(&[]);
        let vcs = MockVcs::new();
        let mut resolver = Resolver::new(&mut store, &factory, &vcs, dir.path().to_path_buf());
        assert!(resolver
            .run_git(dir.path(), &args(&["status"]), false, "deps.got", |_| {})
            .await
            .is_err());
        resolver
            .here(
                &Repospec::parse("h:x").unwrap(),
                HereTarget::Path(dir.path().to_path_buf()),
                true,
            )
            .await
            .unwrap();
        assert!(resolver
            .run_git(dir.path(), &[], false, "deps.got", |_| {})
            .await
            .is_err());
    }

    fn target(name: &str, path: &Path) -> Resolved {
        Resolved {
            spec: Repospec::parse(name).unwrap(),
            path: path.to_path_buf(),
            fake: false,
        }
    }

    #[tokio::test]
    async fn flat_sequential_stops_on_failure() {
        let dirs: Vec<TempDir> = (0..3).map(|_| TempDir::new().unwrap()).collect();
        std::fs::write(dirs[1].path().join("fail"), "").unwrap();
        let targets: Vec<Resolved> = dirs
            .iter()
            .enumerate()
            .map(|(i, d)| target(&format!("h:r{i}"), d.path()))
            .collect();

        let mut events = Vec::new();
        let report = run_flat(&targets, "test ! -e fail", false, false, |e| events.push(e)).await;
        assert!(report.aborted);
        assert_eq!(report.runs, 2);
        assert_eq!(headers(&events), vec!["h:r0", "h:r1"]);

        let report = run_flat(&targets, "test ! -e fail", false, true, |_| {}).await;
        assert!(!report.aborted);
        assert_eq!(report.runs, 3);
        assert_eq!(report.failures, 1);
    }

    #[tokio::test]
    async fn flat_background_runs_everything() {
        let dirs: Vec<TempDir> = (0..3).map(|_| TempDir::new().unwrap()).collect();
        let targets: Vec<Resolved> = dirs
            .iter()
            .enumerate()
            .map(|(i, d)| target(&format!("h:r{i}"), d.path()))
            .collect();

        let mut events = Vec::new();
        let report = run_flat(&targets, "exit 3", true, false, |e| events.push(e)).await;
        assert_eq!(report.runs, 3);
        assert_eq!(report.failures, 3);
        assert!(!report.aborted);
        let mut seen = headers(&events);
        seen.sort();
        assert_eq!(seen, vec!["h:r0", "h:r1", "h:r2"]);
    }

    #[tokio::test]
    async fn flat_captures_output_and_skips_fakes() {
        let dir = TempDir::new().unwrap();
        let mut fake = target("h:ghost", Path::new("REPO_NOT_FOUND/h:ghost"));
        fake.fake = true;
        let targets = vec![target("h:r", dir.path()), fake];

        let mut events = Vec::new();
        let report = run_flat(&targets, "echo hello", false, false, |e| events.push(e)).await;
        assert!(report.succeeded());
        assert!(events.iter().any(|e| matches!(e,
            RunEvent::Output { output, .. } if output.stdout.trim() == "hello")));
        assert!(events.iter().any(|e| matches!(e, RunEvent::Skipped { .. })));
    }
}
