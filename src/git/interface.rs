//! git::interface
//!
//! The version-control collaborator.
//!
//! # Architecture
//!
//! Engine code talks to git only through the [`Vcs`] trait. The real
//! implementation, [`Git`], splits the work:
//!
//! - local reads (origin URL, dirty check, HEAD comparison) use `git2`
//! - clone, fetch, reset and pass-through subcommands run the `git` CLI so
//!   that user configuration, SSH agents and credential prompts behave as
//!   they do on the command line
//!
//! Every CLI invocation carries `GIT_ASKPASS` pointing back at the running
//! `got` binary, with `GOT_HOSTNAME` naming the host whose credentials
//! should answer the prompt.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::core::paths::{GotPaths, GOT_ROOT_ENV};
use crate::core::types::HostName;

/// Environment variable marking an askpass invocation of `got`.
pub const ASKPASS_ENV: &str = "GOT_ASKPASS";

/// Environment variable naming the host an askpass prompt is for.
pub const HOSTNAME_ENV: &str = "GOT_HOSTNAME";

/// Errors from version-control operations.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("not a git repository: {}", path.display())]
    NotARepo { path: PathBuf },

    #[error("no origin remote in {}", path.display())]
    NoOrigin { path: PathBuf },

    #[error("git {command} failed{}: {stderr}", status.map(|c| format!(" (exit {c})")).unwrap_or_default())]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("cannot run git: {0}")]
    Spawn(String),

    #[error("git error: {0}")]
    Internal(String),
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal(err.message().to_string())
    }
}

/// Captured result of an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub(crate) fn from_output(output: std::process::Output) -> Self {
        Self {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Version-control operations used by the engine.
pub trait Vcs: Send + Sync {
    /// Clone `url` into `dest`. `host` selects askpass credentials.
    fn clone_repo(&self, url: &str, dest: &Path, host: &HostName) -> Result<(), GitError>;

    /// Whether `path` is the top of a git working tree.
    fn is_repo(&self, path: &Path) -> bool;

    /// The origin URL configured in the clone at `path`.
    fn remote_url(&self, path: &Path) -> Result<Option<String>, GitError>;

    /// Point origin at a new URL.
    fn set_remote_url(&self, path: &Path, url: &str) -> Result<(), GitError>;

    /// Run `git <args>` inside `path`, capturing its output.
    fn run(&self, path: &Path, args: &[String], host: &HostName) -> Result<CommandOutput, GitError>;

    /// Tracked files have uncommitted changes.
    fn is_dirty(&self, path: &Path) -> Result<bool, GitError>;

    /// HEAD is the commit `rev` names.
    fn head_matches(&self, path: &Path, rev: &str) -> Result<bool, GitError>;

    /// Fetch origin then hard-reset to `rev`.
    fn fetch_and_reset(&self, path: &Path, rev: &str, host: &HostName) -> Result<(), GitError>;

    /// Full hash of HEAD, if there is one.
    fn head_hash(&self, path: &Path) -> Result<Option<String>, GitError>;
}

/// [`Vcs`] backed by `git2` and the `git` executable.
#[derive(Debug, Clone)]
pub struct Git {
    got_root: PathBuf,
    askpass: Option<PathBuf>,
}

impl Git {
    pub fn new(paths: &GotPaths) -> Self {
        Self {
            got_root: paths.root().to_path_buf(),
            askpass: std::env::current_exe().ok(),
        }
    }

    /// Override the askpass program (tests point it elsewhere or disable it).
    pub fn with_askpass(mut self, askpass: Option<PathBuf>) -> Self {
        self.askpass = askpass;
        self
    }

    fn command(&self, host: &HostName) -> Command {
        let mut cmd = Command::new("git");
        if let Some(askpass) = &self.askpass {
            cmd.env("GIT_ASKPASS", askpass);
        }
        cmd.env(ASKPASS_ENV, "1")
            .env(HOSTNAME_ENV, host.as_str())
            .env(GOT_ROOT_ENV, &self.got_root);
        cmd
    }

    fn checked(&self, mut cmd: Command, label: &str) -> Result<CommandOutput, GitError> {
        log::debug!("running git {}", label);
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| GitError::Spawn(e.to_string()))?;
        let output = CommandOutput::from_output(output);
        if output.success() {
            Ok(output)
        } else {
            Err(GitError::CommandFailed {
                command: label.to_string(),
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    fn open(path: &Path) -> Result<git2::Repository, GitError> {
        git2::Repository::open(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })
    }
}

impl Vcs for Git {
    fn clone_repo(&self, url: &str, dest: &Path, host: &HostName) -> Result<(), GitError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GitError::Spawn(e.to_string()))?;
        }
        let mut cmd = self.command(host);
        cmd.arg("clone").arg(url).arg(dest);
        self.checked(cmd, "clone").map(|_| ())
    }

    fn is_repo(&self, path: &Path) -> bool {
        Self::open(path).is_ok()
    }

    fn remote_url(&self, path: &Path) -> Result<Option<String>, GitError> {
        let repo = Self::open(path)?;
        let url = match repo.find_remote("origin") {
            Ok(remote) => remote.url().map(String::from),
            Err(e) if e.code() == git2::ErrorCode::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(url)
    }

    fn set_remote_url(&self, path: &Path, url: &str) -> Result<(), GitError> {
        let repo = Self::open(path)?;
        match repo.find_remote("origin") {
            Ok(_) => repo.remote_set_url("origin", url)?,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                return Err(GitError::NoOrigin {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn run(&self, path: &Path, args: &[String], host: &HostName) -> Result<CommandOutput, GitError> {
        let mut cmd = self.command(host);
        cmd.args(args).current_dir(path).stdin(Stdio::null());
        log::debug!("running git {} in {}", args.join(" "), path.display());
        let output = cmd.output().map_err(|e| GitError::Spawn(e.to_string()))?;
        Ok(CommandOutput::from_output(output))
    }

    fn is_dirty(&self, path: &Path) -> Result<bool, GitError> {
        let repo = Self::open(path)?;
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);
        let statuses = repo.statuses(Some(&mut opts))?;
        Ok(statuses.iter().any(|entry| {
            let s = entry.status();
            s.is_index_new()
                || s.is_index_modified()
                || s.is_index_deleted()
                || s.is_index_renamed()
                || s.is_wt_modified()
                || s.is_wt_deleted()
                || s.is_wt_renamed()
                || s.is_wt_typechange()
        }))
    }

    fn head_matches(&self, path: &Path, rev: &str) -> Result<bool, GitError> {
        let repo = Self::open(path)?;
        let head = match repo.head() {
            Ok(head) => head.peel_to_commit()?.id(),
            Err(_) => return Ok(false),
        };
        let wanted = match repo.revparse_single(rev) {
            Ok(obj) => obj.peel_to_commit()?.id(),
            Err(_) => return Ok(false),
        };
        Ok(head == wanted)
    }

    fn fetch_and_reset(&self, path: &Path, rev: &str, host: &HostName) -> Result<(), GitError> {
        let mut fetch = self.command(host);
        fetch.args(["fetch", "origin"]).current_dir(path);
        self.checked(fetch, "fetch")?;

        let mut reset = self.command(host);
        reset.args(["reset", "--hard", rev]).current_dir(path);
        self.checked(reset, "reset").map(|_| ())
    }

    fn head_hash(&self, path: &Path) -> Result<Option<String>, GitError> {
        let repo = Self::open(path)?;
        let hash = match repo.head() {
            Ok(head) => head.target().map(|oid| oid.to_string()),
            Err(_) => None,
        };
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn run_git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_NAME", "Test")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "Test")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .status()
            .expect("git");
        assert!(status.success(), "git {:?} failed", args);
    }

    fn init_repo() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        run_git(dir.path(), &["init", "-q"]);
        fs::write(dir.path().join("README"), "hello\n").expect("write");
        run_git(dir.path(), &["add", "README"]);
        run_git(dir.path(), &["commit", "-q", "-m", "init"]);
        dir
    }

    fn git() -> Git {
        Git::new(&GotPaths::new(PathBuf::from("/nonexistent"))).with_askpass(None)
    }

    fn host() -> HostName {
        HostName::new("h").unwrap()
    }

    #[test]
    fn remote_url_roundtrip() {
        let repo = init_repo();
        assert_eq!(git().remote_url(repo.path()).unwrap(), None);
        assert!(matches!(
            git().set_remote_url(repo.path(), "git://x/y"),
            Err(GitError::NoOrigin { .. })
        ));

        run_git(repo.path(), &["remote", "add", "origin", "git://a/b"]);
        assert_eq!(git().remote_url(repo.path()).unwrap().as_deref(), Some("git://a/b"));

        git().set_remote_url(repo.path(), "git://c/d").unwrap();
        assert_eq!(git().remote_url(repo.path()).unwrap().as_deref(), Some("git://c/d"));
    }

    #[test]
    fn non_repo_is_reported() {
        let dir = TempDir::new().expect("temp dir");
        assert!(!git().is_repo(dir.path()));
        assert!(matches!(
            git().remote_url(dir.path()),
            Err(GitError::NotARepo { .. })
        ));
    }

    #[test]
    fn dirty_detection_ignores_untracked() {
        let repo = init_repo();
        assert!(!git().is_dirty(repo.path()).unwrap());

        fs::write(repo.path().join("new.txt"), "x").unwrap();
        assert!(!git().is_dirty(repo.path()).unwrap());

        fs::write(repo.path().join("README"), "changed\n").unwrap();
        assert!(git().is_dirty(repo.path()).unwrap());
    }

    #[test]
    fn head_hash_and_match() {
        let repo = init_repo();
        let hash = git().head_hash(repo.path()).unwrap().expect("head");
        assert_eq!(hash.len(), 40);
        assert!(git().head_matches(repo.path(), &hash).unwrap());
        assert!(git().head_matches(repo.path(), "HEAD").unwrap());
        assert!(!git().head_matches(repo.path(), "no-such-rev").unwrap());
    }

    #[test]
    fn run_captures_output() {
        let repo = init_repo();
        let out = git()
            .run(repo.path(), &["rev-parse".into(), "HEAD".into()], &host())
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim().len(), 40);

        let out = git()
            .run(repo.path(), &["no-such-subcommand".into()], &host())
            .unwrap();
        assert!(!out.success());
    }

    #[test]
    fn clone_from_local_path() {
        let origin = init_repo();
        let dest_root = TempDir::new().expect("temp dir");
        let dest = dest_root.path().join("nested").join("clone");

        git()
            .clone_repo(&origin.path().to_string_lossy(), &dest, &host())
            .unwrap();
        assert!(git().is_repo(&dest));
        assert_eq!(
            git().head_hash(&dest).unwrap(),
            git().head_hash(origin.path()).unwrap()
        );
    }

    #[test]
    fn failed_clone_carries_stderr() {
        let dest = TempDir::new().expect("temp dir");
        let err = git()
            .clone_repo("/definitely/not/a/repo", &dest.path().join("c"), &host())
            .unwrap_err();
        assert!(matches!(err, GitError::CommandFailed { .. }));
    }
}
