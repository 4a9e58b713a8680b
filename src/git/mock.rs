//! git::mock
//!
//! Recording in-memory [`Vcs`] for tests.
//!
//! Cloning creates the destination directory on the real filesystem (so
//! path checks in the resolver behave) and writes any files registered for
//! the source URL, typically a dependency file.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::interface::{CommandOutput, GitError, Vcs};
use crate::core::types::HostName;

/// A call made against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    Clone { url: String, dest: PathBuf },
    SetRemoteUrl { path: PathBuf, url: String },
    Run { path: PathBuf, args: Vec<String> },
    FetchAndReset { path: PathBuf, rev: String },
}

#[derive(Debug, Default)]
struct MockVcsInner {
    calls: Vec<VcsCall>,
    origins: HashMap<PathBuf, String>,
    files_for_url: HashMap<String, Vec<(String, String)>>,
    failing_urls: HashSet<String>,
    dirty: HashSet<PathBuf>,
    wrong_head: HashSet<PathBuf>,
    exit_codes: HashMap<PathBuf, i32>,
    run_effects: HashMap<PathBuf, Vec<(String, String)>>,
    broken: HashSet<PathBuf>,
}

/// Mock VCS. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockVcs {
    inner: Arc<Mutex<MockVcsInner>>,
}

impl MockVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `file` with `content` into every clone of `url`.
    pub fn with_file(self, url: &str, file: &str, content: &str) -> Self {
        self.update(|inner| {
            inner
                .files_for_url
                .entry(url.to_string())
                .or_default()
                .push((file.to_string(), content.to_string()))
        });
        self
    }

    /// Make clones of `url` fail.
    pub fn failing_clone(self, url: &str) -> Self {
        self.update(|inner| {
            inner.failing_urls.insert(url.to_string());
        });
        self
    }

    /// Treat `path` as an existing clone with origin `url`.
    pub fn with_repo(self, path: &Path, url: &str) -> Self {
        self.update(|inner| {
            inner.origins.insert(path.to_path_buf(), url.to_string());
        });
        self
    }

    pub fn set_dirty(&self, path: &Path) {
        self.update(|inner| {
            inner.dirty.insert(path.to_path_buf());
        });
    }

    pub fn set_wrong_head(&self, path: &Path) {
        self.update(|inner| {
            inner.wrong_head.insert(path.to_path_buf());
        });
    }

    /// Make every status query and command in `path` fail.
    pub fn set_broken(&self, path: &Path) {
        self.update(|inner| {
            inner.broken.insert(path.to_path_buf());
        });
    }

    /// Exit code returned by `run` in `path`.
    pub fn set_exit_code(&self, path: &Path, code: i32) {
        self.update(|inner| {
            inner.exit_codes.insert(path.to_path_buf(), code);
        });
    }

    /// Write `file` inside `path` when a command runs there.
    pub fn on_run_write(&self, path: &Path, file: &str, content: &str) {
        self.update(|inner| {
            inner
                .run_effects
                .entry(path.to_path_buf())
                .or_default()
                .push((file.to_string(), content.to_string()))
        });
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.inner
            .lock()
            .map(|inner| inner.calls.clone())
            .unwrap_or_default()
    }

    pub fn clone_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, VcsCall::Clone { .. }))
            .count()
    }

    fn update<R>(&self, f: impl FnOnce(&mut MockVcsInner) -> R) -> Option<R> {
        self.inner.lock().ok().map(|mut inner| f(&mut inner))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MockVcsInner>, GitError> {
        self.inner
            .lock()
            .map_err(|_| GitError::Internal("mock poisoned".into()))
    }

    fn healthy(inner: &MockVcsInner, path: &Path) -> Result<(), GitError> {
        if inner.broken.contains(path) {
            Err(GitError::Internal(format!("{} is corrupt", path.display())))
        } else {
            Ok(())
        }
    }

    fn known(inner: &MockVcsInner, path: &Path) -> Result<(), GitError> {
        if inner.origins.contains_key(path) {
            Ok(())
        } else {
            Err(GitError::NotARepo {
                path: path.to_path_buf(),
            })
        }
    }
}

fn write_files(dir: &Path, files: &[(String, String)]) -> Result<(), GitError> {
    for (file, content) in files {
        fs::write(dir.join(file), content).map_err(|e| GitError::Internal(e.to_string()))?;
    }
    Ok(())
}

fn fake_hash(seed: &str) -> String {
    let sum: u64 = seed
        .bytes()
        .fold(1469598103934665603, |h, b| (h ^ b as u64).wrapping_mul(1099511628211));
    format!("{sum:016x}{sum:016x}{:08x}", sum as u32)
}

impl Vcs for MockVcs {
    fn clone_repo(&self, url: &str, dest: &Path, _host: &HostName) -> Result<(), GitError> {
        let mut inner = self.lock()?;
        inner.calls.push(VcsCall::Clone {
            url: url.to_string(),
            dest: dest.to_path_buf(),
        });
        if inner.failing_urls.contains(url) {
            return Err(GitError::CommandFailed {
                command: "clone".into(),
                status: Some(128),
                stderr: format!("repository '{url}' not found"),
            });
        }
        fs::create_dir_all(dest).map_err(|e| GitError::Internal(e.to_string()))?;
        if let Some(files) = inner.files_for_url.get(url) {
            write_files(dest, files)?;
        }
        inner.origins.insert(dest.to_path_buf(), url.to_string());
        Ok(())
    }

    fn is_repo(&self, path: &Path) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.origins.contains_key(path))
            .unwrap_or(false)
    }

    fn remote_url(&self, path: &Path) -> Result<Option<String>, GitError> {
        let inner = self.lock()?;
        Self::known(&inner, path)?;
        Ok(inner.origins.get(path).cloned())
    }

    fn set_remote_url(&self, path: &Path, url: &str) -> Result<(), GitError> {
        let mut inner = self.lock()?;
        Self::known(&inner, path)?;
        inner.calls.push(VcsCall::SetRemoteUrl {
            path: path.to_path_buf(),
            url: url.to_string(),
        });
        inner.origins.insert(path.to_path_buf(), url.to_string());
        Ok(())
    }

    fn run(&self, path: &Path, args: &[String], _host: &HostName) -> Result<CommandOutput, GitError> {
        let mut inner = self.lock()?;
        inner.calls.push(VcsCall::Run {
            path: path.to_path_buf(),
            args: args.to_vec(),
        });
        Self::healthy(&inner, path)?;
        if let Some(files) = inner.run_effects.get(path) {
            write_files(path, files)?;
        }
        let code = inner.exit_codes.get(path).copied().unwrap_or(0);
        Ok(CommandOutput {
            status: Some(code),
            stdout: format!("git {}\n", args.join(" ")),
            stderr: String::new(),
        })
    }

    fn is_dirty(&self, path: &Path) -> Result<bool, GitError> {
        let inner = self.lock()?;
        Self::healthy(&inner, path)?;
        Ok(inner.dirty.contains(path))
    }

    fn head_matches(&self, path: &Path, _rev: &str) -> Result<bool, GitError> {
        let inner = self.lock()?;
        Self::healthy(&inner, path)?;
        Ok(!inner.wrong_head.contains(path))
    }

    fn fetch_and_reset(&self, path: &Path, rev: &str, _host: &HostName) -> Result<(), GitError> {
        let mut inner = self.lock()?;
        inner.calls.push(VcsCall::FetchAndReset {
            path: path.to_path_buf(),
            rev: rev.to_string(),
        });
        inner.wrong_head.remove(path);
        Ok(())
    }

    fn head_hash(&self, path: &Path) -> Result<Option<String>, GitError> {
        let inner = self.lock()?;
        Ok(inner.origins.get(path).map(|url| fake_hash(url)))
    }
}
