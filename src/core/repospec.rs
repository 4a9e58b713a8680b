//! core::repospec
//!
//! The repospec grammar: `host:name@version`.
//!
//! # Grammar
//!
//! A base repospec splits on the first `:` into an optional host and the
//! rest, then on the last `@` into the repository name and an optional
//! version pin. Names are path-like (`project/repo`) and may contain `*`
//! in any segment, which marks the repospec as a glob to be expanded by a host.
//!
//! Extended tokens, as accepted on the command line and in listen mode,
//! add two forms on top of the base grammar:
//!
//! - `@path` reads `path` and parses every non-blank line as its own token
//! - a trailing `+` flags the entry for dependency-closure expansion
//!
//! `@path+` flags every entry read from the file.
//!
//! # Example
//!
//! ```
//! use got::core::repospec::{parse_extended, Repospec};
//!
//! let spec = Repospec::parse("corp:tools/build@v1.2").unwrap();
//! assert_eq!(spec.host.as_ref().map(|h| h.as_str()), Some("corp"));
//! assert_eq!(spec.name, "tools/build");
//! assert_eq!(spec.version.as_deref(), Some("v1.2"));
//!
//! let requests = parse_extended("tools/build+").unwrap();
//! assert!(requests[0].transitive);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use super::types::{HostName, RepoKey};

/// Errors from repospec parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepospecError {
    /// The token does not follow the repospec grammar.
    #[error("malformed repospec '{spec}': {reason}")]
    Malformed { spec: String, reason: String },

    /// An `@file` reference names a file that does not exist.
    #[error("repospec file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// An `@file` reference could not be read.
    #[error("cannot read repospec file {}: {message}", path.display())]
    FileRead { path: PathBuf, message: String },

    /// An `@file` reference includes itself, directly or indirectly.
    #[error("repospec file includes itself: {}", path.display())]
    RecursiveFile { path: PathBuf },
}

impl RepospecError {
    fn malformed(spec: &str, reason: impl Into<String>) -> Self {
        RepospecError::Malformed {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

/// A parsed repospec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repospec {
    /// Host serving the repository; `None` means search every host.
    pub host: Option<HostName>,
    /// Repository name, lower-cased. Never empty.
    pub name: String,
    /// Version pin, lower-cased; `None` means the default branch.
    pub version: Option<String>,
}

impl Repospec {
    /// Create a repospec from already-validated parts.
    pub fn new(host: Option<HostName>, name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            host,
            name: name.into(),
            version,
        }
    }

    /// Parse a base repospec (no `@file` or `+` handling).
    ///
    /// # Errors
    ///
    /// Returns [`RepospecError::Malformed`] if the host is invalid, the name
    /// is empty or contains characters outside `[A-Za-z0-9_./*-]`, or the
    /// version contains whitespace or one of `~ ^ :`.
    pub fn parse(input: &str) -> Result<Self, RepospecError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(RepospecError::malformed(input, "empty repospec"));
        }

        let (host, rest) = match raw.split_once(':') {
            Some(("", rest)) => (None, rest),
            Some((host, rest)) => {
                let host = HostName::new(host)
                    .map_err(|e| RepospecError::malformed(raw, e.to_string()))?;
                (Some(host), rest)
            }
            None => (None, raw),
        };

        let (name, version) = match rest.rsplit_once('@') {
            Some((name, "")) => (name, None),
            Some((name, version)) => (name, Some(version)),
            None => (rest, None),
        };

        if name.is_empty() {
            return Err(RepospecError::malformed(raw, "repository name cannot be empty"));
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '*')))
        {
            return Err(RepospecError::malformed(
                raw,
                format!("repository name cannot contain '{c}'"),
            ));
        }
        if name.split('/').any(str::is_empty) {
            return Err(RepospecError::malformed(
                raw,
                "repository name has an empty path segment",
            ));
        }

        if let Some(v) = version {
            if let Some(c) = v
                .chars()
                .find(|c| c.is_whitespace() || matches!(c, '~' | '^' | ':'))
            {
                return Err(RepospecError::malformed(
                    raw,
                    format!("version cannot contain '{c}'"),
                ));
            }
        }

        Ok(Self {
            host,
            name: name.to_ascii_lowercase(),
            version: version.map(str::to_ascii_lowercase),
        })
    }

    /// Whether any name segment contains a `*` wildcard.
    pub fn is_glob(&self) -> bool {
        self.name.split('/').any(|segment| segment.contains('*'))
    }

    /// The registry key, if the host is known.
    pub fn key(&self) -> Option<RepoKey> {
        self.host
            .as_ref()
            .map(|host| RepoKey::new(host.clone(), self.name.clone()))
    }

    /// This repospec with the given host filled in.
    pub fn with_host(mut self, host: HostName) -> Self {
        self.host = Some(host);
        self
    }

    /// The repospec without its host part (`name@version`).
    pub fn without_host(&self) -> String {
        match &self.version {
            Some(v) => format!("{}@{}", self.name, v),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Repospec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            write!(f, "{}:", host)?;
        }
        f.write_str(&self.name)?;
        if let Some(version) = &self.version {
            write!(f, "@{}", version)?;
        }
        Ok(())
    }
}

impl FromStr for Repospec {
    type Err = RepospecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One entry produced by extended parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepospecRequest {
    pub spec: Repospec,
    /// Expand to the dependency closure of `spec`.
    pub transitive: bool,
}

impl RepospecRequest {
    pub fn new(spec: Repospec, transitive: bool) -> Self {
        Self { spec, transitive }
    }
}

/// Parse an extended token relative to the current directory.
///
/// # Errors
///
/// Propagates [`RepospecError`] from the token itself or from any line of
/// a referenced file.
pub fn parse_extended(token: &str) -> Result<Vec<RepospecRequest>, RepospecError> {
    parse_extended_in(token, Path::new("."))
}

/// Parse an extended token, resolving relative `@file` paths against `base`.
///
/// Files referenced from inside another file resolve relative to the
/// directory of the referencing file.
pub fn parse_extended_in(token: &str, base: &Path) -> Result<Vec<RepospecRequest>, RepospecError> {
    let mut out = Vec::new();
    let mut open_files = HashSet::new();
    parse_token(token.trim(), base, false, &mut open_files, &mut out)?;
    Ok(out)
}

/// Parse every token in order, concatenating the results.
pub fn parse_all<'a>(
    tokens: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<RepospecRequest>, RepospecError> {
    let mut out = Vec::new();
    for token in tokens {
        out.extend(parse_extended(token)?);
    }
    Ok(out)
}

fn parse_token(
    token: &str,
    base: &Path,
    inherited_transitive: bool,
    open_files: &mut HashSet<PathBuf>,
    out: &mut Vec<RepospecRequest>,
) -> Result<(), RepospecError> {
    let (is_file, rest) = match token.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let (transitive, rest) = match rest.strip_suffix('+') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    let transitive = transitive || inherited_transitive;

    if !is_file {
        out.push(RepospecRequest::new(Repospec::parse(rest)?, transitive));
        return Ok(());
    }

    if rest.is_empty() {
        return Err(RepospecError::malformed(token, "missing file name after '@'"));
    }
    let path = base.join(rest);
    if !path.is_file() {
        return Err(RepospecError::FileNotFound { path });
    }
    let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
    if !open_files.insert(canonical.clone()) {
        return Err(RepospecError::RecursiveFile { path });
    }

    let content = fs::read_to_string(&path).map_err(|e| RepospecError::FileRead {
        path: path.clone(),
        message: e.to_string(),
    })?;
    let file_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| base.to_path_buf());

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        parse_token(line, &file_dir, transitive, open_files, out)?;
    }

    open_files.remove(&canonical);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn spec(s: &str) -> Repospec {
        Repospec::parse(s).expect("parse")
    }

    #[test]
    fn parse_name_only() {
        let s = spec("repo1");
        assert_eq!(s.host, None);
        assert_eq!(s.name, "repo1");
        assert_eq!(s.version, None);
    }

    #[test]
    fn parse_full() {
        let s = spec("bb:proj/repo@feature/x");
        assert_eq!(s.host, Some(HostName::new("bb").unwrap()));
        assert_eq!(s.name, "proj/repo");
        assert_eq!(s.version.as_deref(), Some("feature/x"));
    }

    #[test]
    fn empty_host_and_version_mean_unspecified() {
        let s = spec(":repo@");
        assert_eq!(s.host, None);
        assert_eq!(s.version, None);
    }

    #[test]
    fn version_splits_on_last_at() {
        let err = Repospec::parse("a@b@c").unwrap_err();
        assert!(matches!(err, RepospecError::Malformed { .. }));
    }

    #[test]
    fn name_is_lowercased() {
        assert_eq!(spec("Host:Proj/Repo").to_string(), "host:proj/repo");
    }

    #[test]
    fn version_is_lowercased() {
        assert_eq!(spec("repo@Release/V2").version.as_deref(), Some("release/v2"));
        assert_eq!(spec("repo@V2"), spec("repo@v2"));
    }

    #[test]
    fn empty_name_is_malformed() {
        for bad in ["", "host:", "host:@v1", "@v1", "  "] {
            let err = Repospec::parse(bad).unwrap_err();
            assert!(
                matches!(err, RepospecError::Malformed { .. }),
                "expected malformed for {bad:?}"
            );
        }
    }

    #[test]
    fn bad_characters_are_malformed() {
        assert!(Repospec::parse("bad host:repo").is_err());
        assert!(Repospec::parse("repo name").is_err());
        assert!(Repospec::parse("proj//repo").is_err());
        assert!(Repospec::parse("repo@v~1").is_err());
    }

    #[test]
    fn glob_detection() {
        assert!(spec("proj/*").is_glob());
        assert!(spec("proj/lib-*").is_glob());
        assert!(spec("*/repo").is_glob());
        assert!(!spec("proj/repo").is_glob());
    }

    #[test]
    fn display_roundtrips() {
        for s in ["repo", "h:repo", "h:p/r@v1", "p/r@main"] {
            assert_eq!(spec(s).to_string(), s);
        }
    }

    #[test]
    fn without_host_keeps_version() {
        assert_eq!(spec("h:p/r@v1").without_host(), "p/r@v1");
        assert_eq!(spec("h:p/r").without_host(), "p/r");
    }

    #[test]
    fn key_requires_host() {
        assert!(spec("repo").key().is_none());
        assert_eq!(spec("h:repo@v2").key().unwrap().to_string(), "h:repo");
    }

    #[test]
    fn transitive_suffix() {
        let reqs = parse_extended("h:repo+").expect("parse");
        assert_eq!(reqs.len(), 1);
        assert!(reqs[0].transitive);
        assert_eq!(reqs[0].spec.to_string(), "h:repo");

        let reqs = parse_extended("h:repo").expect("parse");
        assert!(!reqs[0].transitive);
    }

    #[test]
    fn file_indirection_reads_lines() {
        let temp = TempDir::new().expect("temp dir");
        fs::write(temp.path().join("list"), "repo1\n\n  h:repo2@v1  \nrepo3+\n\n").expect("write");

        let reqs = parse_extended_in("@list", temp.path()).expect("parse");
        let names: Vec<String> = reqs.iter().map(|r| r.spec.to_string()).collect();
        assert_eq!(names, vec!["repo1", "h:repo2@v1", "repo3"]);
        assert_eq!(
            reqs.iter().map(|r| r.transitive).collect::<Vec<_>>(),
            vec![false, false, true]
        );
    }

    #[test]
    fn file_indirection_with_transitive_suffix() {
        let temp = TempDir::new().expect("temp dir");
        fs::write(temp.path().join("list"), "repo1\nrepo2\n").expect("write");

        let reqs = parse_extended_in("@list+", temp.path()).expect("parse");
        assert!(reqs.iter().all(|r| r.transitive));
    }

    #[test]
    fn nested_files_resolve_relative_to_parent() {
        let temp = TempDir::new().expect("temp dir");
        let sub = temp.path().join("sub");
        fs::create_dir_all(&sub).expect("mkdir");
        fs::write(temp.path().join("outer"), "repo1\n@sub/inner\n").expect("write");
        fs::write(sub.join("inner"), "repo2\n").expect("write");

        let reqs = parse_extended_in("@outer", temp.path()).expect("parse");
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[1].spec.name, "repo2");
    }

    #[test]
    fn missing_file_is_reported() {
        let temp = TempDir::new().expect("temp dir");
        let err = parse_extended_in("@nope", temp.path()).unwrap_err();
        assert!(matches!(err, RepospecError::FileNotFound { .. }));
    }

    #[test]
    fn self_including_file_is_rejected() {
        let temp = TempDir::new().expect("temp dir");
        fs::write(temp.path().join("loop"), "repo1\n@loop\n").expect("write");

        let err = parse_extended_in("@loop", temp.path()).unwrap_err();
        assert!(matches!(err, RepospecError::RecursiveFile { .. }));
    }

    #[test]
    fn same_file_twice_is_not_recursion() {
        let temp = TempDir::new().expect("temp dir");
        fs::write(temp.path().join("a"), "repo1\n").expect("write");
        fs::write(temp.path().join("b"), "@a\n@a\n").expect("write");

        let reqs = parse_extended_in("@b", temp.path()).expect("parse");
        assert_eq!(reqs.len(), 2);
    }

    #[test]
    fn malformed_line_in_file_propagates() {
        let temp = TempDir::new().expect("temp dir");
        fs::write(temp.path().join("list"), "repo1\nbad host:x\n").expect("write");

        let err = parse_extended_in("@list", temp.path()).unwrap_err();
        assert!(matches!(err, RepospecError::Malformed { .. }));
    }
}
