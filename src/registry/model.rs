//! registry::model
//!
//! Persisted record types: hosts and clone records.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::repospec::Repospec;
use crate::core::template::{Template, TemplateError, NAME_PLACEHOLDER, USERNAME_PLACEHOLDER};
use crate::core::types::{HostKind, HostName, RepoKey};

/// A configured remote host.
///
/// The password is not part of the record; it lives in the secret store
/// under [`Host::password_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub name: HostName,
    #[serde(rename = "type")]
    pub kind: HostKind,
    /// Base URL, without a trailing `/`.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<PathBuf>,
    /// Clone-URL template (`%rs`, `%username`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_url: Option<String>,
    /// Replaces `<clone_root>/<host name>` for this host's clones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_root: Option<PathBuf>,
}

impl Host {
    /// Create a host with only the required fields.
    pub fn new(name: HostName, kind: HostKind, url: impl Into<String>) -> Self {
        Self {
            name,
            kind,
            url: normalize_url(url.into()),
            username: None,
            ssh_key_path: None,
            clone_url: None,
            clone_root: None,
        }
    }

    /// Secret store key holding this host's password.
    pub fn password_key(&self) -> String {
        password_key(&self.name)
    }

    /// Directory this host's clones go under.
    pub fn effective_clone_root(&self, clone_root: &Path) -> PathBuf {
        match &self.clone_root {
            Some(root) => root.clone(),
            None => clone_root.join(self.name.as_str()),
        }
    }

    /// Default on-disk location for a clone of `spec` from this host.
    ///
    /// Pinned requests get their own `name@version` directory.
    pub fn default_clone_path(&self, clone_root: &Path, spec: &Repospec) -> PathBuf {
        let leaf = match &spec.version {
            Some(version) => format!("{}@{}", spec.name, version),
            None => spec.name.clone(),
        };
        self.effective_clone_root(clone_root).join(leaf)
    }

    /// The parsed clone-URL template, if one is configured.
    pub fn clone_url_template(&self) -> Result<Option<Template>, TemplateError> {
        self.clone_url
            .as_deref()
            .map(|source| {
                let template = Template::parse(source)?;
                template.check_placeholders(&[NAME_PLACEHOLDER, USERNAME_PLACEHOLDER])?;
                Ok(template)
            })
            .transpose()
    }

    /// Render the clone-URL template for `name`, if one is configured.
    pub fn templated_clone_url(&self, name: &str) -> Result<Option<String>, TemplateError> {
        let username = self.username.as_deref().unwrap_or("");
        self.clone_url_template()?
            .map(|t| t.render(&[(NAME_PLACEHOLDER, name), (USERNAME_PLACEHOLDER, username)]))
            .transpose()
    }

    /// Recover a repository name from a URL using the clone-URL template.
    pub fn name_from_clone_url(&self, url: &str) -> Option<String> {
        let template = self.clone_url_template().ok()??;
        let username = self.username.as_deref().unwrap_or("");
        template.capture(url, &[(USERNAME_PLACEHOLDER, username)], NAME_PLACEHOLDER)
    }

    /// Apply a set of field updates.
    pub fn apply(&mut self, update: &HostUpdate) {
        if let Some(url) = &update.url {
            self.url = normalize_url(url.clone());
        }
        if let Some(username) = &update.username {
            self.username = username.clone();
        }
        if let Some(key) = &update.ssh_key_path {
            self.ssh_key_path = key.clone();
        }
        if let Some(template) = &update.clone_url {
            self.clone_url = template.clone();
        }
        if let Some(root) = &update.clone_root {
            self.clone_root = root.clone();
        }
    }
}

/// Secret store key for a host's password.
pub fn password_key(host: &HostName) -> String {
    format!("{}.password", host)
}

fn normalize_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Field updates for `edit-host`.
///
/// `None` leaves a field alone; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostUpdate {
    pub url: Option<String>,
    pub username: Option<Option<String>>,
    pub ssh_key_path: Option<Option<PathBuf>>,
    pub clone_url: Option<Option<String>>,
    pub clone_root: Option<Option<PathBuf>>,
}

impl HostUpdate {
    /// Whether this update can change the clone URLs the host produces.
    pub fn affects_clone_urls(&self) -> bool {
        self.url.is_some()
            || self.username.is_some()
            || self.ssh_key_path.is_some()
            || self.clone_url.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == HostUpdate::default()
    }
}

/// A registered local clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneRecord {
    pub host: HostName,
    pub name: String,
    /// Version pin recorded when the clone was created or registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub path: PathBuf,
}

impl CloneRecord {
    pub fn new(key: RepoKey, version: Option<String>, path: PathBuf) -> Self {
        Self {
            host: key.host,
            name: key.name,
            version,
            path,
        }
    }

    pub fn key(&self) -> RepoKey {
        RepoKey::new(self.host.clone(), self.name.clone())
    }

    /// The fully-qualified repospec for this clone, including any pin.
    pub fn repospec(&self) -> Repospec {
        Repospec::new(
            Some(self.host.clone()),
            self.name.clone(),
            self.version.clone(),
        )
    }

    /// Whether the recorded path is still a directory on disk.
    pub fn exists_on_disk(&self) -> bool {
        self.path.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Host {
        Host::new(
            HostName::new("bb").unwrap(),
            HostKind::Bitbucket,
            "https://scm.example.com/",
        )
    }

    #[test]
    fn url_trailing_slash_stripped() {
        assert_eq!(host().url, "https://scm.example.com");
    }

    #[test]
    fn effective_clone_root_defaults_under_host_name() {
        let h = host();
        assert_eq!(
            h.effective_clone_root(Path::new("/clones")),
            PathBuf::from("/clones/bb")
        );

        let mut h = host();
        h.clone_root = Some(PathBuf::from("/elsewhere"));
        assert_eq!(
            h.effective_clone_root(Path::new("/clones")),
            PathBuf::from("/elsewhere")
        );
    }

    #[test]
    fn default_clone_path_includes_pin() {
        let h = host();
        let spec = Repospec::parse("proj/repo@v1").unwrap();
        assert_eq!(
            h.default_clone_path(Path::new("/c"), &spec),
            PathBuf::from("/c/bb/proj/repo@v1")
        );
        let spec = Repospec::parse("proj/repo").unwrap();
        assert_eq!(
            h.default_clone_path(Path::new("/c"), &spec),
            PathBuf::from("/c/bb/proj/repo")
        );
    }

    #[test]
    fn templated_clone_url() {
        let mut h = host();
        assert_eq!(h.templated_clone_url("p/r").unwrap(), None);

        h.username = Some("alice".into());
        h.clone_url = Some("ssh://%username@scm/%rs.git".into());
        assert_eq!(
            h.templated_clone_url("p/r").unwrap().as_deref(),
            Some("ssh://alice@scm/p/r.git")
        );
        assert_eq!(
            h.name_from_clone_url("ssh://alice@scm/p/r.git").as_deref(),
            Some("p/r")
        );
    }

    #[test]
    fn bad_template_placeholder_rejected() {
        let mut h = host();
        h.clone_url = Some("ssh://scm/%repo.git".into());
        assert!(h.templated_clone_url("p/r").is_err());
    }

    #[test]
    fn apply_update_sets_and_clears() {
        let mut h = host();
        h.username = Some("alice".into());

        let update = HostUpdate {
            url: Some("https://new.example.com/".into()),
            username: Some(None),
            clone_url: Some(Some("%rs".into())),
            ..Default::default()
        };
        assert!(update.affects_clone_urls());
        h.apply(&update);

        assert_eq!(h.url, "https://new.example.com");
        assert_eq!(h.username, None);
        assert_eq!(h.clone_url.as_deref(), Some("%rs"));
    }

    #[test]
    fn clone_root_only_update_keeps_urls() {
        let update = HostUpdate {
            clone_root: Some(Some(PathBuf::from("/x"))),
            ..Default::default()
        };
        assert!(!update.affects_clone_urls());
        assert!(!update.is_empty());
        assert!(HostUpdate::default().is_empty());
    }

    #[test]
    fn clone_record_repospec() {
        let record = CloneRecord::new(
            RepoKey::new(HostName::new("bb").unwrap(), "p/r"),
            Some("v2".into()),
            PathBuf::from("/c/bb/p/r@v2"),
        );
        assert_eq!(record.repospec().to_string(), "bb:p/r@v2");
        assert_eq!(record.key().to_string(), "bb:p/r");
    }

    #[test]
    fn password_key_is_namespaced() {
        assert_eq!(host().password_key(), "bb.password");
    }
}
