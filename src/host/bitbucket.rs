//! host::bitbucket
//!
//! Bitbucket Server adapter over the REST API (`/rest/api/1.0`).
//!
//! # Authentication
//!
//! - username + password: HTTP basic auth; every capability available
//! - SSH key only: no API access; clone URLs must come from a template,
//!   and glob expansion is unsupported
//!
//! When both a key and a password are configured the SSH clone link is
//! preferred.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::traits::{HostAdapter, HostError};
use crate::registry::Host;

const API_PREFIX: &str = "rest/api/1.0";
const PAGE_LIMIT: u32 = 100;
const USER_AGENT_VALUE: &str = concat!("got/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct RepoResponse {
    #[serde(rename = "scmId")]
    scm_id: String,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    clone: Vec<CloneLink>,
}

#[derive(Debug, Deserialize)]
struct CloneLink {
    name: String,
    href: String,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    values: Vec<T>,
    #[serde(rename = "isLastPage", default = "default_true")]
    is_last_page: bool,
    #[serde(rename = "nextPageStart")]
    next_page_start: Option<u32>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RepoSummary {
    #[serde(default)]
    slug: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    message: String,
}

/// Bitbucket Server host.
#[derive(Debug, Clone)]
pub struct BitbucketHost {
    client: Client,
    host: Host,
    password: Option<String>,
}

impl BitbucketHost {
    /// Create an adapter. `password` comes from the secret store.
    pub fn new(host: &Host, password: Option<String>) -> Result<Self, HostError> {
        host.clone_url_template()?;
        Ok(Self {
            client: Client::new(),
            host: host.clone(),
            password,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.host.url, API_PREFIX, path)
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers
    }

    fn get(&self, url: &str, password: &str) -> RequestBuilder {
        let username = self.host.username.as_deref().unwrap_or_default();
        self.client
            .get(url)
            .headers(Self::headers())
            .basic_auth(username, Some(password))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, HostError> {
        request
            .send()
            .await
            .map_err(|e| HostError::Unreachable(format!("{}: {}", self.host.url, e)))
    }

    fn split_name(name: &str) -> Result<(&str, &str), HostError> {
        match name.split_once('/') {
            Some((project, repo)) if !project.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok((project, repo))
            }
            _ => Err(HostError::InvalidName(
                "Expected repository name of the form <project>/<repository>".into(),
            )),
        }
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        response: Response,
        what: &str,
    ) -> Result<T, HostError> {
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| HostError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(Self::handle_error_response(response, status, what).await)
        }
    }

    async fn handle_error_response(response: Response, status: StatusCode, what: &str) -> HostError {
        // Only the first line; some servers append a captcha notice.
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body
                .errors
                .first()
                .and_then(|e| e.message.lines().next())
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HostError::AuthFailed(message),
            StatusCode::NOT_FOUND => HostError::NotFound(format!("{}: {}", what, message)),
            _ if status.is_server_error() => HostError::ApiError {
                status: status.as_u16(),
                message: format!("Bitbucket server error: {}", message),
            },
            _ => HostError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }

    fn api_password(&self, purpose: &str, remedy: &str) -> Result<&str, HostError> {
        self.password.as_deref().ok_or_else(|| {
            HostError::Unsupported(format!(
                "Unable to access Bitbucket API to {} -- host `{}' must be configured with {}",
                purpose, self.host.name, remedy
            ))
        })
    }

    async fn list_project(&self, project: &str, password: &str) -> Result<Vec<String>, HostError> {
        let mut names = Vec::new();
        let mut start = 0;
        loop {
            let url = self.api_url(&format!("projects/{}/repos", project));
            let request = self
                .get(&url, password)
                .query(&[("start", start), ("limit", PAGE_LIMIT)]);
            let page: Page<RepoSummary> =
                Self::handle_response(self.send(request).await?, &format!("project {}", project))
                    .await?;

            names.extend(page.values.into_iter().map(|r| r.slug.unwrap_or(r.name)));

            match page.next_page_start {
                Some(next) if !page.is_last_page => start = next,
                _ => break,
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl HostAdapter for BitbucketHost {
    fn kind(&self) -> &'static str {
        "bitbucket"
    }

    async fn resolve_clone_url(&self, name: &str) -> Result<String, HostError> {
        let (project, repo) = Self::split_name(name)?;

        if let Some(url) = self.host.templated_clone_url(name)? {
            return Ok(url);
        }
        let password = self.api_password(
            "determine clone URL",
            "a manual clone URL or a username/password",
        )?;

        let url = self.api_url(&format!("projects/{}/repos/{}", project, repo));
        let data: RepoResponse =
            Self::handle_response(self.send(self.get(&url, password)).await?, name).await?;

        if data.scm_id != "git" {
            return Err(HostError::Unsupported(format!(
                "{} is not a git repository ({})",
                name, data.scm_id
            )));
        }

        let link = |kind: &str| {
            data.links
                .clone
                .iter()
                .find(|l| l.name == kind)
                .map(|l| l.href.clone())
        };
        let chosen = if self.host.ssh_key_path.is_some() {
            link("ssh").or_else(|| link("http"))
        } else {
            link("http")
        };
        chosen.ok_or_else(|| HostError::NotFound(format!("{}: no compatible clone links found", name)))
    }

    async fn expand_glob(&self, pattern: &str) -> Result<Vec<String>, HostError> {
        let (project, repo_pattern) = Self::split_name(pattern)?;
        if project.contains('*') {
            return Err(HostError::Unsupported(
                "wildcards are only supported in the repository segment".into(),
            ));
        }
        let matcher = glob::Pattern::new(repo_pattern)
            .map_err(|e| HostError::InvalidName(format!("bad pattern '{}': {}", pattern, e)))?;
        let password = self.api_password("query project repository list", "a username/password")?;

        let mut names: Vec<String> = self
            .list_project(project, password)
            .await?
            .into_iter()
            .map(|slug| slug.to_ascii_lowercase())
            .filter(|slug| matcher.matches(slug))
            .map(|slug| format!("{}/{}", project, slug))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn validate(&self) -> Result<(), HostError> {
        let Some(password) = self.password.as_deref() else {
            if self.host.ssh_key_path.is_none() {
                return Err(HostError::AuthFailed(
                    "Either a password or an SSH key is required for Bitbucket access".into(),
                ));
            }
            return Ok(());
        };

        let url = self.api_url("projects");
        let request = self.get(&url, password).query(&[("limit", 1)]);
        let response = self.send(request).await?;
        match Self::handle_response::<serde_json::Value>(response, "projects").await {
            Ok(_) => Ok(()),
            Err(HostError::NotFound(_)) => Err(HostError::Unreachable(format!(
                "Unable to connect to Bitbucket at {}",
                self.host.url
            ))),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{HostKind, HostName};
    use serde_json::json;
    use std::path::PathBuf;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn host(url: &str) -> Host {
        let mut h = Host::new(HostName::new("bb").unwrap(), HostKind::Bitbucket, url);
        h.username = Some("alice".into());
        h
    }

    fn repo_body(http: &str, ssh: &str) -> serde_json::Value {
        json!({
            "slug": "repo",
            "scmId": "git",
            "links": {
                "clone": [
                    {"name": "http", "href": http},
                    {"name": "ssh", "href": ssh}
                ]
            }
        })
    }

    #[tokio::test]
    async fn resolves_http_link_with_password() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/1.0/projects/proj/repos/repo"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_body(
                "https://scm/scm/proj/repo.git",
                "ssh://git@scm:7999/proj/repo.git",
            )))
            .mount(&server)
            .await;

        let adapter = BitbucketHost::new(&host(&server.uri()), Some("pw".into())).unwrap();
        let url = adapter.resolve_clone_url("proj/repo").await.unwrap();
        assert_eq!(url, "https://scm/scm/proj/repo.git");
    }

    #[tokio::test]
    async fn prefers_ssh_link_with_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/1.0/projects/proj/repos/repo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_body(
                "https://scm/scm/proj/repo.git",
                "ssh://git@scm:7999/proj/repo.git",
            )))
            .mount(&server)
            .await;

        let mut h = host(&server.uri());
        h.ssh_key_path = Some(PathBuf::from("/home/alice/.ssh/id_ed25519"));
        let adapter = BitbucketHost::new(&h, Some("pw".into())).unwrap();
        let url = adapter.resolve_clone_url("proj/repo").await.unwrap();
        assert_eq!(url, "ssh://git@scm:7999/proj/repo.git");
    }

    #[tokio::test]
    async fn missing_repository_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/1.0/projects/proj/repos/nope"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errors": [{"message": "Repository proj/nope does not exist.\nmore"}]
            })))
            .mount(&server)
            .await;

        let adapter = BitbucketHost::new(&host(&server.uri()), Some("pw".into())).unwrap();
        let err = adapter.resolve_clone_url("proj/nope").await.unwrap_err();
        match err {
            HostError::NotFound(msg) => {
                assert!(msg.contains("does not exist"));
                assert!(!msg.contains("more"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_credentials_are_auth_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let adapter = BitbucketHost::new(&host(&server.uri()), Some("bad".into())).unwrap();
        let err = adapter.resolve_clone_url("proj/repo").await.unwrap_err();
        assert!(matches!(err, HostError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn non_git_repository_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/1.0/projects/proj/repos/hgrepo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "scmId": "hg",
                "links": {"clone": []}
            })))
            .mount(&server)
            .await;

        let adapter = BitbucketHost::new(&host(&server.uri()), Some("pw".into())).unwrap();
        let err = adapter.resolve_clone_url("proj/hgrepo").await.unwrap_err();
        assert!(err.to_string().contains("not a git repository"));
    }

    #[tokio::test]
    async fn template_skips_api() {
        let mut h = host("http://127.0.0.1:9");
        h.clone_url = Some("ssh://git@scm/%rs.git".into());
        let adapter = BitbucketHost::new(&h, None).unwrap();
        assert_eq!(
            adapter.resolve_clone_url("proj/repo").await.unwrap(),
            "ssh://git@scm/proj/repo.git"
        );
    }

    #[tokio::test]
    async fn no_password_no_template_is_unsupported() {
        let adapter = BitbucketHost::new(&host("http://127.0.0.1:9"), None).unwrap();
        let err = adapter.resolve_clone_url("proj/repo").await.unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("manual clone URL"));
    }

    #[tokio::test]
    async fn name_needs_project_segment() {
        let adapter = BitbucketHost::new(&host("http://127.0.0.1:9"), Some("pw".into())).unwrap();
        for bad in ["repo", "a/b/c", "/repo"] {
            let err = adapter.resolve_clone_url(bad).await.unwrap_err();
            assert!(matches!(err, HostError::InvalidName(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn glob_pages_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/1.0/projects/proj/repos"))
            .and(query_param("start", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [{"slug": "repo2", "name": "Repo2"}, {"slug": "tools", "name": "tools"}],
                "isLastPage": false,
                "nextPageStart": 2
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/api/1.0/projects/proj/repos"))
            .and(query_param("start", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [{"slug": "repo1", "name": "repo1"}],
                "isLastPage": true
            })))
            .mount(&server)
            .await;

        let adapter = BitbucketHost::new(&host(&server.uri()), Some("pw".into())).unwrap();
        let names = adapter.expand_glob("proj/repo*").await.unwrap();
        assert_eq!(names, vec!["proj/repo1", "proj/repo2"]);

        let all = adapter.expand_glob("proj/*").await.unwrap();
        assert_eq!(all, vec!["proj/repo1", "proj/repo2", "proj/tools"]);
    }

    #[tokio::test]
    async fn glob_without_password_is_unsupported() {
        let mut h = host("http://127.0.0.1:9");
        h.ssh_key_path = Some(PathBuf::from("/k"));
        let adapter = BitbucketHost::new(&h, None).unwrap();
        assert!(adapter.expand_glob("proj/*").await.unwrap_err().is_unsupported());
    }

    #[tokio::test]
    async fn glob_in_project_segment_is_unsupported() {
        let adapter = BitbucketHost::new(&host("http://127.0.0.1:9"), Some("pw".into())).unwrap();
        assert!(adapter.expand_glob("*/repo").await.unwrap_err().is_unsupported());
    }

    #[tokio::test]
    async fn validate_checks_project_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/1.0/projects"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": []})))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = BitbucketHost::new(&host(&server.uri()), Some("pw".into())).unwrap();
        adapter.validate().await.unwrap();
    }

    #[tokio::test]
    async fn validate_404_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let adapter = BitbucketHost::new(&host(&server.uri()), Some("pw".into())).unwrap();
        assert!(matches!(
            adapter.validate().await.unwrap_err(),
            HostError::Unreachable(_)
        ));
    }

    #[tokio::test]
    async fn validate_without_credentials() {
        let adapter = BitbucketHost::new(&host("http://127.0.0.1:9"), None).unwrap();
        assert!(matches!(
            adapter.validate().await.unwrap_err(),
            HostError::AuthFailed(_)
        ));

        let mut h = host("http://127.0.0.1:9");
        h.ssh_key_path = Some(PathBuf::from("/k"));
        let adapter = BitbucketHost::new(&h, None).unwrap();
        adapter.validate().await.unwrap();
    }
}
