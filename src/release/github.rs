//! GitHub releases over the REST API

use crate::config::{parse_repository_slug, DEFAULT_API_URL};
use crate::domain::TagName;
use crate::error::{Result, VersionGateError};
use crate::release::{Release, ReleaseRequest, ReleaseService};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

const API_VERSION: &str = "2022-11-28";

/// Page size when scanning the release list
const PER_PAGE: usize = 100;

#[derive(Serialize)]
struct CreateReleaseBody<'a> {
    tag_name: &'a str,
    name: &'a str,
    draft: bool,
    prerelease: bool,
    generate_release_notes: bool,
}

#[derive(Deserialize)]
struct ReleaseResponse {
    id: u64,
    tag_name: String,
    html_url: Option<String>,
}

impl From<ReleaseResponse> for Release {
    fn from(release: ReleaseResponse) -> Self {
        Self {
            id: release.id,
            tag_name: release.tag_name,
            html_url: release.html_url,
        }
    }
}

#[derive(Deserialize, Default)]
struct ValidationErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ValidationError>,
}

#[derive(Deserialize)]
struct ValidationError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    field: Option<String>,
}

impl ValidationErrorBody {
    fn is_already_exists(&self) -> bool {
        self.errors.iter().any(|e| {
            e.code.as_deref() == Some("already_exists")
                && e.field.as_deref().map_or(true, |f| f == "tag_name")
        })
    }
}

/// GitHub release service using a blocking reqwest client
pub struct GitHubReleases {
    http_client: Client,
    token: String,
    /// API base, e.g. `https://api.github.com`
    api_url: Url,
    owner: String,
    repo: String,
}

impl GitHubReleases {
    /// Create a client for `owner/repo`; `api_url` defaults to github.com
    pub fn new(token: &str, repository: &str, api_url: Option<&str>) -> Result<Self> {
        let (owner, repo) = parse_repository_slug(repository)?;
        let base = api_url.unwrap_or(DEFAULT_API_URL);
        let api_url = Url::parse(base)
            .map_err(|e| VersionGateError::config(format!("Invalid API URL '{base}': {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(VersionGateError::config(format!(
                "Invalid API URL '{base}': not a base URL"
            )));
        }

        let http_client = Client::builder()
            .user_agent(concat!("version-gate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                VersionGateError::release_unavailable(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            http_client,
            token: token.to_string(),
            api_url,
            owner,
            repo,
        })
    }

    /// `{api}/repos/{owner}/{repo}/releases/<extra...>`, each segment percent-encoded
    fn releases_url(&self, extra: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                VersionGateError::config(format!("Invalid API URL '{}'", self.api_url))
            })?
            .pop_if_empty()
            .extend(["repos", self.owner.as_str(), self.repo.as_str(), "releases"])
            .extend(extra);
        Ok(url)
    }

    /// Scan the release list for `tag`.
    ///
    /// `GET /releases/tags/{tag}` only sees published releases; the list also
    /// carries drafts.
    fn listed_release_exists(&self, tag: &TagName) -> Result<bool> {
        let mut page = 1usize;
        loop {
            let mut url = self.releases_url(&[])?;
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let response = self
                .authorized(self.http_client.get(url))
                .send()
                .map_err(|e| {
                    VersionGateError::release_unavailable(format!("Failed to list releases: {e}"))
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(VersionGateError::release_unavailable(format!(
                    "Release list returned {}",
                    status
                )));
            }

            let releases: Vec<ReleaseResponse> = response.json().map_err(|e| {
                VersionGateError::release_unavailable(format!("Failed to parse releases: {e}"))
            })?;
            debug!(page, count = releases.len(), "Scanned release list");

            if releases.iter().any(|r| r.tag_name == tag.as_str()) {
                return Ok(true);
            }
            if releases.len() < PER_PAGE {
                return Ok(false);
            }
            page += 1;
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn parse_release(response: Response) -> Result<Release> {
        let release: ReleaseResponse = response.json().map_err(|e| {
            VersionGateError::release_unavailable(format!("Failed to parse release: {e}"))
        })?;
        Ok(release.into())
    }
}

impl ReleaseService for GitHubReleases {
    fn release_exists(&self, tag: &TagName) -> Result<bool> {
        let url = self.releases_url(&["tags", tag.as_str()])?;

        let response = self
            .authorized(self.http_client.get(url))
            .send()
            .map_err(|e| {
                VersionGateError::release_unavailable(format!("Failed to look up release: {e}"))
            })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => self.listed_release_exists(tag),
            status => Err(VersionGateError::release_unavailable(format!(
                "Release lookup for '{}' returned {}",
                tag, status
            ))),
        }
    }

    fn create_release(&self, request: &ReleaseRequest) -> Result<Release> {
        let body = CreateReleaseBody {
            tag_name: request.tag.as_str(),
            name: &request.name,
            draft: request.draft,
            prerelease: request.prerelease,
            generate_release_notes: true,
        };

        let response = self
            .authorized(self.http_client.post(self.releases_url(&[])?))
            .json(&body)
            .send()
            .map_err(|e| {
                VersionGateError::release_unavailable(format!("Failed to create release: {e}"))
            })?;

        let status = response.status();
        if status.is_success() {
            let release = Self::parse_release(response)?;
            debug!(id = release.id, tag = %release.tag_name, "Release created");
            return Ok(release);
        }

        let text = response.text().unwrap_or_default();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let details: ValidationErrorBody = serde_json::from_str(&text).unwrap_or_default();
            if details.is_already_exists() {
                return Err(VersionGateError::DuplicateRelease(request.tag.to_string()));
            }
            return Err(VersionGateError::release_unavailable(format!(
                "Release for '{}' rejected ({}): {}",
                request.tag,
                status,
                details.message.unwrap_or(text)
            )));
        }

        Err(VersionGateError::release_unavailable(format!(
            "Release creation for '{}' returned {}: {}",
            request.tag, status, text
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ManifestVersion;
    use mockito::Matcher;

    fn tag(raw: &str) -> TagName {
        TagName::for_version("v", &ManifestVersion::new(raw).unwrap())
    }

    fn service(server: &mockito::Server) -> GitHubReleases {
        GitHubReleases::new("test-token", "acme/widget", Some(server.url().as_str())).unwrap()
    }

    #[test]
    fn test_create_release_requests_generated_notes() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/repos/acme/widget/releases")
            .match_header("authorization", "Bearer test-token")
            .match_header("x-github-api-version", API_VERSION)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "tag_name": "v2.1.0",
                "name": "v2.1.0",
                "generate_release_notes": true,
                "draft": false,
                "prerelease": false
            })))
            .with_status(201)
            .with_body(
                r#"{"id": 42, "tag_name": "v2.1.0", "html_url": "https://github.com/acme/widget/releases/tag/v2.1.0"}"#,
            )
            .expect(1)
            .create();

        let release = service(&server)
            .create_release(&ReleaseRequest::for_tag(tag("2.1.0")))
            .unwrap();

        mock.assert();
        assert_eq!(release.id, 42);
        assert_eq!(release.tag_name, "v2.1.0");
    }

    #[test]
    fn test_create_release_duplicate() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/repos/acme/widget/releases")
            .with_status(422)
            .with_body(
                r#"{"message": "Validation Failed", "errors": [{"resource": "Release", "code": "already_exists", "field": "tag_name"}]}"#,
            )
            .create();

        let err = service(&server)
            .create_release(&ReleaseRequest::for_tag(tag("2.1.0")))
            .unwrap_err();

        assert!(matches!(err, VersionGateError::DuplicateRelease(ref t) if t == "v2.1.0"));
        assert!(err.is_benign());
    }

    #[test]
    fn test_create_release_other_validation_error_is_fatal() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/repos/acme/widget/releases")
            .with_status(422)
            .with_body(r#"{"message": "Validation Failed", "errors": [{"code": "invalid", "field": "target_commitish"}]}"#)
            .create();

        let err = service(&server)
            .create_release(&ReleaseRequest::for_tag(tag("2.1.0")))
            .unwrap_err();

        assert!(matches!(err, VersionGateError::ReleaseServiceUnavailable(_)));
        assert!(!err.is_benign());
    }

    #[test]
    fn test_create_release_server_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/repos/acme/widget/releases")
            .with_status(503)
            .with_body("unavailable")
            .create();

        let err = service(&server)
            .create_release(&ReleaseRequest::for_tag(tag("2.1.0")))
            .unwrap_err();

        assert!(matches!(err, VersionGateError::ReleaseServiceUnavailable(_)));
        assert!(err.to_string().contains("503"));
    }

    fn release_page(page: usize) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("per_page".into(), PER_PAGE.to_string()),
            Matcher::UrlEncoded("page".into(), page.to_string()),
        ])
    }

    #[test]
    fn test_release_exists() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/repos/acme/widget/releases/tags/v1.0.0")
            .with_status(200)
            .with_body(r#"{"id": 1, "tag_name": "v1.0.0"}"#)
            .create();
        server
            .mock("GET", "/repos/acme/widget/releases/tags/v2.0.0")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create();
        server
            .mock("GET", "/repos/acme/widget/releases")
            .match_query(release_page(1))
            .with_status(200)
            .with_body(r#"[{"id": 1, "tag_name": "v1.0.0"}]"#)
            .create();

        let service = service(&server);
        assert!(service.release_exists(&tag("1.0.0")).unwrap());
        assert!(!service.release_exists(&tag("2.0.0")).unwrap());
    }

    #[test]
    fn test_draft_release_is_found_in_list() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/repos/acme/widget/releases/tags/v2.1.0")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create();
        let list = server
            .mock("GET", "/repos/acme/widget/releases")
            .match_query(release_page(1))
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(r#"[{"id": 9, "tag_name": "v2.1.0", "draft": true, "html_url": null}]"#)
            .expect(1)
            .create();

        assert!(service(&server).release_exists(&tag("2.1.0")).unwrap());
        list.assert();
    }

    #[test]
    fn test_release_list_is_paged() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/repos/acme/widget/releases/tags/v1.0.0")
            .with_status(404)
            .create();
        let full_page: Vec<_> = (0..PER_PAGE)
            .map(|i| serde_json::json!({"id": i + 100, "tag_name": format!("v2.0.{i}")}))
            .collect();
        server
            .mock("GET", "/repos/acme/widget/releases")
            .match_query(release_page(1))
            .with_status(200)
            .with_body(serde_json::Value::Array(full_page).to_string())
            .create();
        server
            .mock("GET", "/repos/acme/widget/releases")
            .match_query(release_page(2))
            .with_status(200)
            .with_body(r#"[{"id": 3, "tag_name": "v1.0.0", "draft": true}]"#)
            .create();

        assert!(service(&server).release_exists(&tag("1.0.0")).unwrap());
    }

    #[test]
    fn test_release_list_failure_is_unavailable() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/repos/acme/widget/releases/tags/v1.0.0")
            .with_status(404)
            .create();
        server
            .mock("GET", "/repos/acme/widget/releases")
            .match_query(release_page(1))
            .with_status(500)
            .create();

        let err = service(&server).release_exists(&tag("1.0.0")).unwrap_err();
        assert!(matches!(err, VersionGateError::ReleaseServiceUnavailable(_)));
    }

    #[test]
    fn test_releases_url_encodes_tag() {
        let service = GitHubReleases::new("t", "acme/widget", None).unwrap();

        let url = service.releases_url(&["tags", "v1.0.0#rc?1%"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/widget/releases/tags/v1.0.0%23rc%3F1%25"
        );
    }

    #[test]
    fn test_releases_url_keeps_enterprise_prefix() {
        let service =
            GitHubReleases::new("t", "acme/widget", Some("https://ghe.example.com/api/v3/"))
                .unwrap();

        assert_eq!(
            service.releases_url(&[]).unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/acme/widget/releases"
        );
    }

    #[test]
    fn test_release_lookup_unauthorized() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/repos/acme/widget/releases/tags/v1.0.0")
            .with_status(401)
            .create();

        let err = service(&server).release_exists(&tag("1.0.0")).unwrap_err();
        assert!(matches!(err, VersionGateError::ReleaseServiceUnavailable(_)));
    }

    #[test]
    fn test_new_rejects_bad_repository() {
        assert!(matches!(
            GitHubReleases::new("t", "widget", None),
            Err(VersionGateError::Config(_))
        ));
    }

    #[test]
    fn test_new_rejects_bad_api_url() {
        assert!(matches!(
            GitHubReleases::new("t", "acme/widget", Some("not a url")),
            Err(VersionGateError::Config(_))
        ));
        assert!(matches!(
            GitHubReleases::new("t", "acme/widget", Some("mailto:api@example.com")),
            Err(VersionGateError::Config(_))
        ));
    }
}
