//! Version resolution.
//!
//! An explicit version is trusted as-is. An empty request asks the tool's
//! upstream for its newest release through a [`ReleaseSource`].

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::types::{Tool, VersionSource};

#[derive(Debug, Error)]
pub enum VersionResolutionError {
    #[error("{tool} does not name a GitHub owner/repository to query")]
    MissingRepository { tool: String },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no published releases found at {url}")]
    NoReleases { url: String },

    #[error("rate limited by {url}; set GITHUB_TOKEN to raise the limit")]
    RateLimited { url: String },

    #[error("unexpected HTTP {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
}

// ============================================================================
// Release Sources
// ============================================================================

/// Looks up the newest published version of a tool.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn latest_version(&self, tool: &Tool) -> Result<String, VersionResolutionError>;
}

/// GitHub release metadata; only the tag matters here.
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// Queries the GitHub releases API or a plain-text version URL.
pub struct HttpReleaseSource {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl HttpReleaseSource {
    pub fn new(client: Client, api_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn github_latest(&self, tool: &Tool) -> Result<String, VersionResolutionError> {
        let (Some(owner), Some(repo)) = (tool.owner.as_deref(), tool.repo.as_deref()) else {
            return Err(VersionResolutionError::MissingRepository {
                tool: tool.name.clone(),
            });
        };
        let url = format!("{}/repos/{}/{}/releases/latest", self.api_url, owner, repo);
        debug!(%url, "Fetching latest GitHub release");

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|source| VersionResolutionError::Network {
                url: url.clone(),
                source,
            })?;
        check_status(&response, &url)?;

        let release: Release =
            response
                .json()
                .await
                .map_err(|e| VersionResolutionError::InvalidResponse {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;

        non_empty(release.tag_name, &url)
    }

    async fn plain_text_latest(&self, url: &str) -> Result<String, VersionResolutionError> {
        debug!(%url, "Fetching latest version from URL");

        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|source| VersionResolutionError::Network {
                    url: url.to_string(),
                    source,
                })?;
        check_status(&response, url)?;

        let body = response
            .text()
            .await
            .map_err(|source| VersionResolutionError::Network {
                url: url.to_string(),
                source,
            })?;

        let version = body.lines().next().unwrap_or_default().trim().to_string();
        if version.contains(char::is_whitespace) || version.len() > 128 {
            return Err(VersionResolutionError::InvalidResponse {
                url: url.to_string(),
                reason: "body is not a version string".to_string(),
            });
        }
        non_empty(version, url)
    }
}

#[async_trait]
impl ReleaseSource for HttpReleaseSource {
    async fn latest_version(&self, tool: &Tool) -> Result<String, VersionResolutionError> {
        match &tool.version_source {
            VersionSource::GithubRelease => self.github_latest(tool).await,
            VersionSource::Url { url } => self.plain_text_latest(url).await,
            VersionSource::Pinned { version } => Ok(version.clone()),
        }
    }
}

fn check_status(response: &reqwest::Response, url: &str) -> Result<(), VersionResolutionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let limit_exhausted = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");

    Err(match status {
        StatusCode::NOT_FOUND => VersionResolutionError::NoReleases {
            url: url.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => VersionResolutionError::RateLimited {
            url: url.to_string(),
        },
        StatusCode::FORBIDDEN if limit_exhausted => VersionResolutionError::RateLimited {
            url: url.to_string(),
        },
        _ => VersionResolutionError::UnexpectedStatus {
            url: url.to_string(),
            status: status.as_u16(),
        },
    })
}

fn non_empty(version: String, url: &str) -> Result<String, VersionResolutionError> {
    let version = version.trim().to_string();
    if version.is_empty() {
        return Err(VersionResolutionError::NoReleases {
            url: url.to_string(),
        });
    }
    Ok(version)
}

// ============================================================================
// Resolver
// ============================================================================

/// Turns a requested version (possibly empty) into a concrete one.
#[derive(Clone)]
pub struct VersionResolver {
    source: Arc<dyn ReleaseSource>,
}

impl VersionResolver {
    pub fn new(source: Arc<dyn ReleaseSource>) -> Self {
        Self { source }
    }

    pub async fn resolve(
        &self,
        tool: &Tool,
        requested: &str,
    ) -> Result<String, VersionResolutionError> {
        let requested = requested.trim();
        if !requested.is_empty() {
            return Ok(requested.to_string());
        }

        if let VersionSource::Pinned { version } = &tool.version_source {
            debug!(tool = %tool.name, %version, "Using pinned version");
            return Ok(version.clone());
        }

        let version = self.source.latest_version(tool).await?;
        info!(tool = %tool.name, %version, "Resolved latest version");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct CountingSource {
        calls: AtomicUsize,
        version: &'static str,
    }

    #[async_trait]
    impl ReleaseSource for CountingSource {
        async fn latest_version(&self, _tool: &Tool) -> Result<String, VersionResolutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.version.to_string())
        }
    }

    fn counting(version: &'static str) -> Arc<CountingSource> {
        Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            version,
        })
    }

    fn github_tool() -> Tool {
        Tool::new("kind", "", "https://example.com/kind").github("kubernetes-sigs", "kind")
    }

    #[tokio::test]
    async fn test_explicit_version_skips_source() {
        let source = counting("v9.9.9");
        let resolver = VersionResolver::new(source.clone());

        let version = resolver.resolve(&github_tool(), "v0.20.0").await.unwrap();
        assert_eq!(version, "v0.20.0");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_version_queries_source_each_time() {
        let source = counting("1.29.1");
        let resolver = VersionResolver::new(source.clone());

        assert_eq!(resolver.resolve(&github_tool(), "").await.unwrap(), "1.29.1");
        assert_eq!(resolver.resolve(&github_tool(), "  ").await.unwrap(), "1.29.1");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pinned_version_skips_source() {
        let source = counting("unused");
        let resolver = VersionResolver::new(source.clone());
        let tool = Tool::new("kustomize", "", "https://example.com/k").pinned("v5.4.3");

        assert_eq!(resolver.resolve(&tool, "").await.unwrap(), "v5.4.3");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_github_latest_release() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/kubernetes-sigs/kind/releases/latest"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "tag_name": "v0.23.0", "name": "v0.23.0" })),
            )
            .mount(&server)
            .await;

        let source = HttpReleaseSource::new(Client::new(), &server.uri(), Some("secret".into()));
        let version = source.latest_version(&github_tool()).await.unwrap();
        assert_eq!(version, "v0.23.0");
    }

    #[tokio::test]
    async fn test_github_not_found_is_no_releases() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpReleaseSource::new(Client::new(), &server.uri(), None);
        let err = source.latest_version(&github_tool()).await.unwrap_err();
        assert!(matches!(err, VersionResolutionError::NoReleases { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_github_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-remaining", "0"))
            .mount(&server)
            .await;

        let source = HttpReleaseSource::new(Client::new(), &server.uri(), None);
        let err = source.latest_version(&github_tool()).await.unwrap_err();
        assert!(matches!(err, VersionResolutionError::RateLimited { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_github_forbidden_without_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let source = HttpReleaseSource::new(Client::new(), &server.uri(), None);
        let err = source.latest_version(&github_tool()).await.unwrap_err();
        assert!(
            matches!(err, VersionResolutionError::UnexpectedStatus { status: 403, .. }),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn test_github_bad_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let source = HttpReleaseSource::new(Client::new(), &server.uri(), None);
        let err = source.latest_version(&github_tool()).await.unwrap_err();
        assert!(matches!(err, VersionResolutionError::InvalidResponse { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_missing_repository() {
        let source = HttpReleaseSource::new(Client::new(), "http://127.0.0.1:9", None);
        let tool = Tool::new("orphan", "", "https://example.com/orphan");
        let err = source.latest_version(&tool).await.unwrap_err();
        assert!(matches!(err, VersionResolutionError::MissingRepository { .. }));
    }

    #[tokio::test]
    async fn test_plain_text_version_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/release/stable.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("v1.29.1\n"))
            .mount(&server)
            .await;

        let tool = Tool::new("kubectl", "", "https://example.com/kubectl")
            .version_url(&format!("{}/release/stable.txt", server.uri()));
        let source = HttpReleaseSource::new(Client::new(), "http://127.0.0.1:9", None);
        assert_eq!(source.latest_version(&tool).await.unwrap(), "v1.29.1");
    }

    #[tokio::test]
    async fn test_plain_text_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        let tool = Tool::new("kubectl", "", "https://example.com/kubectl")
            .version_url(&format!("{}/stable.txt", server.uri()));
        let source = HttpReleaseSource::new(Client::new(), "http://127.0.0.1:9", None);
        let err = source.latest_version(&tool).await.unwrap_err();
        assert!(matches!(err, VersionResolutionError::NoReleases { .. }), "{err:?}");
    }
}
