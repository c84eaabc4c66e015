//! Upstream collaborators: the release metadata source and the manifest fetcher

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Client, header};
use tracing::{debug, instrument};

use crate::{config::GithubRepo, types::Release};

const USER_AGENT: &str = concat!("be-update-resolver/", env!("CARGO_PKG_VERSION"));

/// Source of the latest published release. Called uncached; the resolver
/// wraps it with the release cache.
#[async_trait]
pub trait ReleaseProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Release>;
}

/// Fetches the raw text of a `RELEASES` manifest
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}

/// Build the shared HTTP client used by the GitHub collaborators
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Reads the latest release from the GitHub Releases API
#[derive(Clone)]
pub struct GithubReleaseProvider {
    client: Client,
    api_url: String,
    repo: GithubRepo,
    token: Option<String>,
}

impl GithubReleaseProvider {
    pub fn new(client: Client, api_url: String, repo: GithubRepo, token: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            repo,
            token,
        }
    }

    fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_url, self.repo.owner, self.repo.name
        )
    }
}

#[async_trait]
impl ReleaseProvider for GithubReleaseProvider {
    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn fetch_latest(&self) -> Result<Release> {
        let url = self.latest_release_url();
        debug!("Fetching latest release from {}", url);

        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to fetch latest release from {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("GitHub API returned {} for {}: {}", status, url, body);
        }

        let release: Release = response
            .json()
            .await
            .context("Failed to parse GitHub release JSON")?;

        debug!(
            "Fetched release '{}' with {} assets",
            release.name,
            release.assets.len()
        );
        Ok(release)
    }
}

/// Plain HTTP GET returning the body as text
#[derive(Clone)]
pub struct HttpManifestFetcher {
    client: Client,
}

impl HttpManifestFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    #[instrument(skip(self))]
    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request {}", url))?
            .error_for_status()
            .with_context(|| format!("Unexpected status for {}", url))?;

        let text = response
            .text()
            .await
            .context("Failed to read manifest body")?;
        debug!("Fetched manifest (length: {})", text.len());
        Ok(text)
    }
}
