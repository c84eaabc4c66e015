//! Core update resolution logic

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, instrument};

use crate::{
    analytics,
    cache::ReleaseCache,
    config::UpdateConfig,
    error::{UpdateResult, UpdateServiceError},
    manifest::rewrite_releases,
    provider::{
        GithubReleaseProvider, HttpManifestFetcher, ManifestFetcher, ReleaseProvider,
        build_http_client,
    },
    selector::AssetSelector,
    types::{Asset, Release, ReleasesManifest, UpdateDecision, UpdateResponse},
    utils::{
        clean_version, cleaned_version_string, is_older, parse_client_version, parse_linux_target,
    },
};

/// Cache key of the upstream latest release
pub const LATEST_RELEASE_KEY: &str = "latest-release";

/// Resolves update queries against the latest upstream release
pub struct UpdateResolver {
    config: UpdateConfig,
    cache: Arc<ReleaseCache>,
    provider: Arc<dyn ReleaseProvider>,
    fetcher: Arc<dyn ManifestFetcher>,
    analytics_enabled: bool,
}

impl UpdateResolver {
    pub fn new(
        config: UpdateConfig,
        cache: Arc<ReleaseCache>,
        provider: Arc<dyn ReleaseProvider>,
        fetcher: Arc<dyn ManifestFetcher>,
    ) -> Self {
        Self {
            config,
            cache,
            provider,
            fetcher,
            analytics_enabled: false,
        }
    }

    /// Wire the resolver to GitHub with a fresh cache
    #[instrument(skip_all, fields(repo = %config.repo))]
    pub fn from_config(config: UpdateConfig) -> Result<Self> {
        debug!("Initializing GitHub collaborators for {}", config.repo);

        let client = build_http_client(config.upstream_timeout)?;
        let provider = GithubReleaseProvider::new(
            client.clone(),
            config.github_api_url.clone(),
            config.repo.clone(),
            config.github_token.clone(),
        );
        let fetcher = HttpManifestFetcher::new(client);

        Ok(Self::new(
            config,
            Arc::new(ReleaseCache::new()),
            Arc::new(provider),
            Arc::new(fetcher),
        ))
    }

    /// Emit PostHog events for resolved queries
    pub fn with_analytics(mut self, enabled: bool) -> Self {
        self.analytics_enabled = enabled;
        self
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Latest release through the cache
    async fn latest_release(&self) -> UpdateResult<Arc<Release>> {
        let provider = self.provider.clone();
        self.cache
            .get_or_compute(
                LATEST_RELEASE_KEY,
                || async move { provider.fetch_latest().await },
                self.config.cache_ttl,
            )
            .await
            .ok_or_else(|| {
                error!("Latest release not found");
                UpdateServiceError::UpstreamUnavailable
            })
    }

    fn select_asset<'a>(
        release: &'a Release,
        selector: &AssetSelector,
    ) -> UpdateResult<&'a Asset> {
        selector.select(&release.assets).ok_or_else(|| {
            debug!(
                "No asset in release '{}' matches {} ({} assets)",
                release.name,
                selector,
                release.assets.len()
            );
            UpdateServiceError::AssetNotFound(selector.to_string())
        })
    }

    fn track_outcome<T>(
        &self,
        channel: &str,
        current_version: Option<&str>,
        result: &UpdateResult<T>,
        update_available: impl FnOnce(&T) -> bool,
    ) {
        if !self.analytics_enabled {
            return;
        }
        match result {
            Ok(value) => {
                analytics::track_update_check(channel, current_version, update_available(value))
            }
            Err(e) => analytics::track_update_check_failed(channel, current_version, e.kind()),
        }
    }

    /// Check whether a macOS client on `version` should update
    #[instrument(skip(self))]
    pub async fn check_mac_update(&self, version: &str) -> UpdateResult<UpdateDecision> {
        let result = self.resolve_mac_update(version).await;
        self.track_outcome("darwin", Some(version), &result, |decision| {
            matches!(decision, UpdateDecision::Available(_))
        });
        result
    }

    async fn resolve_mac_update(&self, version: &str) -> UpdateResult<UpdateDecision> {
        let current = parse_client_version(version)?;
        debug!("Parsed current version: {}", current);

        let release = self.latest_release().await?;
        let latest = clean_version(&release.name)
            .ok_or_else(|| UpdateServiceError::UnparseableReleaseName(release.name.clone()))?;

        if !is_older(&current, &latest) {
            debug!("Client {} is up to date (latest: {})", current, latest);
            return Ok(UpdateDecision::NoUpdate);
        }

        debug!("Update available: {} -> {}", current, latest);
        let selector = AssetSelector::Pattern(self.config.darwin_update_zip_pattern.clone());
        let asset = Self::select_asset(&release, &selector)?;

        Ok(UpdateDecision::Available(UpdateResponse::from_release(
            &release, asset, None,
        )))
    }

    /// Latest Windows portable package. There is no "up to date" outcome.
    #[instrument(skip(self))]
    pub async fn check_win32_portable(&self) -> UpdateResult<UpdateResponse> {
        let result = self.resolve_win32_portable().await;
        self.track_outcome("win32-portable", None, &result, |_| true);
        result
    }

    async fn resolve_win32_portable(&self) -> UpdateResult<UpdateResponse> {
        let release = self.latest_release().await?;
        let selector = AssetSelector::Pattern(self.config.win32_zip_pattern.clone());
        let asset = Self::select_asset(&release, &selector)?;
        let version = cleaned_version_string(&release.name)?;

        Ok(UpdateResponse::from_release(&release, asset, Some(version)))
    }

    /// Squirrel `RELEASES` manifest with file names rewritten to absolute URLs
    #[instrument(skip(self))]
    pub async fn get_win32_releases_manifest(&self) -> UpdateResult<ReleasesManifest> {
        let result = self.resolve_win32_releases_manifest().await;
        if self.analytics_enabled {
            match &result {
                Ok(manifest) => analytics::track_manifest_request(manifest.body.lines().count()),
                Err(e) => analytics::track_update_check_failed("win32-releases", None, e.kind()),
            }
        }
        result
    }

    async fn resolve_win32_releases_manifest(&self) -> UpdateResult<ReleasesManifest> {
        let release = self.latest_release().await?;
        let selector = AssetSelector::exact(ReleasesManifest::FILE_NAME);
        let asset = Self::select_asset(&release, &selector)?;
        let latest_version = cleaned_version_string(&release.name)?;

        debug!("Fetching RELEASES from {}", asset.browser_download_url);
        let body = self
            .fetcher
            .get_text(&asset.browser_download_url)
            .await
            .map_err(|e| UpdateServiceError::NetworkFailure(format!("{:#}", e)))?;

        let body = rewrite_releases(&body, &asset.browser_download_url, &latest_version)?;
        Ok(ReleasesManifest { body })
    }

    /// Latest linux package for `arch`/`pkg`. There is no "up to date" outcome.
    #[instrument(skip(self))]
    pub async fn check_linux_update(
        &self,
        arch: Option<&str>,
        pkg: Option<&str>,
    ) -> UpdateResult<UpdateResponse> {
        let result = self.resolve_linux_update(arch, pkg).await;
        self.track_outcome("linux", None, &result, |_| true);
        result
    }

    async fn resolve_linux_update(
        &self,
        arch: Option<&str>,
        pkg: Option<&str>,
    ) -> UpdateResult<UpdateResponse> {
        let (arch, pkg) = parse_linux_target(arch, pkg)?;

        let release = self.latest_release().await?;
        let selector = AssetSelector::contains_all([pkg.as_str(), arch.as_str()]);
        let asset = Self::select_asset(&release, &selector)?;
        let version = cleaned_version_string(&release.name)?;

        Ok(UpdateResponse::from_release(&release, asset, Some(version)))
    }
}
