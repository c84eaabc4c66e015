//! Update service configuration
//!
//! ## Environment Variables
//!
//! - `RELEASES_GITHUB_REPO`: repository publishing the releases, as `owner/repo` (required)
//! - `GITHUB_TOKEN`: API token, raises the GitHub rate limit (optional)
//! - `GITHUB_API_URL`: API base URL (default: "https://api.github.com")
//! - `DARWIN_UPDATE_ZIP_PATTERN`: regex selecting the macOS update zip (default: `-mac\.zip$`)
//! - `WIN32_ZIP_PATTERN`: regex selecting the Windows portable zip (default: `-win32.*\.zip$`)
//! - `RELEASE_CACHE_TTL_SECS`: how long the latest release is reused (default: 600)
//! - `UPSTREAM_TIMEOUT_SECS`: timeout for upstream HTTP requests (default: 30)

use std::{fmt, str::FromStr, time::Duration};

use regex::Regex;
use thiserror::Error;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_DARWIN_UPDATE_ZIP_PATTERN: &str = r"-mac\.zip$";
pub const DEFAULT_WIN32_ZIP_PATTERN: &str = r"-win32.*\.zip$";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

impl ConfigError {
    pub fn missing_env_var(var_name: impl Into<String>) -> Self {
        Self::MissingEnvVar(var_name.into())
    }

    pub fn invalid(var: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Invalid {
            var: var.into(),
            reason: reason.to_string(),
        }
    }
}

/// GitHub repository coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRepo {
    pub owner: String,
    pub name: String,
}

impl FromStr for GithubRepo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(GithubRepo {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(format!("'{}' is not in 'owner/repo' format", s)),
        }
    }
}

impl fmt::Display for GithubRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub repo: GithubRepo,
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub darwin_update_zip_pattern: Regex,
    pub win32_zip_pattern: Regex,
    pub cache_ttl: Duration,
    pub upstream_timeout: Duration,
}

impl UpdateConfig {
    /// Configuration with default patterns and timings for `repo`
    pub fn new(repo: GithubRepo) -> Self {
        Self {
            repo,
            github_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            darwin_update_zip_pattern: Regex::new(DEFAULT_DARWIN_UPDATE_ZIP_PATTERN)
                .expect("default darwin pattern is valid"),
            win32_zip_pattern: Regex::new(DEFAULT_WIN32_ZIP_PATTERN)
                .expect("default win32 pattern is valid"),
            cache_ttl: DEFAULT_CACHE_TTL,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    /// Create configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `RELEASES_GITHUB_REPO` is not set and
    /// `ConfigError::Invalid` if any value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let repo = non_empty("RELEASES_GITHUB_REPO")
            .ok_or_else(|| ConfigError::missing_env_var("RELEASES_GITHUB_REPO"))?
            .parse::<GithubRepo>()
            .map_err(|e| ConfigError::invalid("RELEASES_GITHUB_REPO", e))?;

        let mut config = Self::new(repo);
        config.github_token = non_empty("GITHUB_TOKEN");

        if let Some(url) = non_empty("GITHUB_API_URL") {
            config.github_api_url = url;
        }
        if let Some(pattern) = non_empty("DARWIN_UPDATE_ZIP_PATTERN") {
            config.darwin_update_zip_pattern = Regex::new(&pattern)
                .map_err(|e| ConfigError::invalid("DARWIN_UPDATE_ZIP_PATTERN", e))?;
        }
        if let Some(pattern) = non_empty("WIN32_ZIP_PATTERN") {
            config.win32_zip_pattern =
                Regex::new(&pattern).map_err(|e| ConfigError::invalid("WIN32_ZIP_PATTERN", e))?;
        }
        if let Some(secs) = non_empty("RELEASE_CACHE_TTL_SECS") {
            config.cache_ttl = parse_secs("RELEASE_CACHE_TTL_SECS", &secs)?;
        }
        if let Some(secs) = non_empty("UPSTREAM_TIMEOUT_SECS") {
            config.upstream_timeout = parse_secs("UPSTREAM_TIMEOUT_SECS", &secs)?;
        }

        Ok(config)
    }
}

fn parse_secs(var: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::invalid(var, e))
}
