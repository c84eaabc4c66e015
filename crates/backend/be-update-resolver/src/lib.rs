//! Desktop Release Update Resolver
//!
//! Answers auto-update queries for the desktop app on macOS, Windows and Linux
//! from the latest GitHub release. The release is cached for a few minutes
//! and each platform picks its artifact from the release assets.
//!
//! Windows clients using Squirrel also get a rewritten `RELEASES` manifest whose
//! package names point at the release that published each package.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, http::StatusCode, routing::get};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

pub mod analytics;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod manifest;
pub mod provider;
pub mod selector;
pub mod service;
pub mod types;
pub mod utils;

use service::UpdateResolver;

/// Create the axum router
pub fn create_router(state: Arc<UpdateResolver>) -> Router {
    Router::new()
        .route("/update/darwin", get(handlers::darwin_update_handler))
        .route(
            "/update/win32/portable",
            get(handlers::win32_portable_handler),
        )
        .route(
            "/update/win32/RELEASES",
            get(handlers::win32_releases_handler),
        )
        .route("/update/linux", get(handlers::linux_update_handler))
        .route("/health", get(|| async { StatusCode::OK }))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Initialize the update service and return the router
pub fn init_update_service(config: UpdateConfig, analytics_enabled: bool) -> Result<Router> {
    debug!("Initializing update service for repo: {}", config.repo);

    let resolver = UpdateResolver::from_config(config)
        .context("Failed to create update resolver")?
        .with_analytics(analytics_enabled);

    Ok(create_router(Arc::new(resolver)))
}

// Re-export commonly used types
pub use cache::{ReleaseCache, TtlCache};
pub use config::{ConfigError, GithubRepo, UpdateConfig};
pub use error::{ErrorKind, ErrorResponse, UpdateResult, UpdateServiceError};
pub use provider::{GithubReleaseProvider, HttpManifestFetcher, ManifestFetcher, ReleaseProvider};
pub use selector::AssetSelector;
pub use types::{
    Asset, LinuxArch, LinuxPackage, Release, ReleasesManifest, UpdateDecision, UpdateResponse,
};
