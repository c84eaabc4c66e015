use std::net::SocketAddr;

use be_update_resolver::{UpdateConfig, init_update_service};

/// Configuration for running the update server.
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    pub update: UpdateConfig,
    /// When this receiver gets a value, the server shuts down gracefully.
    pub shutdown: tokio::sync::watch::Receiver<()>,
}

pub async fn run_server(
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let analytics_enabled = if let Some(posthog_key) = std::env::var("POSTHOG_API_KEY")
        .ok()
        .filter(|s| !s.is_empty())
    {
        match posthog_rs::init_global(posthog_key.as_str()).await {
            Ok(()) => {
                tracing::info!("PostHog analytics initialized");
                true
            }
            Err(e) => {
                tracing::warn!("Failed to initialize PostHog: {}", e);
                false
            }
        }
    } else {
        tracing::info!("POSTHOG_API_KEY not set, analytics disabled");
        false
    };

    tracing::info!(
        "Serving updates for {} (cache ttl {}s)",
        config.update.repo,
        config.update.cache_ttl.as_secs()
    );

    let update_router = match init_update_service(config.update, analytics_enabled) {
        Ok(router) => router,
        Err(e) => {
            tracing::error!("Failed to initialize update service: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting HTTP server at {}", config.http_addr);

    let mut http_shutdown = config.shutdown.clone();
    let http_listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    let http_future = axum::serve(
        http_listener,
        update_router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = http_shutdown.changed().await;
        tracing::info!("Shutting down HTTP server...");
    });

    if let Err(e) = http_future.await {
        tracing::error!("HTTP server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
