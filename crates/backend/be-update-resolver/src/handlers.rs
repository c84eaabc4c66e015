use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use tracing::{debug, instrument, warn};

use crate::{
    service::UpdateResolver,
    types::{DarwinQuery, LinuxQuery, ReleasesManifest, UpdateDecision},
};

#[instrument(skip(state), fields(version = ?query.version))]
pub async fn darwin_update_handler(
    State(state): State<Arc<UpdateResolver>>,
    Query(query): Query<DarwinQuery>,
) -> Response {
    let version = query.version.as_deref().unwrap_or("");

    match state.check_mac_update(version).await {
        Ok(UpdateDecision::Available(update)) => {
            debug!("Update available: {}", update.name);
            (StatusCode::OK, Json(update)).into_response()
        }
        Ok(UpdateDecision::NoUpdate) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            warn!("Darwin update check failed: {}", e);
            e.into_response()
        }
    }
}

#[instrument(skip(state))]
pub async fn win32_portable_handler(State(state): State<Arc<UpdateResolver>>) -> Response {
    match state.check_win32_portable().await {
        Ok(update) => {
            debug!("Portable package: {}", update.url);
            (StatusCode::OK, Json(update)).into_response()
        }
        Err(e) => {
            warn!("Win32 portable check failed: {}", e);
            e.into_response()
        }
    }
}

/// Serves the rewritten Squirrel manifest as a `RELEASES` attachment
#[instrument(skip(state))]
pub async fn win32_releases_handler(State(state): State<Arc<UpdateResolver>>) -> Response {
    match state.get_win32_releases_manifest().await {
        Ok(manifest) => {
            debug!("RELEASES manifest length: {}", manifest.content_length());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                    (header::CONTENT_LENGTH, manifest.content_length().to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", ReleasesManifest::FILE_NAME),
                    ),
                ],
                manifest.body,
            )
                .into_response()
        }
        Err(e) => {
            warn!("RELEASES request failed: {}", e);
            e.into_response()
        }
    }
}

#[instrument(skip(state), fields(arch = ?query.arch, pkg = ?query.pkg))]
pub async fn linux_update_handler(
    State(state): State<Arc<UpdateResolver>>,
    Query(query): Query<LinuxQuery>,
) -> Response {
    match state
        .check_linux_update(query.arch.as_deref(), query.pkg.as_deref())
        .await
    {
        Ok(update) => {
            debug!("Linux package: {}", update.url);
            (StatusCode::OK, Json(update)).into_response()
        }
        Err(e) => {
            warn!("Linux update check failed: {}", e);
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::service::tests::{RELEASES_URL, resolver_with, sample_release};

    async fn get(app: axum::Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn app(manifest: Option<&str>) -> axum::Router {
        let (resolver, _, _) = resolver_with(Some(sample_release()), manifest);
        crate::create_router(Arc::new(resolver))
    }

    #[tokio::test]
    async fn darwin_returns_update_json() {
        let response = get(app(None), "/update/darwin?version=1.0.0").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["name"], "v1.2.0");
        assert_eq!(json["notes"], "Bug fixes");
        assert_eq!(json["pub_date"], "2024-03-01T12:00:00Z");
        assert!(json["url"].as_str().unwrap().ends_with("MyApp-1.2.0-mac.zip"));
        assert!(json.get("version").is_none());
    }

    #[tokio::test]
    async fn darwin_up_to_date_is_no_content() {
        let response = get(app(None), "/update/darwin?version=1.2.0").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn darwin_rejects_bad_or_missing_version() {
        let response = get(app(None), "/update/darwin?version=not-a-version").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "invalid_version");

        let response = get(app(None), "/update/darwin").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn win32_portable_includes_version() {
        let response = get(app(None), "/update/win32/portable").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["version"], "1.2.0");
    }

    #[tokio::test]
    async fn win32_releases_is_an_attachment() {
        let router = app(Some("ABC MyApp-1.1.0-full.nupkg 100"));
        let response = get(router, "/update/win32/RELEASES").await;
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers().clone();
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"RELEASES\""
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            headers[header::CONTENT_LENGTH],
            bytes.len().to_string().as_str()
        );
        let expected_base = RELEASES_URL
            .replace("1.2.0", "1.1.0")
            .replace("/RELEASES", "/");
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            format!("ABC {}MyApp-1.1.0-full.nupkg 100", expected_base)
        );
    }

    #[tokio::test]
    async fn linux_validates_and_resolves() {
        let response = get(app(None), "/update/linux?arch=amd64&pkg=deb").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            body_json(response).await["url"]
                .as_str()
                .unwrap()
                .ends_with("myapp_1.2.0_amd64.deb")
        );

        let response = get(app(None), "/update/linux?arch=arm64&pkg=deb").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = get(app(None), "/update/linux?arch=amd64").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = get(app(None), "/update/linux?arch=i386&pkg=rpm").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = get(app(None), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
