use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, warn};

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Coarse failure category, independent of the HTTP encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    UpstreamUnavailable,
    AssetNotFound,
    MalformedManifestLine,
    NetworkFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::AssetNotFound => "asset_not_found",
            ErrorKind::MalformedManifestLine => "malformed_manifest_line",
            ErrorKind::NetworkFailure => "network_failure",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateServiceError {
    #[error("Invalid version {0}")]
    InvalidVersion(String),

    #[error("Invalid arch {0}")]
    InvalidArch(String),

    #[error("Invalid pkg {0}")]
    InvalidPackage(String),

    #[error("Latest release not found")]
    UpstreamUnavailable,

    #[error("Latest release name '{0}' is not a semantic version")]
    UnparseableReleaseName(String),

    #[error("No asset found that matches {0}")]
    AssetNotFound(String),

    #[error("Malformed RELEASES line: {0}")]
    MalformedManifestLine(String),

    #[error("Failed to fetch RELEASES manifest: {0}")]
    NetworkFailure(String),
}

pub type UpdateResult<T> = std::result::Result<T, UpdateServiceError>;

impl UpdateServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpdateServiceError::InvalidVersion(_)
            | UpdateServiceError::InvalidArch(_)
            | UpdateServiceError::InvalidPackage(_) => ErrorKind::InvalidArgument,
            UpdateServiceError::UpstreamUnavailable
            | UpdateServiceError::UnparseableReleaseName(_) => ErrorKind::UpstreamUnavailable,
            UpdateServiceError::AssetNotFound(_) => ErrorKind::AssetNotFound,
            UpdateServiceError::MalformedManifestLine(_) => ErrorKind::MalformedManifestLine,
            UpdateServiceError::NetworkFailure(_) => ErrorKind::NetworkFailure,
        }
    }

    /// HTTP status the boundary layer should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            UpdateServiceError::InvalidVersion(_)
            | UpdateServiceError::InvalidArch(_)
            | UpdateServiceError::InvalidPackage(_) => StatusCode::BAD_REQUEST,
            UpdateServiceError::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            UpdateServiceError::UnparseableReleaseName(_)
            | UpdateServiceError::MalformedManifestLine(_)
            | UpdateServiceError::NetworkFailure(_) => StatusCode::BAD_GATEWAY,
            UpdateServiceError::AssetNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }
}

impl IntoResponse for UpdateServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_code, message, details) = match &self {
            UpdateServiceError::InvalidVersion(v) => {
                warn!("Invalid version provided: {}", v);
                (
                    "invalid_version",
                    "Invalid version format",
                    Some(format!("Version '{}' is not a valid semantic version", v)),
                )
            }
            UpdateServiceError::InvalidArch(a) => {
                warn!("Invalid arch: {}", a);
                (
                    "invalid_arch",
                    "Invalid architecture",
                    Some(format!(
                        "Arch '{}' is not supported. Use 'i386', 'amd64', or 'x86_64'",
                        a
                    )),
                )
            }
            UpdateServiceError::InvalidPackage(p) => {
                warn!("Invalid pkg: {}", p);
                (
                    "invalid_pkg",
                    "Invalid package format",
                    Some(format!("Pkg '{}' is not supported. Use 'deb' or 'rpm'", p)),
                )
            }
            UpdateServiceError::UpstreamUnavailable => {
                error!("Latest release could not be obtained");
                (
                    "service_unavailable",
                    "Update service temporarily unavailable",
                    None,
                )
            }
            UpdateServiceError::UnparseableReleaseName(name) => {
                error!("Latest release name is not a semantic version: {}", name);
                (
                    "invalid_release",
                    "Latest release has an invalid version",
                    None,
                )
            }
            UpdateServiceError::AssetNotFound(selector) => {
                error!("No asset found that matches {}", selector);
                ("asset_not_found", "Update package not found", None)
            }
            UpdateServiceError::MalformedManifestLine(line) => {
                error!("Malformed RELEASES line: {}", line);
                (
                    "malformed_manifest",
                    "Update manifest could not be processed",
                    None,
                )
            }
            UpdateServiceError::NetworkFailure(e) => {
                error!("RELEASES manifest fetch failed: {}", e);
                (
                    "manifest_unavailable",
                    "Update manifest temporarily unavailable",
                    None,
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: error_code.to_owned(),
                message: message.to_owned(),
                details,
            }),
        )
            .into_response()
    }
}
