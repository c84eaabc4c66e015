//! Data types and structures for the update service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UpdateServiceError;

/// Latest release record as published upstream.
/// Only the fields consumed by the resolver are kept.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Release {
    /// Raw release name, e.g. "v1.2.0". Cleaned before any version comparison.
    pub name: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A downloadable file attached to a release
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

/// Update payload returned to desktop clients
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UpdateResponse {
    pub url: String,
    pub name: String,
    pub notes: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
    /// Cleaned release version. Not sent on the darwin channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl UpdateResponse {
    pub(crate) fn from_release(release: &Release, asset: &Asset, version: Option<String>) -> Self {
        Self {
            url: asset.browser_download_url.clone(),
            name: release.name.clone(),
            notes: release.body.clone(),
            pub_date: release.published_at,
            version,
        }
    }
}

/// Outcome of an update check
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateDecision {
    NoUpdate,
    Available(UpdateResponse),
}

/// Rewritten Squirrel `RELEASES` manifest, ready to be sent as an attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasesManifest {
    pub body: String,
}

impl ReleasesManifest {
    pub const FILE_NAME: &'static str = "RELEASES";

    /// Byte length used for the `Content-Length` header
    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}

/// Query parameters for the darwin endpoint
#[derive(Deserialize, Debug, Default)]
pub struct DarwinQuery {
    pub version: Option<String>,
}

/// Query parameters for the linux endpoint
#[derive(Deserialize, Debug, Default)]
pub struct LinuxQuery {
    pub arch: Option<String>,
    pub pkg: Option<String>,
}

// ============================================================================
// Linux Package Types
// ============================================================================

/// Supported linux architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinuxArch {
    #[serde(rename = "i386")]
    I386,
    #[serde(rename = "amd64")]
    Amd64,
    #[serde(rename = "x86_64")]
    X86_64,
}

impl LinuxArch {
    /// Substring expected in the asset name
    pub fn as_str(&self) -> &'static str {
        match self {
            LinuxArch::I386 => "i386",
            LinuxArch::Amd64 => "amd64",
            LinuxArch::X86_64 => "x86_64",
        }
    }
}

impl std::str::FromStr for LinuxArch {
    type Err = UpdateServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i386" => Ok(LinuxArch::I386),
            "amd64" => Ok(LinuxArch::Amd64),
            "x86_64" => Ok(LinuxArch::X86_64),
            _ => Err(UpdateServiceError::InvalidArch(s.to_string())),
        }
    }
}

impl std::fmt::Display for LinuxArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Supported linux package formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinuxPackage {
    Deb,
    Rpm,
}

impl LinuxPackage {
    /// Substring expected in the asset name
    pub fn as_str(&self) -> &'static str {
        match self {
            LinuxPackage::Deb => "deb",
            LinuxPackage::Rpm => "rpm",
        }
    }
}

impl std::str::FromStr for LinuxPackage {
    type Err = UpdateServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deb" => Ok(LinuxPackage::Deb),
            "rpm" => Ok(LinuxPackage::Rpm),
            _ => Err(UpdateServiceError::InvalidPackage(s.to_string())),
        }
    }
}

impl std::fmt::Display for LinuxPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_arch_parses_only_known_values() {
        assert_eq!("amd64".parse::<LinuxArch>().unwrap(), LinuxArch::Amd64);
        assert_eq!("x86_64".parse::<LinuxArch>().unwrap(), LinuxArch::X86_64);
        assert_eq!("i386".parse::<LinuxArch>().unwrap(), LinuxArch::I386);
        // case sensitive
        assert!("AMD64".parse::<LinuxArch>().is_err());
        assert!("arm64".parse::<LinuxArch>().is_err());
        assert!("".parse::<LinuxArch>().is_err());
    }

    #[test]
    fn linux_package_parses_only_known_values() {
        assert_eq!("deb".parse::<LinuxPackage>().unwrap(), LinuxPackage::Deb);
        assert_eq!("rpm".parse::<LinuxPackage>().unwrap(), LinuxPackage::Rpm);
        assert!("appimage".parse::<LinuxPackage>().is_err());
        assert!("".parse::<LinuxPackage>().is_err());
    }

    #[test]
    fn update_response_omits_missing_version() {
        let response = UpdateResponse {
            url: "https://example.com/a.zip".to_string(),
            name: "v1.2.0".to_string(),
            notes: Some("notes".to_string()),
            pub_date: None,
            version: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("version").is_none());
        assert_eq!(json["name"], "v1.2.0");
        assert!(json["pub_date"].is_null());
    }

    #[test]
    fn release_deserializes_github_payload() {
        let payload = r#"{
            "name": "v1.2.0",
            "tag_name": "v1.2.0",
            "body": "Bug fixes",
            "published_at": "2024-03-01T12:00:00Z",
            "assets": [
                {"name": "MyApp-1.2.0-mac.zip", "browser_download_url": "https://example.com/MyApp-1.2.0-mac.zip", "size": 10}
            ]
        }"#;
        let release: Release = serde_json::from_str(payload).unwrap();
        assert_eq!(release.name, "v1.2.0");
        assert_eq!(release.assets.len(), 1);
        assert_eq!(
            release.published_at.unwrap().to_rfc3339(),
            "2024-03-01T12:00:00+00:00"
        );
    }
}
