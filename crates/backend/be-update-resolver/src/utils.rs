//! Utility functions for parsing and validation

use std::cmp::Ordering;

use semver::{BuildMetadata, Version};
use tracing::{debug, instrument};

use crate::{
    error::{UpdateResult, UpdateServiceError},
    types::{LinuxArch, LinuxPackage},
};

/// Parse a client supplied version.
/// Surrounding whitespace and a single leading `v` are accepted, e.g. "v1.2.3".
#[instrument]
pub fn parse_client_version(version: &str) -> UpdateResult<Version> {
    let trimmed = version.trim();
    let candidate = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(candidate).map_err(|e| {
        debug!("Rejected client version '{}': {}", version, e);
        UpdateServiceError::InvalidVersion(version.to_string())
    })
}

/// Clean a raw release name into a semantic version.
/// Strips whitespace and any leading `=`/`v` characters, e.g. " =v1.2.3 " -> 1.2.3
pub fn clean_version(raw: &str) -> Option<Version> {
    let candidate = raw.trim().trim_start_matches(['=', 'v']);
    match Version::parse(candidate) {
        Ok(mut version) => {
            version.build = BuildMetadata::EMPTY;
            Some(version)
        }
        Err(e) => {
            debug!("Release name '{}' does not clean to a version: {}", raw, e);
            None
        }
    }
}

/// Clean a release name into the version string published to clients
pub fn cleaned_version_string(raw: &str) -> UpdateResult<String> {
    clean_version(raw)
        .map(|v| v.to_string())
        .ok_or_else(|| UpdateServiceError::UnparseableReleaseName(raw.to_string()))
}

/// Whether `current` is strictly older than `latest`.
/// Build metadata does not take part in the ordering.
pub fn is_older(current: &Version, latest: &Version) -> bool {
    current.cmp_precedence(latest) == Ordering::Less
}

/// Parse the linux `arch` and `pkg` query values.
/// Missing values are treated as empty strings and rejected.
#[instrument]
pub fn parse_linux_target(
    arch: Option<&str>,
    pkg: Option<&str>,
) -> UpdateResult<(LinuxArch, LinuxPackage)> {
    let arch: LinuxArch = arch.unwrap_or("").parse()?;
    let pkg: LinuxPackage = pkg.unwrap_or("").parse()?;
    debug!("Parsed linux target: arch={}, pkg={}", arch, pkg);
    Ok((arch, pkg))
}
