//! Major-version extraction for upstream release names.
//!
//! Upstream targets are either release lines (`v18.x`) or exact tags
//! (`v22.11.0`). Exact tags go through semver; release lines fall back to the
//! leading numeric component.

use semver::Version;
use thiserror::Error;

/// First upstream major whose Windows build script accepts `clang-cl`.
pub const MIN_CLANG_CL_MAJOR: u64 = 22;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version '{value}': no leading major version number")]
    InvalidVersion { value: String },
}

/// Extract the numeric major version.
///
/// # Examples
///
/// ```
/// use nanode_builder::config::version::major_version;
///
/// assert_eq!(major_version("v18.x").unwrap(), 18);
/// assert_eq!(major_version("v22.11.0").unwrap(), 22);
/// assert_eq!(major_version("20").unwrap(), 20);
/// assert!(major_version("latest").is_err());
/// ```
pub fn major_version(version: &str) -> Result<u64, VersionError> {
    let trimmed = version.trim();
    let bare = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if let Ok(parsed) = Version::parse(bare) {
        return Ok(parsed.major);
    }

    let leading = bare.split('.').next().unwrap_or("");
    leading
        .parse::<u64>()
        .map_err(|_| VersionError::InvalidVersion {
            value: version.to_string(),
        })
}

/// Check whether `version` is at or above `minimum_major`.
pub fn meets_minimum_major(version: &str, minimum_major: u64) -> Result<bool, VersionError> {
    Ok(major_version(version)? >= minimum_major)
}
