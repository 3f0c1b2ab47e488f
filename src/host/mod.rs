//! Release host abstraction.
//!
//! The pipeline only needs two operations from the hosting service: list the
//! assets attached to a tagged release, and create-or-update a release while
//! uploading one asset. [`GitHubReleases`] talks to the GitHub REST API; tests
//! substitute an in-memory recorder.

pub mod github;

pub use github::GitHubReleases;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A release as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub id: u64,
    #[serde(rename = "tag_name")]
    pub tag: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    pub id: u64,
    pub name: String,
}

impl Release {
    pub fn has_asset(&self, name: &str) -> bool {
        self.assets.iter().any(|asset| asset.name == name)
    }
}

/// One asset upload, creating the tagged release first when it is missing.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseUpload<'a> {
    pub tag: &'a str,
    pub release_name: &'a str,
    pub release_notes: &'a str,
    pub file_name: &'a str,
    pub file_path: &'a Path,
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned HTTP {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to read upload {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait ReleaseHost {
    /// Look up the release tagged `tag`. A missing release is `Ok(None)`.
    fn release_by_tag(&self, tag: &str) -> Result<Option<Release>, HostError>;

    /// Create the release if absent, then upload (or overwrite) one asset.
    fn create_or_update_release(&self, upload: &ReleaseUpload<'_>) -> Result<(), HostError>;
}
