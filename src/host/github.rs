//! GitHub Releases client.

use crate::config::ReleaseSettings;
use crate::host::{HostError, Release, ReleaseHost, ReleaseUpload};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde_json::json;
use std::fs::File;
use tracing::{debug, info};

const API_VERSION: &str = "2022-11-28";

/// Blocking client for one `owner/repo` on GitHub (or a compatible API).
#[derive(Debug, Clone)]
pub struct GitHubReleases {
    client: Client,
    owner: String,
    repo: String,
    api_url: String,
    upload_url: String,
    token: Option<String>,
}

impl GitHubReleases {
    pub fn new(settings: &ReleaseSettings, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            owner: settings.owner.clone(),
            repo: settings.repo.clone(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            upload_url: settings.upload_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_url, self.owner, self.repo, path)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("nanode-builder/", env!("CARGO_PKG_VERSION")))
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    fn send(
        &self,
        method: &'static str,
        url: &str,
        builder: RequestBuilder,
    ) -> Result<Response, HostError> {
        debug!(method, url, "release host request");
        let response = self
            .request(builder)
            .send()
            .map_err(|source| HostError::Http {
                url: url.to_string(),
                source,
            })?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(status_error(method, url, response))
    }

    fn create_release(&self, upload: &ReleaseUpload<'_>) -> Result<Release, HostError> {
        let url = self.repo_url("/releases");
        let body = json!({
            "tag_name": upload.tag,
            "name": upload.release_name,
            "body": upload.release_notes,
        });
        info!(tag = upload.tag, "creating release");
        let response = self.send("POST", &url, self.client.post(&url).json(&body))?;
        parse_release(&url, response)
    }

    fn update_release(
        &self,
        release: &Release,
        upload: &ReleaseUpload<'_>,
    ) -> Result<Release, HostError> {
        let url = self.repo_url(&format!("/releases/{}", release.id));
        let body = json!({
            "name": upload.release_name,
            "body": upload.release_notes,
        });
        let response = self.send("PATCH", &url, self.client.patch(&url).json(&body))?;
        parse_release(&url, response)
    }

    fn delete_asset(&self, asset_id: u64) -> Result<(), HostError> {
        let url = self.repo_url(&format!("/releases/assets/{asset_id}"));
        self.send("DELETE", &url, self.client.delete(&url))?;
        Ok(())
    }

    fn upload_asset(&self, release: &Release, upload: &ReleaseUpload<'_>) -> Result<(), HostError> {
        let url = format!(
            "{}/repos/{}/{}/releases/{}/assets",
            self.upload_url, self.owner, self.repo, release.id
        );
        let file = File::open(upload.file_path).map_err(|source| HostError::Io {
            path: upload.file_path.to_path_buf(),
            source,
        })?;
        let builder = self
            .client
            .post(&url)
            .query(&[("name", upload.file_name)])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(file);
        self.send("POST", &url, builder)?;
        Ok(())
    }
}

impl ReleaseHost for GitHubReleases {
    fn release_by_tag(&self, tag: &str) -> Result<Option<Release>, HostError> {
        let url = self.repo_url(&format!("/releases/tags/{tag}"));
        debug!(method = "GET", url = %url, "release host request");
        let response = self
            .request(self.client.get(&url))
            .send()
            .map_err(|source| HostError::Http {
                url: url.clone(),
                source,
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error("GET", &url, response));
        }
        parse_release(&url, response).map(Some)
    }

    fn create_or_update_release(&self, upload: &ReleaseUpload<'_>) -> Result<(), HostError> {
        let release = match self.release_by_tag(upload.tag)? {
            Some(existing) => self.update_release(&existing, upload)?,
            None => self.create_release(upload)?,
        };

        // Uploading over an existing name is rejected, so replace it.
        if let Some(asset) = release
            .assets
            .iter()
            .find(|asset| asset.name == upload.file_name)
        {
            info!(asset = %asset.name, "replacing existing asset");
            self.delete_asset(asset.id)?;
        }

        info!(
            tag = upload.tag,
            asset = upload.file_name,
            path = %upload.file_path.display(),
            "uploading asset"
        );
        self.upload_asset(&release, upload)
    }
}

fn parse_release(url: &str, response: Response) -> Result<Release, HostError> {
    response.json::<Release>().map_err(|source| HostError::Http {
        url: url.to_string(),
        source,
    })
}

fn status_error(method: &'static str, url: &str, response: Response) -> HostError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    HostError::Status {
        method,
        url: url.to_string(),
        status,
        body,
    }
}
