//! GitHub Contents API client
//!
//! Reads and writes a single file in a repository. Writes are conditional on
//! the blob `sha` returned by the read, so a file changed by someone else in
//! between is rejected by GitHub with `409 Conflict`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::GitHubError;
use crate::infrastructure::http::error_body;

/// Default API root
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Commit message used for every policy update
pub const COMMIT_MESSAGE: &str = "Update Gateway Policy via script";

/// A file in a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentsLocation {
    pub owner: String,
    pub repo: String,
    pub path: String,
}

impl ContentsLocation {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            path: path.into(),
        }
    }

    /// Contents API URL for this file under `api_base`
    ///
    /// Each path segment is percent-encoded; `/` separators are kept.
    pub fn url(&self, api_base: &str) -> String {
        let path = self
            .path
            .trim_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        format!(
            "{}/repos/{}/{}/contents/{}",
            api_base.trim_end_matches('/'),
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo),
            path
        )
    }
}

/// File content and revision as returned by the Contents API
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    /// Base64 content, wrapped with newlines by GitHub
    pub content: String,
    /// Blob sha of the revision that was read
    pub sha: String,
}

impl RemoteFile {
    /// Decode the base64 payload into UTF-8 text
    pub fn decode_content(&self) -> Result<String, GitHubError> {
        let compact: String = self
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| GitHubError::InvalidContent {
                message: format!("invalid base64: {}", e),
            })?;

        String::from_utf8(bytes).map_err(|e| GitHubError::InvalidContent {
            message: format!("file is not valid UTF-8: {}", e),
        })
    }
}

/// Commit created by a successful write
#[derive(Debug, Clone, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub html_url: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    commit: CommitInfo,
}

/// Client for the Contents API
pub struct GitHubClient {
    client: Client,
    api_base: String,
    token: String,
}

impl GitHubClient {
    /// Create a client against `api_base` (normally [`GITHUB_API_URL`])
    pub fn new(client: Client, api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            token: token.into(),
        }
    }

    /// Fetch the file as it currently exists on `branch`
    pub async fn fetch(
        &self,
        location: &ContentsLocation,
        branch: &str,
    ) -> Result<RemoteFile, GitHubError> {
        let url = location.url(&self.api_base);
        debug!("GET {} (ref={})", url, branch);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .query(&[("ref", branch)])
            .send()
            .await
            .map_err(|source| GitHubError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GitHubError::Status {
                url,
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let file: RemoteFile = response
            .json()
            .await
            .map_err(|source| GitHubError::Transport {
                url: url.clone(),
                source,
            })?;

        info!("   Revision: {}", file.sha);
        Ok(file)
    }

    /// Write `content` to the file, conditional on it still being at `sha`
    ///
    /// A stale `sha` is reported as [`GitHubError::RevisionConflict`] and is
    /// never retried.
    pub async fn push(
        &self,
        location: &ContentsLocation,
        content: &str,
        sha: &str,
        branch: &str,
    ) -> Result<CommitInfo, GitHubError> {
        let url = location.url(&self.api_base);
        debug!("PUT {} (branch={}, sha={})", url, branch, sha);

        let body = PutContentsRequest {
            message: COMMIT_MESSAGE,
            content: STANDARD.encode(content.as_bytes()),
            sha,
            branch,
        };

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|source| GitHubError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(GitHubError::RevisionConflict {
                path: location.path.clone(),
                sha: sha.to_string(),
            });
        }
        if !status.is_success() {
            return Err(GitHubError::Status {
                url,
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let parsed: PutContentsResponse =
            response
                .json()
                .await
                .map_err(|source| GitHubError::Transport {
                    url: url.clone(),
                    source,
                })?;

        Ok(parsed.commit)
    }
}
