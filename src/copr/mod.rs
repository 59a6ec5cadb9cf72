//! Copr build-farm collaborator.
//!
//! The harness only ever reads from Copr: list the builds of a project and
//! fetch a single build's state. Both calls can fail with "project not found"
//! for a while after the service first submits a build, because the Copr
//! project is created lazily - callers treat that as a retryable condition,
//! not an error.

use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use thiserror::Error;

use crate::types::{BuildId, BuildRecord, BuildState};

pub const DEFAULT_COPR_URL: &str = "https://copr.fedorainfracloud.org";

/// The kind of Copr API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoprErrorKind {
    /// The owner/project pair doesn't exist (yet). Expected while the
    /// service is still provisioning a fresh project; retryable.
    ProjectNotFound,

    /// Network-level failure; retryable.
    Transport,

    /// Any other API error.
    Api,
}

impl CoprErrorKind {
    pub fn is_retriable(&self) -> bool {
        matches!(self, CoprErrorKind::ProjectNotFound | CoprErrorKind::Transport)
    }
}

/// A Copr API error.
#[derive(Debug, Error)]
pub struct CoprError {
    pub kind: CoprErrorKind,
    pub status_code: Option<u16>,
    pub message: String,
    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for CoprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "Copr API error (HTTP {}): {}", code, self.message),
            None => write!(f, "Copr API error: {}", self.message),
        }
    }
}

impl CoprError {
    pub fn project_not_found(message: impl Into<String>) -> Self {
        Self {
            kind: CoprErrorKind::ProjectNotFound,
            status_code: Some(404),
            message: message.into(),
            source: None,
        }
    }

    fn transport(err: reqwest::Error) -> Self {
        Self {
            kind: CoprErrorKind::Transport,
            status_code: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            source: Some(err),
        }
    }

    fn api(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: CoprErrorKind::Api,
            status_code: Some(status),
            message: message.into(),
            source: None,
        }
    }
}

/// Read-only view of the build farm, implemented by `CoprClient` and by the
/// scripted fakes in tests.
pub trait BuildFarm: Send + Sync {
    /// Lists builds for `owner`/`project`, newest first.
    fn list_builds(
        &self,
        owner: &str,
        project: &str,
    ) -> impl Future<Output = Result<Vec<BuildRecord>, CoprError>> + Send;

    /// Fetches a single build by id.
    fn get_build(&self, id: BuildId) -> impl Future<Output = Result<BuildRecord, CoprError>> + Send;
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BuildList {
    items: Vec<BuildInfo>,
}

#[derive(Debug, Deserialize)]
struct BuildInfo {
    id: u64,
    state: BuildState,
}

impl BuildInfo {
    fn into_record(self) -> BuildRecord {
        BuildRecord {
            id: BuildId(self.id),
            state: self.state,
        }
    }
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Unauthenticated client for Copr's public v3 API.
#[derive(Debug, Clone)]
pub struct CoprClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoprClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        CoprClient {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_checked(&self, url: &str) -> Result<reqwest::Response, CoprError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(CoprError::transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            Err(CoprError::project_not_found(body))
        } else {
            Err(CoprError::api(status.as_u16(), body))
        }
    }
}

impl BuildFarm for CoprClient {
    async fn list_builds(
        &self,
        owner: &str,
        project: &str,
    ) -> Result<Vec<BuildRecord>, CoprError> {
        let url = format!(
            "{}/api_3/build/list/?ownername={}&projectname={}",
            self.base_url, owner, project
        );
        let list: BuildList = self
            .get_checked(&url)
            .await?
            .json()
            .await
            .map_err(CoprError::transport)?;

        Ok(list.items.into_iter().map(BuildInfo::into_record).collect())
    }

    async fn get_build(&self, id: BuildId) -> Result<BuildRecord, CoprError> {
        let url = format!("{}/api_3/build/{}", self.base_url, id);
        let info: BuildInfo = self
            .get_checked(&url)
            .await?
            .json()
            .await
            .map_err(CoprError::transport)?;

        Ok(info.into_record())
    }
}
