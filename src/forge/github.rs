//! GitHub adapter, backed by octocrab.
//!
//! Check runs are fetched through octocrab's generic `get` because the typed
//! checks API doesn't expose the owning app, and the app name is how we keep
//! only the service's own check runs. Branch deletion likewise goes through
//! the low-level `_delete` since there is no typed endpoint for git refs.

use octocrab::Octocrab;
use octocrab::models::repos::Object;
use octocrab::params;
use octocrab::params::repos::Reference;
use serde::Deserialize;
use std::sync::Arc;

use crate::deployment::DeploymentProfile;
use crate::types::{Comment, PrNumber, ProjectId, PullRequest, Sha, StatusRecord};

use super::Forge;
use super::error::ForgeError;
use super::retry::{RetryConfig, RetryPolicy, retry_with_backoff};

/// Seed file committed to fresh branches; rewriting it is also how the push
/// trigger creates its "empty" commit, since GitHub has no empty-commit
/// endpoint.
const SEED_FILE: &str = "test.txt";
const SEED_CONTENT: &str = "Testing the opened PR trigger.";
const PUSH_CONTENT: &str = "Testing the push trigger.";

/// A GitHub client scoped to a single repository and deployment profile.
pub struct GithubForge {
    client: Octocrab,
    project: ProjectId,
    profile: Arc<DeploymentProfile>,
    default_branch: String,
    label: String,
}

impl GithubForge {
    /// Builds a token-authenticated client and resolves the repository's
    /// default branch up front.
    pub async fn connect(
        token: impl Into<String>,
        project: ProjectId,
        profile: Arc<DeploymentProfile>,
    ) -> Result<Self, ForgeError> {
        let client = Octocrab::builder()
            .personal_token(token.into())
            .build()
            .map_err(ForgeError::from_octocrab)?;

        let repo = client
            .repos(&project.namespace, &project.repo)
            .get()
            .await
            .map_err(ForgeError::from_octocrab)?;
        let default_branch = repo.default_branch.unwrap_or_else(|| "main".to_string());

        Ok(GithubForge {
            client,
            label: format!("https://github.com/{}", project),
            project,
            profile,
            default_branch,
        })
    }

    fn owner(&self) -> &str {
        &self.project.namespace
    }

    fn repo(&self) -> &str {
        &self.project.repo
    }

    /// Resolves the current head SHA of a branch.
    async fn branch_head(&self, branch: &str) -> Result<Sha, ForgeError> {
        let reference = self
            .client
            .repos(self.owner(), self.repo())
            .get_ref(&Reference::Branch(branch.to_string()))
            .await
            .map_err(ForgeError::from_octocrab)?;

        match reference.object {
            Object::Commit { sha, .. } => Ok(Sha::new(sha)),
            Object::Tag { sha, .. } => Ok(Sha::new(sha)),
            _ => Err(ForgeError::permanent(format!(
                "ref for branch {branch} does not point at a commit"
            ))),
        }
    }

    /// Fetches the blob SHA of a file on a branch, required by the contents
    /// API for updates.
    async fn file_blob_sha(&self, path: &str, branch: &str) -> Result<String, ForgeError> {
        let contents = self
            .client
            .repos(self.owner(), self.repo())
            .get_content()
            .path(path)
            .r#ref(branch)
            .send()
            .await
            .map_err(ForgeError::from_octocrab)?;

        contents
            .items
            .into_iter()
            .next()
            .map(|item| item.sha)
            .ok_or_else(|| {
                ForgeError::permanent(format!("file {path} not found on branch {branch}"))
            })
    }

    async fn list_prs_once(&self) -> Result<Vec<PullRequest>, ForgeError> {
        let mut page = 1u32;
        let mut all = Vec::new();

        loop {
            let result = self
                .client
                .pulls(self.owner(), self.repo())
                .list()
                .state(params::State::Open)
                .per_page(100)
                .page(page)
                .send()
                .await
                .map_err(ForgeError::from_octocrab)?;

            let items = result.items;
            let is_last_page = items.len() < 100;

            for pull in items {
                all.push(PullRequest {
                    number: PrNumber(pull.number),
                    title: pull.title.unwrap_or_default(),
                    url: pull.html_url.map(|u| u.to_string()).unwrap_or_default(),
                    head_commit: Sha::new(pull.head.sha),
                    source_branch: pull.head.ref_field,
                });
            }

            if is_last_page {
                return Ok(all);
            }
            page += 1;
        }
    }

    async fn list_comments_once(&self, pr: PrNumber) -> Result<Vec<Comment>, ForgeError> {
        let page = self
            .client
            .issues(self.owner(), self.repo())
            .list_comments(pr.0)
            .per_page(100)
            .send()
            .await
            .map_err(ForgeError::from_octocrab)?;

        let mut comments = page.items;
        // The API returns oldest first; the watchers want newest first.
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(comments
            .into_iter()
            .map(|c| Comment {
                author: c.user.login,
                body: c.body.unwrap_or_default(),
            })
            .collect())
    }

    async fn list_statuses_once(&self, commit: &Sha) -> Result<Vec<StatusRecord>, ForgeError> {
        let route = format!(
            "/repos/{}/{}/commits/{}/check-runs",
            self.owner(),
            self.repo(),
            commit
        );
        let list: CheckRunList = self
            .client
            .get(&route, None::<&()>)
            .await
            .map_err(ForgeError::from_octocrab)?;

        Ok(list
            .check_runs
            .into_iter()
            .filter(|run| {
                run.app
                    .as_ref()
                    .is_some_and(|app| app.name == self.profile.app_name)
            })
            .map(CheckRun::into_status_record)
            .collect())
    }

    async fn get_file_content_once(&self, path: &str, branch: &str) -> Result<String, ForgeError> {
        let contents = self
            .client
            .repos(self.owner(), self.repo())
            .get_content()
            .path(path)
            .r#ref(branch)
            .send()
            .await
            .map_err(ForgeError::from_octocrab)?;

        contents
            .items
            .into_iter()
            .next()
            .and_then(|item| item.decoded_content())
            .ok_or_else(|| {
                ForgeError::permanent(format!("file {path} not found on branch {branch}"))
            })
    }
}

// ─── Check-run wire types ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CheckRunList {
    check_runs: Vec<CheckRun>,
}

#[derive(Debug, Deserialize)]
struct CheckRun {
    name: String,
    status: String,
    conclusion: Option<String>,
    app: Option<CheckRunApp>,
}

#[derive(Debug, Deserialize)]
struct CheckRunApp {
    name: String,
}

impl CheckRun {
    fn into_status_record(self) -> StatusRecord {
        StatusRecord {
            name: self.name,
            completed: self.status == "completed",
            successful: self.conclusion.as_deref() == Some("success"),
        }
    }
}

// ─── Forge implementation ─────────────────────────────────────────────────────

impl Forge for GithubForge {
    fn bot_account(&self) -> &str {
        self.profile.github_bot_name
    }

    fn instance_label(&self) -> &str {
        &self.label
    }

    fn default_branch(&self) -> &str {
        &self.default_branch
    }

    fn copr_project_name(&self, pr: PrNumber) -> String {
        format!("{}-{}-{}", self.project.namespace, self.project.repo, pr.0)
    }

    async fn list_prs(&self) -> Result<Vec<PullRequest>, ForgeError> {
        retry_with_backoff(RetryConfig::DEFAULT, RetryPolicy::RetryTransient, || {
            self.list_prs_once()
        })
        .await
    }

    async fn create_pr(
        &self,
        title: &str,
        body: &str,
        source_branch: &str,
        target_branch: &str,
    ) -> Result<PullRequest, ForgeError> {
        let pull = self
            .client
            .pulls(self.owner(), self.repo())
            .create(title, source_branch, target_branch)
            .body(body)
            .send()
            .await
            .map_err(ForgeError::from_octocrab)?;

        Ok(PullRequest {
            number: PrNumber(pull.number),
            title: pull.title.unwrap_or_else(|| title.to_string()),
            url: pull.html_url.map(|u| u.to_string()).unwrap_or_default(),
            head_commit: Sha::new(pull.head.sha),
            source_branch: pull.head.ref_field,
        })
    }

    async fn close_pr(&self, pr: PrNumber) -> Result<(), ForgeError> {
        self.client
            .pulls(self.owner(), self.repo())
            .update(pr.0)
            .state(params::pulls::State::Closed)
            .send()
            .await
            .map_err(ForgeError::from_octocrab)?;
        Ok(())
    }

    async fn post_comment(&self, pr: PrNumber, body: &str) -> Result<(), ForgeError> {
        // Trigger-firing call: never retried, so the service can't be
        // provoked twice by one scenario.
        self.client
            .issues(self.owner(), self.repo())
            .create_comment(pr.0, body)
            .await
            .map_err(ForgeError::from_octocrab)?;
        Ok(())
    }

    async fn list_comments(&self, pr: PrNumber) -> Result<Vec<Comment>, ForgeError> {
        retry_with_backoff(RetryConfig::DEFAULT, RetryPolicy::RetryTransient, || {
            self.list_comments_once(pr)
        })
        .await
    }

    async fn list_statuses(&self, commit: &Sha) -> Result<Vec<StatusRecord>, ForgeError> {
        retry_with_backoff(RetryConfig::DEFAULT, RetryPolicy::RetryTransient, || {
            self.list_statuses_once(commit)
        })
        .await
    }

    async fn delete_branch(&self, branch: &str) -> Result<(), ForgeError> {
        let route = format!(
            "/repos/{}/{}/git/refs/heads/{}",
            self.owner(),
            self.repo(),
            branch
        );
        let response = self
            .client
            ._delete(&route, None::<&()>)
            .await
            .map_err(ForgeError::from_octocrab)?;

        let status = response.status().as_u16();
        // 404/422 mean the branch is already gone, which is what we wanted.
        if response.status().is_success() || status == 404 || status == 422 {
            Ok(())
        } else {
            Err(ForgeError::from_status(
                status,
                format!("deleting branch {branch} failed"),
            ))
        }
    }

    async fn create_branch_and_seed_file(&self, branch: &str) -> Result<(), ForgeError> {
        let head = self.branch_head(&self.default_branch).await?;

        self.client
            .repos(self.owner(), self.repo())
            .create_ref(&Reference::Branch(branch.to_string()), head.as_str())
            .await
            .map_err(ForgeError::from_octocrab)?;

        self.client
            .repos(self.owner(), self.repo())
            .create_file(SEED_FILE, "Opened PR trigger", SEED_CONTENT)
            .branch(branch)
            .send()
            .await
            .map_err(ForgeError::from_octocrab)?;

        Ok(())
    }

    async fn get_file_content(&self, path: &str, branch: &str) -> Result<String, ForgeError> {
        retry_with_backoff(RetryConfig::DEFAULT, RetryPolicy::RetryTransient, || {
            self.get_file_content_once(path, branch)
        })
        .await
    }

    async fn update_file(
        &self,
        path: &str,
        branch: &str,
        content: &str,
        message: &str,
    ) -> Result<(), ForgeError> {
        let blob_sha = self.file_blob_sha(path, branch).await?;

        self.client
            .repos(self.owner(), self.repo())
            .update_file(path, message, content, &blob_sha)
            .branch(branch)
            .send()
            .await
            .map_err(ForgeError::from_octocrab)?;

        Ok(())
    }

    async fn create_empty_commit(&self, branch: &str, message: &str) -> Result<Sha, ForgeError> {
        // The contents API happily commits an unchanged file, which is the
        // closest GitHub gets to an empty commit.
        let blob_sha = self.file_blob_sha(SEED_FILE, branch).await?;

        self.client
            .repos(self.owner(), self.repo())
            .update_file(SEED_FILE, message, PUSH_CONTENT, &blob_sha)
            .branch(branch)
            .send()
            .await
            .map_err(ForgeError::from_octocrab)?;

        self.branch_head(branch).await
    }
}

impl std::fmt::Debug for GithubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubForge")
            .field("project", &self.project)
            .field("default_branch", &self.default_branch)
            .finish_non_exhaustive()
    }
}
