//! GitLab adapter, speaking the v4 REST API through reqwest.
//!
//! Unlike GitHub, a commit carries plain commit statuses rather than check
//! runs: a status is complete once it leaves `pending`/`running`/`created`,
//! and the service's statuses are recognized by author username rather than
//! app identity. The harness talks to several GitLab instances (gitlab.com,
//! GNOME, freedesktop, Salsa), so everything is parameterized by base URL.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::deployment::DeploymentProfile;
use crate::types::{Comment, PrNumber, ProjectId, PullRequest, Sha, StatusRecord};

use super::Forge;
use super::error::ForgeError;
use super::retry::{RetryConfig, RetryPolicy, retry_with_backoff};

const SEED_FILE: &str = "test.txt";
const SEED_CONTENT: &str = "Testing the opened PR trigger.";
const AUTHOR_NAME: &str = "Packit Validation";
const AUTHOR_EMAIL: &str = "validation@packit.dev";

/// A GitLab client scoped to one project on one instance.
pub struct GitlabForge {
    http: reqwest::Client,
    token: String,
    base_url: String,
    hostname: String,
    project: ProjectId,
    /// URL-encoded `namespace/repo`, as the projects API wants it.
    encoded_path: String,
    profile: Arc<DeploymentProfile>,
    default_branch: String,
    label: String,
}

impl GitlabForge {
    /// Builds a client for one instance and resolves the project's default
    /// branch up front.
    pub async fn connect(
        base_url: impl Into<String>,
        token: impl Into<String>,
        project: ProjectId,
        profile: Arc<DeploymentProfile>,
    ) -> Result<Self, ForgeError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let hostname = base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .to_string();
        let encoded_path = encode_path(&format!("{}/{}", project.namespace, project.repo));

        let forge = GitlabForge {
            http: reqwest::Client::new(),
            token: token.into(),
            label: format!("{}/{}", base_url, project),
            base_url,
            hostname,
            project,
            encoded_path,
            profile,
            default_branch: String::new(),
        };

        #[derive(Debug, Deserialize)]
        struct Project {
            default_branch: Option<String>,
        }

        let info: Project = forge.get_json(&forge.api(""), &[]).await?;
        Ok(GitlabForge {
            default_branch: info.default_branch.unwrap_or_else(|| "main".to_string()),
            ..forge
        })
    }

    /// Project-scoped API URL: `{base}/api/v4/projects/{encoded}{path}`.
    fn api(&self, path: &str) -> String {
        format!(
            "{}/api/v4/projects/{}{}",
            self.base_url, self.encoded_path, path
        )
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ForgeError> {
        let response = request
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await
            .map_err(ForgeError::from_reqwest)?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            Err(ForgeError::from_status(
                status.as_u16(),
                format!("{url}: {body}"),
            ))
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ForgeError> {
        let response = self.send(self.http.get(url).query(query)).await?;
        response.json().await.map_err(ForgeError::from_reqwest)
    }

    async fn list_prs_once(&self) -> Result<Vec<PullRequest>, ForgeError> {
        let mrs: Vec<MergeRequest> = self
            .get_json(
                &self.api("/merge_requests"),
                &[("state", "opened"), ("per_page", "100")],
            )
            .await?;
        Ok(mrs.into_iter().map(MergeRequest::into_pull_request).collect())
    }

    async fn list_comments_once(&self, pr: PrNumber) -> Result<Vec<Comment>, ForgeError> {
        let notes: Vec<Note> = self
            .get_json(
                &self.api(&format!("/merge_requests/{}/notes", pr.0)),
                &[
                    ("order_by", "created_at"),
                    ("sort", "desc"),
                    ("per_page", "100"),
                ],
            )
            .await?;

        // System notes ("added 1 commit", ...) are noise, not comments.
        Ok(notes
            .into_iter()
            .filter(|note| !note.system)
            .map(|note| Comment {
                author: note.author.username,
                body: note.body,
            })
            .collect())
    }

    async fn list_statuses_once(&self, commit: &Sha) -> Result<Vec<StatusRecord>, ForgeError> {
        let statuses: Vec<CommitStatus> = self
            .get_json(
                &self.api(&format!("/repository/commits/{}/statuses", commit)),
                &[("per_page", "100")],
            )
            .await?;

        Ok(statuses
            .into_iter()
            .filter(|status| status.author.username == self.profile.gitlab_account_name)
            .map(CommitStatus::into_status_record)
            .collect())
    }

    async fn get_file_content_once(&self, path: &str, branch: &str) -> Result<String, ForgeError> {
        let url = self.api(&format!("/repository/files/{}/raw", encode_path(path)));
        let response = self
            .send(self.http.get(&url).query(&[("ref", branch)]))
            .await?;
        response.text().await.map_err(ForgeError::from_reqwest)
    }
}

/// Percent-encodes a path component the way the GitLab API expects
/// (`namespace/repo` -> `namespace%2Frepo`).
fn encode_path(path: &str) -> String {
    path.replace('/', "%2F").replace('.', "%2E")
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MergeRequest {
    iid: u64,
    title: String,
    web_url: String,
    /// Head commit of the source branch; briefly null right after creation.
    sha: Option<String>,
    source_branch: String,
}

impl MergeRequest {
    fn into_pull_request(self) -> PullRequest {
        PullRequest {
            number: PrNumber(self.iid),
            title: self.title,
            url: self.web_url,
            head_commit: Sha::new(self.sha.unwrap_or_default()),
            source_branch: self.source_branch,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Note {
    body: String,
    author: Author,
    #[serde(default)]
    system: bool,
}

#[derive(Debug, Deserialize)]
struct Author {
    username: String,
}

#[derive(Debug, Deserialize)]
struct CommitStatus {
    name: String,
    status: String,
    author: Author,
}

impl CommitStatus {
    fn into_status_record(self) -> StatusRecord {
        // `created` is the just-registered state, `pending`/`running` are in
        // flight; everything else (success, failed, canceled, skipped) is
        // settled.
        let completed = !matches!(self.status.as_str(), "created" | "pending" | "running");
        StatusRecord {
            name: self.name,
            completed,
            successful: self.status == "success",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedCommit {
    id: String,
}

// ─── Forge implementation ─────────────────────────────────────────────────────

impl Forge for GitlabForge {
    fn bot_account(&self) -> &str {
        self.profile.gitlab_account_name
    }

    fn instance_label(&self) -> &str {
        &self.label
    }

    fn default_branch(&self) -> &str {
        &self.default_branch
    }

    fn copr_project_name(&self, pr: PrNumber) -> String {
        format!(
            "{}-{}-{}-{}",
            self.hostname, self.project.namespace, self.project.repo, pr.0
        )
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
        let response = self
            .send(self.http.post(self.api("/merge_requests")).json(
                &serde_json::json!({
                    "title": title,
                    "description": body,
                    "source_branch": source_branch,
                    "target_branch": target_branch,
                }),
            ))
            .await?;

        let mr: MergeRequest = response.json().await.map_err(ForgeError::from_reqwest)?;
        Ok(mr.into_pull_request())
    }

    async fn close_pr(&self, pr: PrNumber) -> Result<(), ForgeError> {
        self.send(
            self.http
                .put(self.api(&format!("/merge_requests/{}", pr.0)))
                .json(&serde_json::json!({"state_event": "close"})),
        )
        .await?;
        Ok(())
    }

    async fn post_comment(&self, pr: PrNumber, body: &str) -> Result<(), ForgeError> {
        // Trigger-firing call: never retried.
        self.send(
            self.http
                .post(self.api(&format!("/merge_requests/{}/notes", pr.0)))
                .json(&serde_json::json!({"body": body})),
        )
        .await?;
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
        let url = self.api(&format!("/repository/branches/{}", encode_path(branch)));
        let response = self
            .http
            .delete(&url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await
            .map_err(ForgeError::from_reqwest)?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ForgeError::from_status(
                status.as_u16(),
                format!("deleting branch {branch} failed: {body}"),
            ))
        }
    }

    async fn create_branch_and_seed_file(&self, branch: &str) -> Result<(), ForgeError> {
        self.send(
            self.http
                .post(self.api("/repository/branches"))
                .query(&[("branch", branch), ("ref", &self.default_branch)]),
        )
        .await?;

        self.send(
            self.http
                .post(self.api(&format!("/repository/files/{}", encode_path(SEED_FILE))))
                .json(&serde_json::json!({
                    "branch": branch,
                    "content": SEED_CONTENT,
                    "commit_message": "Opened PR trigger",
                    "author_name": AUTHOR_NAME,
                    "author_email": AUTHOR_EMAIL,
                })),
        )
        .await?;

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
        self.send(
            self.http
                .put(self.api(&format!("/repository/files/{}", encode_path(path))))
                .json(&serde_json::json!({
                    "branch": branch,
                    "content": content,
                    "commit_message": message,
                })),
        )
        .await?;
        Ok(())
    }

    async fn create_empty_commit(&self, branch: &str, message: &str) -> Result<Sha, ForgeError> {
        // An empty `actions` list makes a commit with no changes; GitLab
        // supports this directly, unlike GitHub.
        let response = self
            .send(self.http.post(self.api("/repository/commits")).json(
                &serde_json::json!({
                    "branch": branch,
                    "commit_message": message,
                    "actions": [],
                }),
            ))
            .await?;

        let commit: CreatedCommit = response.json().await.map_err(ForgeError::from_reqwest)?;
        Ok(Sha::new(commit.id))
    }
}

impl std::fmt::Debug for GitlabForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitlabForge")
            .field("base_url", &self.base_url)
            .field("project", &self.project)
            .field("default_branch", &self.default_branch)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_encoding() {
        assert_eq!(encode_path("packit-service/hello-world"), "packit-service%2Fhello-world");
        assert_eq!(encode_path(".packit.yaml"), "%2Epackit%2Eyaml");
    }

    #[test]
    fn status_states_map_to_completed() {
        for (status, completed, successful) in [
            ("created", false, false),
            ("pending", false, false),
            ("running", false, false),
            ("success", true, true),
            ("failed", true, false),
            ("canceled", true, false),
        ] {
            let record = CommitStatus {
                name: "rpm-build".to_string(),
                status: status.to_string(),
                author: Author {
                    username: "packit-as-a-service".to_string(),
                },
            }
            .into_status_record();
            assert_eq!(record.completed, completed, "status {status}");
            assert_eq!(record.successful, successful, "status {status}");
        }
    }

    #[test]
    fn merge_request_with_null_sha() {
        let json = r#"{
            "iid": 7,
            "title": "Basic test case: comment trigger",
            "web_url": "https://gitlab.com/packit-service/hello-world/-/merge_requests/7",
            "sha": null,
            "source_branch": "test-comment"
        }"#;
        let mr: MergeRequest = serde_json::from_str(json).unwrap();
        let pr = mr.into_pull_request();
        assert_eq!(pr.number, PrNumber(7));
        assert_eq!(pr.head_commit.as_str(), "");
    }
}
