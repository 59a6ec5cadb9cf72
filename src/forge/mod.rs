//! Forge adapters: the fixed capability set the watchers need, implemented
//! once per forge.
//!
//! GitHub and GitLab differ structurally (check runs vs commit statuses,
//! refs vs branch endpoints, app identity vs author username), so each
//! adapter translates its native API into the forge-neutral types in
//! `crate::types` at the boundary. The variant is selected at construction
//! time; the watchers are generic over this trait and never branch on the
//! forge.

use std::future::Future;

use crate::types::{Comment, PrNumber, PullRequest, Sha, StatusRecord};

pub mod error;
pub mod github;
pub mod gitlab;
pub mod retry;

pub use error::{ForgeError, ForgeErrorKind};
pub use github::GithubForge;
pub use gitlab::GitlabForge;
pub use retry::{RetryConfig, RetryPolicy, retry_with_backoff};

/// The capabilities a forge must provide to the validation core.
///
/// Implementations are scoped to a single project at construction time, so
/// none of the methods take a project argument.
pub trait Forge: Send + Sync {
    /// Login/username of the service's bot account on this forge, used to
    /// attribute comments.
    fn bot_account(&self) -> &str;

    /// Human-readable instance label for logs (e.g. the instance URL).
    fn instance_label(&self) -> &str;

    /// Default branch of the project, targeted by fresh PRs.
    fn default_branch(&self) -> &str;

    /// Copr project name the service will build this PR under. The naming
    /// scheme is forge-specific (GitLab prefixes hostname and namespace).
    fn copr_project_name(&self, pr: PrNumber) -> String;

    /// Lists open pull requests.
    fn list_prs(&self) -> impl Future<Output = Result<Vec<PullRequest>, ForgeError>> + Send;

    /// Opens a pull request from `source_branch` into `target_branch`.
    fn create_pr(
        &self,
        title: &str,
        body: &str,
        source_branch: &str,
        target_branch: &str,
    ) -> impl Future<Output = Result<PullRequest, ForgeError>> + Send;

    /// Closes a pull request without merging.
    fn close_pr(&self, pr: PrNumber) -> impl Future<Output = Result<(), ForgeError>> + Send;

    /// Posts a comment on a pull request.
    fn post_comment(
        &self,
        pr: PrNumber,
        body: &str,
    ) -> impl Future<Output = Result<(), ForgeError>> + Send;

    /// Lists comments on a pull request, newest first.
    fn list_comments(
        &self,
        pr: PrNumber,
    ) -> impl Future<Output = Result<Vec<Comment>, ForgeError>> + Send;

    /// Lists the service's own statuses/check runs for a commit, already
    /// filtered to the bot identity from the deployment profile.
    fn list_statuses(
        &self,
        commit: &Sha,
    ) -> impl Future<Output = Result<Vec<StatusRecord>, ForgeError>> + Send;

    /// Deletes a branch. Succeeds (as a no-op) if the branch is absent.
    fn delete_branch(&self, branch: &str)
    -> impl Future<Output = Result<(), ForgeError>> + Send;

    /// Creates `branch` off the default branch and commits a seed file to it,
    /// so the fresh PR has a diff.
    fn create_branch_and_seed_file(
        &self,
        branch: &str,
    ) -> impl Future<Output = Result<(), ForgeError>> + Send;

    /// Reads a file's content on a branch.
    fn get_file_content(
        &self,
        path: &str,
        branch: &str,
    ) -> impl Future<Output = Result<String, ForgeError>> + Send;

    /// Replaces a file's content on a branch with a new commit.
    fn update_file(
        &self,
        path: &str,
        branch: &str,
        content: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), ForgeError>> + Send;

    /// Creates an empty (or effectively empty) commit on a branch and returns
    /// its SHA. GitHub has no empty-commit endpoint, so that adapter rewrites
    /// a file with unchanged content instead.
    fn create_empty_commit(
        &self,
        branch: &str,
        message: &str,
    ) -> impl Future<Output = Result<Sha, ForgeError>> + Send;
}
