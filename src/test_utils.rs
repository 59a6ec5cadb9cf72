//! Scripted fakes for exercising the polling loops without a network.
//!
//! Both fakes are scripted per call: each poll consumes the next entry of the
//! relevant script and the last entry repeats once the script runs out, so a
//! test describes "what the remote reports over time" as a plain vector.
//! Every observable action (comments posted, branches deleted, PRs closed) is
//! recorded for assertions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::copr::{BuildFarm, CoprError};
use crate::forge::{Forge, ForgeError};
use crate::types::{
    BuildId, BuildRecord, BuildState, Comment, PrNumber, PullRequest, Sha, StatusRecord,
};

pub const FAKE_COMMIT_SHA: &str = "1111111111111111111111111111111111111111";

pub fn sample_pr(number: u64, title: &str) -> PullRequest {
    PullRequest {
        number: PrNumber(number),
        title: title.to_string(),
        url: format!("https://github.com/packit/hello-world/pull/{number}"),
        head_commit: Sha::new("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"),
        source_branch: format!("test-branch-{number}"),
    }
}

pub fn status(name: &str, completed: bool, successful: bool) -> StatusRecord {
    StatusRecord {
        name: name.to_string(),
        completed,
        successful,
    }
}

pub fn build(id: u64, state: BuildState) -> BuildRecord {
    BuildRecord {
        id: BuildId(id),
        state,
    }
}

// ─── Forge fake ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct ForgeState {
    /// Open PRs returned by `list_prs`.
    pub prs: Vec<PullRequest>,
    /// Per-call script for `list_statuses`; last entry repeats, empty script
    /// means no statuses ever.
    pub status_script: Vec<Vec<StatusRecord>>,
    pub status_calls: usize,
    /// Per-call script for `list_comments` (each entry newest first).
    pub comment_script: Vec<Vec<Comment>>,
    pub comment_calls: usize,
    /// PR returned by `create_pr`.
    pub next_pr: Option<PullRequest>,
    /// File contents served by `get_file_content`, keyed by path.
    pub files: HashMap<String, String>,

    // Recorded actions.
    pub posted_comments: Vec<(PrNumber, String)>,
    pub closed_prs: Vec<PrNumber>,
    pub deleted_branches: Vec<String>,
    pub created_branches: Vec<String>,
    pub created_pr_titles: Vec<String>,
    pub updated_files: Vec<(String, String)>,
    pub empty_commits: Vec<(String, String)>,
}

pub struct FakeForge {
    bot: String,
    state: Mutex<ForgeState>,
}

impl FakeForge {
    pub fn new(bot: &str) -> Self {
        FakeForge {
            bot: bot.to_string(),
            state: Mutex::new(ForgeState::default()),
        }
    }

    pub fn with_state(bot: &str, state: ForgeState) -> Self {
        FakeForge {
            bot: bot.to_string(),
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, ForgeState> {
        self.state.lock().unwrap()
    }
}

fn scripted<T: Clone>(script: &[Vec<T>], call: usize) -> Vec<T> {
    match script.len() {
        0 => Vec::new(),
        len => script[call.min(len - 1)].clone(),
    }
}

impl Forge for FakeForge {
    fn bot_account(&self) -> &str {
        &self.bot
    }

    fn instance_label(&self) -> &str {
        "fake-forge"
    }

    fn default_branch(&self) -> &str {
        "main"
    }

    fn copr_project_name(&self, pr: PrNumber) -> String {
        format!("packit-hello-world-{}", pr.0)
    }

    async fn list_prs(&self) -> Result<Vec<PullRequest>, ForgeError> {
        Ok(self.state().prs.clone())
    }

    async fn create_pr(
        &self,
        title: &str,
        _body: &str,
        _source_branch: &str,
        _target_branch: &str,
    ) -> Result<PullRequest, ForgeError> {
        let mut state = self.state();
        state.created_pr_titles.push(title.to_string());
        state
            .next_pr
            .clone()
            .ok_or_else(|| ForgeError::permanent("no scripted PR to create"))
    }

    async fn close_pr(&self, pr: PrNumber) -> Result<(), ForgeError> {
        self.state().closed_prs.push(pr);
        Ok(())
    }

    async fn post_comment(&self, pr: PrNumber, body: &str) -> Result<(), ForgeError> {
        self.state().posted_comments.push((pr, body.to_string()));
        Ok(())
    }

    async fn list_comments(&self, _pr: PrNumber) -> Result<Vec<Comment>, ForgeError> {
        let mut state = self.state();
        let call = state.comment_calls;
        state.comment_calls += 1;
        Ok(scripted(&state.comment_script, call))
    }

    async fn list_statuses(&self, _commit: &Sha) -> Result<Vec<StatusRecord>, ForgeError> {
        let mut state = self.state();
        let call = state.status_calls;
        state.status_calls += 1;
        Ok(scripted(&state.status_script, call))
    }

    async fn delete_branch(&self, branch: &str) -> Result<(), ForgeError> {
        self.state().deleted_branches.push(branch.to_string());
        Ok(())
    }

    async fn create_branch_and_seed_file(&self, branch: &str) -> Result<(), ForgeError> {
        self.state().created_branches.push(branch.to_string());
        Ok(())
    }

    async fn get_file_content(&self, path: &str, _branch: &str) -> Result<String, ForgeError> {
        self.state()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| ForgeError::permanent(format!("no scripted file {path}")))
    }

    async fn update_file(
        &self,
        path: &str,
        _branch: &str,
        content: &str,
        _message: &str,
    ) -> Result<(), ForgeError> {
        self.state()
            .updated_files
            .push((path.to_string(), content.to_string()));
        Ok(())
    }

    async fn create_empty_commit(&self, branch: &str, message: &str) -> Result<Sha, ForgeError> {
        self.state()
            .empty_commits
            .push((branch.to_string(), message.to_string()));
        Ok(Sha::new(FAKE_COMMIT_SHA))
    }
}

// ─── Build farm fake ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FarmState {
    /// The first N `list_builds` calls fail with a retryable project-missing
    /// error.
    pub failing_list_calls: usize,
    /// Per-call script for `list_builds` (each entry newest first); last
    /// entry repeats.
    pub list_script: Vec<Vec<BuildRecord>>,
    pub list_calls: usize,
    /// Per-call script for `get_build`; last entry repeats.
    pub state_script: Vec<BuildState>,
    pub get_calls: usize,
}

pub struct FakeFarm {
    state: Mutex<FarmState>,
}

impl FakeFarm {
    pub fn new(state: FarmState) -> Self {
        FakeFarm {
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FarmState> {
        self.state.lock().unwrap()
    }
}

impl BuildFarm for FakeFarm {
    async fn list_builds(&self, _owner: &str, project: &str) -> Result<Vec<BuildRecord>, CoprError> {
        let mut state = self.state();
        state.list_calls += 1;
        if state.list_calls <= state.failing_list_calls {
            return Err(CoprError::project_not_found(format!(
                "project {project} does not exist"
            )));
        }
        let call = state.list_calls - state.failing_list_calls - 1;
        Ok(scripted(&state.list_script, call))
    }

    async fn get_build(&self, id: BuildId) -> Result<BuildRecord, CoprError> {
        let mut state = self.state();
        let call = state.get_calls;
        state.get_calls += 1;
        match state.state_script.len() {
            0 => Err(CoprError::project_not_found(format!(
                "build {id} does not exist"
            ))),
            len => Ok(BuildRecord {
                id,
                state: state.state_script[call.min(len - 1)],
            }),
        }
    }
}
