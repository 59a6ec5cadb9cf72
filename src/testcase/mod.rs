//! One validation run: trigger the service, watch it react, judge the result.
//!
//! A `TestCase` binds a project, an optional pull request and a trigger, then
//! walks a strictly sequential pipeline:
//!
//! ```text
//! trigger -> queue signal -> build submitted -> build finished -> statuses -> comment
//! ```
//!
//! Every stage is a bounded polling loop (intervals and windows from
//! [`WatchConfig`](crate::watch::WatchConfig)). Nothing a stage observes is
//! fatal: deviations are appended to the failure narrative and the run keeps
//! going, except that a queue-signal timeout abandons the remaining stages
//! (nothing to watch) and a failed build skips the status-propagation poll
//! (its checks are expected to mirror the failure; the comment check covers
//! that path instead).
//!
//! The narrative is append-only. A non-empty narrative at the end means the
//! scenario failed and is reported through the alert sink.


use std::sync::Arc;
use thiserror::Error;
use tokio::time::{Instant, sleep};

use crate::copr::{BuildFarm, CoprError};
use crate::deployment::DeploymentProfile;
use crate::forge::{Forge, ForgeError};
use crate::report::AlertSink;
use crate::types::{BuildId, BuildRecord, BuildState, PullRequest, Sha, StatusRecord, Trigger};
use crate::watch::WatchConfig;

/// Body of the PR the PR-open scenario creates.
const OPENED_PR_BODY: &str = "This test case is triggered automatically by our validation script.";

/// Path of the service config file rewritten by the opened-PR yaml fix.
const SERVICE_CONFIG_FILE: &str = ".packit.yaml";

/// An error that escapes a test-case stage.
///
/// These are caught at the scenario's outer boundary (`TestCase::run`),
/// logged, turned into one observable narrative line, and never propagate to
/// other scenarios.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Forge(#[from] ForgeError),

    #[error(transparent)]
    BuildFarm(#[from] CoprError),

    /// A stage that requires a pull request ran before one existed. Only
    /// reachable through a programming error in the pipeline ordering.
    #[error("scenario reached a stage that requires a pull request")]
    MissingPr,
}

/// A single trigger scenario against one project.
pub struct TestCase<F, B> {
    forge: Arc<F>,
    farm: Arc<B>,
    profile: Arc<DeploymentProfile>,
    config: WatchConfig,
    trigger: Trigger,
    pr: Option<PullRequest>,
    /// Overrides the profile's trigger comment (used by the VM-image-build
    /// scenario).
    comment: Option<String>,
    /// Head commit the service is expected to report against. Set from the
    /// PR at construction; replaced only by a push trigger's fresh commit or
    /// a PR-open trigger's initial commit.
    head_commit: Option<Sha>,
    /// Source branch created by this run, if any; deleted during cleanup.
    created_branch: Option<String>,
    /// Ordered, append-only failure narrative.
    failures: Vec<String>,
    /// Set once the build-completion poll observes an unsuccessful terminal
    /// state; gates the status-propagation skip and the comment check.
    build_failed: bool,
}

impl<F: Forge, B: BuildFarm> TestCase<F, B> {
    pub fn new(
        forge: Arc<F>,
        farm: Arc<B>,
        profile: Arc<DeploymentProfile>,
        config: WatchConfig,
        trigger: Trigger,
        pr: Option<PullRequest>,
        comment: Option<String>,
    ) -> Self {
        let head_commit = pr.as_ref().map(|pr| pr.head_commit.clone());
        TestCase {
            forge,
            farm,
            profile,
            config,
            trigger,
            pr,
            comment,
            head_commit,
            created_branch: None,
            failures: Vec::new(),
            build_failed: false,
        }
    }

    /// Runs the scenario end to end: checks, reporting, cleanup.
    ///
    /// This is the outer catch boundary: whatever happens inside, it logs,
    /// reports, and returns - one broken scenario never takes down the rest.
    pub async fn run(mut self, sink: &AlertSink) {
        let scenario = self.describe();
        tracing::info!(scenario = %scenario, "starting validation scenario");

        if let Err(e) = self.run_checks().await {
            tracing::error!(scenario = %scenario, error = %e, "validation scenario aborted");
            self.record_failure(format!("Scenario aborted by caught error: {e}"));
        }

        if !self.failures.is_empty() {
            let target = match &self.pr {
                Some(pr) => format!("{} ({})", pr.title, pr.url),
                None => format!("{} scenario", self.trigger),
            };
            sink.report(&format!("{} failed:\n{}", target, self.failures.join("\n")))
                .await;
        } else {
            tracing::info!(scenario = %scenario, "validation scenario passed");
        }

        if self.trigger == Trigger::PrOpened {
            self.cleanup().await;
        }
    }

    /// The sequential check pipeline. A `None` from the submission watcher
    /// means there is no build to follow up on, so the remaining stages are
    /// skipped.
    async fn run_checks(&mut self) -> Result<(), ScenarioError> {
        let Some(build) = self.check_build_submitted().await? else {
            return Ok(());
        };

        self.check_build(build.id).await?;
        self.check_completed_statuses().await?;
        self.check_comment().await?;
        Ok(())
    }

    // ─── Build submission watcher ─────────────────────────────────────────────

    /// Fires the trigger and watches until the service submits a build, or
    /// the window expires.
    ///
    /// Baselines (build count, comment count) are captured before the
    /// trigger; a missing Copr project counts as zero builds, and a missing
    /// PR (PR-open trigger) as zero of both.
    pub(crate) async fn check_build_submitted(
        &mut self,
    ) -> Result<Option<BuildRecord>, ScenarioError> {
        let (baseline_builds, baseline_comments) = match &self.pr {
            Some(pr) => {
                let project = self.forge.copr_project_name(pr.number);
                let builds = match self
                    .farm
                    .list_builds(self.profile.copr_user, &project)
                    .await
                {
                    Ok(builds) => builds.len(),
                    Err(e) => {
                        tracing::debug!(error = %e, "no build baseline, assuming zero");
                        0
                    }
                };
                let comments = self.forge.list_comments(pr.number).await?.len();
                (builds, comments)
            }
            None => (0, 0),
        };

        self.trigger_build().await?;

        let deadline = Instant::now() + self.config.submit_window;

        if !self.check_queued_statuses().await? {
            // No queue signal within the window: the service never noticed
            // the trigger, so there is nothing further to watch.
            return Ok(None);
        }

        let pr = self.pr.as_ref().ok_or(ScenarioError::MissingPr)?;
        let project = self.forge.copr_project_name(pr.number);
        let pr_number = pr.number;
        tracing::info!(
            project = %project,
            "watching for a submitted Copr build"
        );

        let mut early_comment_reported = false;
        loop {
            if Instant::now() > deadline {
                self.record_failure("The build was not submitted in Copr in time 15 minutes.");
                return Ok(None);
            }

            match self
                .farm
                .list_builds(self.profile.copr_user, &project)
                .await
            {
                Err(e) => {
                    // Typically the Copr project hasn't been created yet;
                    // retryable, and not a timeout condition of its own.
                    tracing::warn!(error = %e, "Copr project not available yet");
                }
                Ok(builds) => {
                    if builds.len() >= baseline_builds + 1 {
                        return Ok(builds.into_iter().next());
                    }

                    // An unexpected comment from the service while we wait
                    // usually means it rejected the trigger.
                    let comments = self.forge.list_comments(pr_number).await?;
                    let new_count = comments.len().saturating_sub(baseline_comments);
                    if new_count > 1 && !early_comment_reported {
                        if let Some(comment) = comments[..new_count]
                            .iter()
                            .find(|c| c.author == self.forge.bot_account())
                        {
                            self.record_failure(format!(
                                "New comment from {} while submitting the Copr build: {}",
                                self.forge.bot_account(),
                                comment.body
                            ));
                            early_comment_reported = true;
                        }
                    }
                }
            }

            sleep(self.config.submit_interval).await;
        }
    }

    /// Waits for the queue signal: the service's statuses exist and have
    /// moved past their initial state.
    ///
    /// The first loop waits for the status list to become non-empty at all
    /// (a just-created PR has none). After that it polls the statuses named
    /// at entry until one is observed outside a completed state - a status
    /// flips from its uninitiated shape to queued/in-progress quickly, so
    /// seeing any not-yet-completed status is the signal. Returns false on
    /// timeout.
    pub(crate) async fn check_queued_statuses(&mut self) -> Result<bool, ScenarioError> {
        const TIMEOUT_FINDING: &str = "Github check runs were not set to queued in time 1 minute.";

        let deadline = Instant::now() + self.config.queue_window;
        let head = self.head_commit.clone().ok_or(ScenarioError::MissingPr)?;

        let mut names: Vec<String> = status_names(&self.forge.list_statuses(&head).await?);
        while names.is_empty() {
            if Instant::now() > deadline {
                self.record_failure(TIMEOUT_FINDING);
                return Ok(false);
            }
            sleep(self.config.queue_interval).await;
            names = status_names(&self.forge.list_statuses(&head).await?);
        }

        tracing::info!(commit = %head.short(), "watching pending statuses");
        loop {
            if Instant::now() > deadline {
                self.record_failure(TIMEOUT_FINDING);
                return Ok(false);
            }

            let statuses = self.forge.list_statuses(&head).await?;
            if statuses
                .iter()
                .filter(|s| names.contains(&s.name))
                .any(|s| !s.completed)
            {
                return Ok(true);
            }

            sleep(self.config.queue_interval).await;
        }
    }

    // ─── Status propagation watcher ───────────────────────────────────────────

    /// Polls the build on Copr until it reaches a terminal state or the
    /// window expires. An unsuccessful terminal state is recorded and flips
    /// `build_failed`.
    pub(crate) async fn check_build(&mut self, build: BuildId) -> Result<(), ScenarioError> {
        let deadline = Instant::now() + self.config.build_window;
        let mut last_state: Option<BuildState> = None;

        tracing::info!(build = %build, "watching Copr build");
        loop {
            if Instant::now() > deadline {
                self.record_failure("The build did not finish in time 15 minutes.");
                return Ok(());
            }

            let record = self.farm.get_build(build).await?;

            // Unchanged state: nothing new to evaluate or log.
            if last_state == Some(record.state) {
                sleep(self.config.build_interval).await;
                continue;
            }
            last_state = Some(record.state);
            tracing::info!(build = %build, state = %record.state, "Copr build state changed");

            if record.state.is_terminal() {
                if record.state != BuildState::Succeeded {
                    self.record_failure(format!(
                        "The build in Copr was not successful. Copr state: {}.",
                        record.state
                    ));
                    self.build_failed = true;
                }
                return Ok(());
            }

            sleep(self.config.build_interval).await;
        }
    }

    /// Waits for every status on the head commit to complete, then records a
    /// finding per unsuccessful one.
    ///
    /// Skipped entirely when the build already failed: the statuses are
    /// expected to mirror that failure eventually, and the comment check
    /// validates that path instead. (Deliberate policy, inherited from the
    /// original workflow.)
    pub(crate) async fn check_completed_statuses(&mut self) -> Result<(), ScenarioError> {
        if self.build_failed {
            tracing::info!("skipping status propagation check after failed build");
            return Ok(());
        }

        let statuses = self.watch_statuses().await?;
        for finding in evaluate_statuses(&statuses) {
            self.record_failure(finding);
        }
        Ok(())
    }

    /// Polls the head commit's statuses until all are completed or the
    /// window expires. On timeout, records one finding naming every
    /// still-incomplete status and returns an empty set.
    pub(crate) async fn watch_statuses(&mut self) -> Result<Vec<StatusRecord>, ScenarioError> {
        let deadline = Instant::now() + self.config.status_window;
        let head = self.head_commit.clone().ok_or(ScenarioError::MissingPr)?;

        tracing::info!(commit = %head.short(), "watching statuses for completion");
        loop {
            let statuses = self.forge.list_statuses(&head).await?;

            if statuses.iter().all(|s| s.completed) {
                return Ok(statuses);
            }

            if Instant::now() > deadline {
                self.record_failure(
                    "These check runs were not completed 20 minutes after Copr build had been built:",
                );
                for status in statuses.iter().filter(|s| !s.completed) {
                    self.record_failure(status.name.clone());
                }
                return Ok(Vec::new());
            }

            sleep(self.config.status_interval).await;
        }
    }

    // ─── Outcome evaluation ───────────────────────────────────────────────────

    /// After a failed build, the service must have commented on the PR;
    /// silence is its own finding.
    pub(crate) async fn check_comment(&mut self) -> Result<(), ScenarioError> {
        if !self.build_failed {
            return Ok(());
        }

        let pr = self.pr.as_ref().ok_or(ScenarioError::MissingPr)?;
        let bot = self.forge.bot_account();
        let commented = self
            .forge
            .list_comments(pr.number)
            .await?
            .iter()
            .any(|c| c.author == bot);

        if !commented {
            self.record_failure(format!(
                "No comment from {bot} about the unsuccessful Copr build found."
            ));
        }
        Ok(())
    }

    // ─── Trigger firing ───────────────────────────────────────────────────────

    /// Provokes the service according to the scenario's trigger.
    async fn trigger_build(&mut self) -> Result<(), ScenarioError> {
        tracing::info!(trigger = %self.trigger, "firing trigger");
        match self.trigger {
            Trigger::Comment => {
                let body = self
                    .comment
                    .clone()
                    .unwrap_or_else(|| self.profile.pr_comment.to_string());
                let pr = self.pr.as_ref().ok_or(ScenarioError::MissingPr)?;
                self.forge.post_comment(pr.number, &body).await?;
            }
            Trigger::Push => self.push_to_pr().await?,
            Trigger::PrOpened => self.create_pr().await?,
        }
        Ok(())
    }

    /// Pushes an empty commit to the PR's source branch and adopts it as the
    /// new head.
    async fn push_to_pr(&mut self) -> Result<(), ScenarioError> {
        let pr = self.pr.as_ref().ok_or(ScenarioError::MissingPr)?;
        let branch = pr.source_branch.clone();
        let message = format!(
            "Commit build trigger ({})",
            chrono::Utc::now().format("%d/%m/%y")
        );
        let head = self.forge.create_empty_commit(&branch, &message).await?;
        self.head_commit = Some(head);
        Ok(())
    }

    /// Creates the fresh PR for the PR-open scenario, replacing any leftovers
    /// from a previous run first.
    async fn create_pr(&mut self) -> Result<(), ScenarioError> {
        let source_branch = self.profile.opened_pr_branch();
        let title = self.profile.opened_pr_title();

        self.forge.delete_branch(&source_branch).await?;
        for stale in self
            .forge
            .list_prs()
            .await?
            .into_iter()
            .filter(|pr| pr.title == title)
        {
            tracing::info!(pr = %stale.number, "closing leftover PR from a previous run");
            self.forge.close_pr(stale.number).await?;
        }

        self.forge.create_branch_and_seed_file(&source_branch).await?;

        if let Some(fix) = &self.profile.opened_pr_yaml_fix {
            let content = self
                .forge
                .get_file_content(SERVICE_CONFIG_FILE, &source_branch)
                .await?;
            let content = content.replace(fix.from, fix.to);
            self.forge
                .update_file(SERVICE_CONFIG_FILE, &source_branch, &content, fix.git_msg)
                .await?;
        }

        let pr = self
            .forge
            .create_pr(
                &title,
                OPENED_PR_BODY,
                &source_branch,
                self.forge.default_branch(),
            )
            .await?;

        self.head_commit = Some(pr.head_commit.clone());
        self.created_branch = Some(source_branch);
        self.pr = Some(pr);
        Ok(())
    }

    // ─── Cleanup and bookkeeping ──────────────────────────────────────────────

    /// Best-effort teardown of the PR and branch this run created.
    async fn cleanup(&self) {
        if let Some(pr) = &self.pr {
            if let Err(e) = self.forge.close_pr(pr.number).await {
                tracing::warn!(pr = %pr.number, error = %e, "failed to close test PR");
            }
        }
        if let Some(branch) = &self.created_branch {
            if let Err(e) = self.forge.delete_branch(branch).await {
                tracing::warn!(branch = %branch, error = %e, "failed to delete test branch");
            }
        }
    }

    pub(crate) fn record_failure(&mut self, finding: impl Into<String>) {
        let finding = finding.into();
        tracing::warn!(finding = %finding, "recorded failure");
        self.failures.push(finding);
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub(crate) fn build_failed(&self) -> bool {
        self.build_failed
    }

    fn describe(&self) -> String {
        match &self.pr {
            Some(pr) => format!(
                "{} trigger on {} ({})",
                self.trigger,
                pr.title,
                self.forge.instance_label()
            ),
            None => format!(
                "{} trigger on a new PR ({})",
                self.trigger,
                self.forge.instance_label()
            ),
        }
    }
}

/// Judges a settled status set: one finding per unsuccessful status.
///
/// Pure on purpose - re-evaluating an unchanged set yields the same findings,
/// so the caller can't double-append by calling twice.
pub fn evaluate_statuses(statuses: &[StatusRecord]) -> Vec<String> {
    statuses
        .iter()
        .filter(|status| !status.successful)
        .map(|status| format!("Check run {} was set to failure.", status.name))
        .collect()
}

fn status_names(statuses: &[StatusRecord]) -> Vec<String> {
    statuses.iter().map(|s| s.name.clone()).collect()
}
