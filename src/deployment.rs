//! Deployment profiles: the per-environment constants that distinguish the
//! production service from staging.
//!
//! The profile is resolved exactly once at process start from the
//! `DEPLOYMENT` environment variable and threaded into every test case; no
//! code looks it up ad hoc mid-scenario.

use std::fmt;

/// Which deployment of the service is under test.
///
/// Everywhere else in the service's deployment tooling the environments are
/// called `prod` and `stg`; the long names here are deliberate so a typo in
/// `DEPLOYMENT` can't silently select the wrong one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    Production,
    Staging,
}

impl Deployment {
    /// Reads the `DEPLOYMENT` environment variable.
    ///
    /// Anything other than `staging` (including absence) selects production,
    /// matching the behaviour the on-call crew expects from the cron job.
    pub fn from_env() -> Self {
        match std::env::var("DEPLOYMENT").as_deref() {
            Ok("staging") => Deployment::Staging,
            _ => Deployment::Production,
        }
    }

    pub fn profile(self) -> DeploymentProfile {
        match self {
            Deployment::Production => DeploymentProfile::production(),
            Deployment::Staging => DeploymentProfile::staging(),
        }
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Deployment::Production => "production",
            Deployment::Staging => "staging",
        };
        write!(f, "{}", s)
    }
}

/// A content rewrite applied to the service config file when opening a fresh
/// PR, so the staging instance picks the job up instead of production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YamlFix {
    pub from: &'static str,
    pub to: &'static str,
    pub git_msg: &'static str,
}

/// The static constants for one deployment: bot account names per forge,
/// comment trigger strings, title prefixes for scenario discovery, and the
/// Copr account the service builds under. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentProfile {
    /// Short name used in generated branch names and PR titles.
    pub name: &'static str,

    /// GitHub App name; check runs are filtered to this app.
    pub app_name: &'static str,

    /// The comment that triggers a Copr build.
    pub pr_comment: &'static str,

    /// The comment that triggers a VM image build.
    pub pr_comment_vm_image_build: &'static str,

    /// Config-file rewrite applied on the fresh branch of a PR-open
    /// scenario, if this deployment needs one.
    pub opened_pr_yaml_fix: Option<YamlFix>,

    /// Copr account the service submits builds under.
    pub copr_user: &'static str,

    /// Title prefix of PRs exercised by the comment trigger.
    pub comment_tests_prefix: &'static str,

    /// Title prefix of PRs exercised by the VM-image-build comment trigger.
    pub vm_image_build_tests_prefix: &'static str,

    /// Title prefix of the PR exercised by the push trigger.
    pub push_trigger_tests_prefix: &'static str,

    /// Bot account login on GitHub (the `[bot]` suffix is part of the login).
    pub github_bot_name: &'static str,

    /// Bot account username on GitLab instances.
    pub gitlab_account_name: &'static str,
}

impl DeploymentProfile {
    pub fn production() -> Self {
        DeploymentProfile {
            name: "prod",
            app_name: "Packit-as-a-Service",
            pr_comment: "/packit build",
            pr_comment_vm_image_build: "/packit vm-image-build",
            opened_pr_yaml_fix: None,
            copr_user: "packit",
            comment_tests_prefix: "Basic test case:",
            vm_image_build_tests_prefix: "Test VM Image builds",
            push_trigger_tests_prefix: "Basic test case - push trigger",
            github_bot_name: "packit-as-a-service[bot]",
            gitlab_account_name: "packit-as-a-service",
        }
    }

    pub fn staging() -> Self {
        DeploymentProfile {
            name: "stg",
            app_name: "Packit-as-a-Service-stg",
            pr_comment: "/packit-stg build",
            pr_comment_vm_image_build: "/packit-stg vm-image-build",
            opened_pr_yaml_fix: Some(YamlFix {
                from: "---",
                to: "---\npackit_instances: [\"stg\"]",
                git_msg: "Build using Packit-stg",
            }),
            copr_user: "packit-stg",
            comment_tests_prefix: "Basic test case:",
            vm_image_build_tests_prefix: "Test VM Image builds",
            push_trigger_tests_prefix: "Basic test case (stg) - push trigger",
            github_bot_name: "packit-as-a-service-stg[bot]",
            gitlab_account_name: "packit-as-a-service-stg",
        }
    }

    /// Source branch name for the PR-open scenario. Deterministic per
    /// deployment so consecutive runs replace rather than collide.
    pub fn opened_pr_branch(&self) -> String {
        format!("test/{}/opened_pr", self.name)
    }

    /// Title of the PR created by the PR-open scenario.
    pub fn opened_pr_title(&self) -> String {
        format!("Basic test case ({}): opened PR trigger", self.name)
    }
}
