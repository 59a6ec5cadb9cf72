//! Scenario discovery and fan-out for one forge instance.
//!
//! Scenarios are planned from the open PRs' titles: dedicated long-lived PRs
//! carry well-known prefixes from the deployment profile, and one PR-open
//! scenario always runs against a fresh PR. The plan is computed as a pure
//! function so it can be tested without a forge.

use std::sync::Arc;
use tokio::task::JoinSet;

use crate::copr::BuildFarm;
use crate::deployment::DeploymentProfile;
use crate::forge::{Forge, ForgeError};
use crate::report::AlertSink;
use crate::testcase::TestCase;
use crate::types::{PullRequest, Trigger};
use crate::watch::WatchConfig;

/// One planned scenario: a trigger, the PR it runs against (none for the
/// PR-open trigger), and an optional trigger-comment override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub trigger: Trigger,
    pub pr: Option<PullRequest>,
    pub comment: Option<String>,
}

/// Maps the open PRs to the scenarios to run.
///
/// Every PR matching the comment prefix gets a comment scenario, and every
/// PR matching the VM-image prefix gets a comment scenario with the VM-image
/// trigger comment. The push scenario runs on the first PR matching the push
/// prefix only, since a push moves the PR's head and two concurrent push
/// scenarios on one PR would race. The PR-open scenario needs no existing PR.
pub fn plan_scenarios(prs: &[PullRequest], profile: &DeploymentProfile) -> Vec<Scenario> {
    let mut scenarios = Vec::new();

    for pr in prs {
        if pr.title.starts_with(profile.vm_image_build_tests_prefix) {
            scenarios.push(Scenario {
                trigger: Trigger::Comment,
                pr: Some(pr.clone()),
                comment: Some(profile.pr_comment_vm_image_build.to_string()),
            });
        } else if pr.title.starts_with(profile.comment_tests_prefix) {
            scenarios.push(Scenario {
                trigger: Trigger::Comment,
                pr: Some(pr.clone()),
                comment: None,
            });
        }
    }

    if let Some(pr) = prs
        .iter()
        .find(|pr| pr.title.starts_with(profile.push_trigger_tests_prefix))
    {
        scenarios.push(Scenario {
            trigger: Trigger::Push,
            pr: Some(pr.clone()),
            comment: None,
        });
    }

    scenarios.push(Scenario {
        trigger: Trigger::PrOpened,
        pr: None,
        comment: None,
    });

    scenarios
}

/// Runs every planned scenario for one forge instance concurrently and waits
/// for all of them.
///
/// Scenario outcomes never propagate between scenarios; even a panicking
/// scenario task is logged here and the rest keep running.
pub async fn run_validation<F, B>(
    forge: Arc<F>,
    farm: Arc<B>,
    profile: Arc<DeploymentProfile>,
    config: WatchConfig,
    sink: Arc<AlertSink>,
) -> Result<(), ForgeError>
where
    F: Forge + 'static,
    B: BuildFarm + 'static,
{
    let instance = forge.instance_label().to_string();
    let prs = forge.list_prs().await?;
    let scenarios = plan_scenarios(&prs, &profile);

    let covered: Vec<_> = scenarios.iter().map(|s| s.trigger).collect();
    if !covered.contains(&Trigger::Push) {
        tracing::info!(
            instance = %instance,
            prefix = %profile.push_trigger_tests_prefix,
            "no PR with the push-trigger prefix, skipping the push scenario"
        );
    }
    if !covered.contains(&Trigger::Comment) {
        tracing::info!(
            instance = %instance,
            prefix = %profile.comment_tests_prefix,
            "no PR with the comment-trigger prefix, skipping the comment scenarios"
        );
    }
    tracing::info!(
        instance = %instance,
        scenarios = scenarios.len(),
        "running validation scenarios"
    );

    let mut set = JoinSet::new();
    for scenario in scenarios {
        let case = TestCase::new(
            forge.clone(),
            farm.clone(),
            profile.clone(),
            config,
            scenario.trigger,
            scenario.pr,
            scenario.comment,
        );
        let sink = sink.clone();
        set.spawn(async move { case.run(&sink).await });
    }

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            tracing::error!(instance = %instance, error = %e, "validation scenario task panicked");
        }
    }

    Ok(())
}
