//! End-to-end validation of a Packit-as-a-Service deployment.
//!
//! The harness acts as an ordinary user of the service: it fires real
//! triggers (PR comments, pushes, freshly opened PRs) on dedicated test
//! repositories across GitHub and several GitLab instances, then watches the
//! service's externally observable reactions - check runs appearing, Copr
//! builds being submitted and finishing, statuses completing, the bot
//! commenting on failures. Each deviation becomes a line in a failure
//! narrative that is reported once per scenario.
//!
//! Layout:
//! - [`types`]: forge-neutral domain types (IDs, PRs, statuses, builds)
//! - [`deployment`]: production/staging profiles and their constants
//! - [`forge`]: the [`Forge`](forge::Forge) trait and its GitHub/GitLab adapters
//! - [`copr`]: read-only Copr build-farm client
//! - [`watch`]: interval/window configuration for the polling loops
//! - [`testcase`]: the per-scenario polling state machine
//! - [`dispatch`]: scenario discovery and concurrent fan-out per instance
//! - [`report`]: failure delivery (webhook with log fallback)

pub mod copr;
pub mod deployment;
pub mod dispatch;
pub mod forge;
pub mod report;
pub mod testcase;
pub mod types;
pub mod watch;

#[cfg(test)]
pub mod test_utils;
