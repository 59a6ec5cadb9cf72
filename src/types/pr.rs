//! Forge-neutral pull request and comment snapshots.
//!
//! Both adapters translate their native API objects into these structs at the
//! boundary, so the watchers never see forge-specific shapes.

use serde::{Deserialize, Serialize};

use super::{PrNumber, Sha};

/// A pull/merge request as observed on a forge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: PrNumber,
    pub title: String,
    /// Web URL, used only in reports and logs.
    pub url: String,
    pub head_commit: Sha,
    pub source_branch: String,
}

/// A comment on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Login/username of the author, compared against the deployment
    /// profile's bot account name.
    pub author: String,
    pub body: String,
}

/// A commit status or check run as observed on a forge, reduced to the three
/// capabilities the watchers need. Built (and bot-filtered) by the adapters;
/// never mutated by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// User-visible name (check-run name on GitHub, context on GitLab).
    pub name: String,
    /// Whether the status has reached a completed state (success or failure).
    pub completed: bool,
    /// Whether the status completed successfully.
    pub successful: bool,
}
