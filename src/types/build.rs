//! Copr build observations.
//!
//! The watcher never mutates builds; it only reads their identifier and state.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::BuildId;

/// The state vocabulary Copr reports for a build.
///
/// The non-terminal states are the fixed set the watcher keeps polling
/// through; anything else concludes the build-completion watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    Running,
    Pending,
    Starting,
    Forked,
    Importing,
    Waiting,
    Succeeded,
    Failed,
    Canceled,
    Skipped,
    /// Any state this crate doesn't know about. Treated as terminal and
    /// unsuccessful, so vocabulary drift on the Copr side surfaces as a
    /// finding instead of an endless poll.
    #[serde(other)]
    Unknown,
}

impl BuildState {
    /// Returns true once the build has left the in-progress vocabulary.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            BuildState::Running
                | BuildState::Pending
                | BuildState::Starting
                | BuildState::Forked
                | BuildState::Importing
                | BuildState::Waiting
        )
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildState::Running => "running",
            BuildState::Pending => "pending",
            BuildState::Starting => "starting",
            BuildState::Forked => "forked",
            BuildState::Importing => "importing",
            BuildState::Waiting => "waiting",
            BuildState::Succeeded => "succeeded",
            BuildState::Failed => "failed",
            BuildState::Canceled => "canceled",
            BuildState::Skipped => "skipped",
            BuildState::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// A single build as observed on the build farm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub id: BuildId,
    pub state: BuildState,
}
