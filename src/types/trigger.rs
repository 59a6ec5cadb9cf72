//! The event mechanism used to provoke the service under test.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a test case provokes the service into acting.
///
/// The trigger determines both how the build is requested and what cleanup
/// happens after evaluation: only `PrOpened` scenarios create (and therefore
/// tear down) a PR and branch of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Post a trigger comment (e.g. `/packit build`) on an existing PR.
    Comment,

    /// Push an empty commit to an existing PR's source branch.
    Push,

    /// Open a fresh PR from a generated branch.
    PrOpened,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trigger::Comment => "comment",
            Trigger::Push => "push",
            Trigger::PrOpened => "pr_opened",
        };
        write!(f, "{}", s)
    }
}
