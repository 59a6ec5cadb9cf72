//! Core domain types for the validation harness.

mod build;
mod ids;
mod pr;
mod trigger;

pub use build::{BuildRecord, BuildState};
pub use ids::{BuildId, PrNumber, ProjectId, Sha};
pub use pr::{Comment, PullRequest, StatusRecord};
pub use trigger::Trigger;
