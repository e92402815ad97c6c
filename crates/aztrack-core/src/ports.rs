//! Traits for the remote systems the sync loop talks to.
//!
//! The HTTP clients in [`crate::github`] and [`crate::azdo`] implement these;
//! tests substitute in-memory fakes.

use crate::board::ProjectCard;
use crate::error::Result;
use crate::gating::DeploymentFact;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// The issues listing also returns pull requests.
    #[serde(default)]
    pub is_pull_request: bool,
}

pub trait IssueTracker {
    fn open_issues(&self) -> Result<Vec<Issue>>;
    fn add_labels(&self, number: u64, labels: &[String]) -> Result<()>;
    fn close_issue(&self, number: u64) -> Result<()>;
}

pub trait DeploymentStatusProvider {
    /// Names of the environments a change must reach to count as fully
    /// deployed.
    fn environment_names(&self) -> Result<Vec<String>>;

    /// One fact per requested id, in request order. Fails as a whole if any
    /// id cannot be resolved.
    fn resolve(&self, change_ids: &[u64]) -> Result<Vec<DeploymentFact>>;
}

pub trait ProjectBoard {
    fn cards_for_issue(&self, number: u64) -> Result<Vec<ProjectCard>>;
    fn move_card(&self, card_id: &str, column_id: &str) -> Result<()>;
}
