use crate::error::{AztrackError, Result};
use crate::tracking::TrackingDirective;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEPLOY_LABEL_PREFIX: &str = "Deploy - ";

pub fn deploy_label(environment: &str) -> String {
    format!("{DEPLOY_LABEL_PREFIX}{environment}")
}

// ---------------------------------------------------------------------------
// DeploymentFact
// ---------------------------------------------------------------------------

/// Deployment state of one tracked pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentFact {
    pub change_id: u64,
    /// True only when the pull request status is `completed`.
    pub is_completed: bool,
    /// Environments the change has reached, in provider order.
    pub deployed_environments: Vec<String>,
    pub deployed_to_all_environments: bool,
}

// ---------------------------------------------------------------------------
// Decision / Gate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub labels_to_add: Vec<String>,
    pub should_close: bool,
    pub should_evaluate_board_placement: bool,
}

impl Decision {
    /// Labels from `labels_to_add` that the issue does not carry yet.
    pub fn missing_labels<S: AsRef<str>>(&self, existing: &[S]) -> Vec<String> {
        self.labels_to_add
            .iter()
            .filter(|label| !existing.iter().any(|e| e.as_ref() == label.as_str()))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum Gate {
    /// A tracked pull request is not completed; nothing should happen.
    NotReady { change_id: u64 },
    Ready(Decision),
}

// ---------------------------------------------------------------------------
// decide
// ---------------------------------------------------------------------------

/// Turn a directive and the deployment facts of its pull requests into a
/// labeling and lifecycle decision.
///
/// `facts` must cover exactly the distinct ids in `directive.change_ids`;
/// anything else is an upstream resolution failure and is returned as an
/// error rather than a decision.
pub fn decide(directive: &TrackingDirective, facts: &[DeploymentFact]) -> Result<Gate> {
    check_coverage(directive, facts)?;

    if let Some(unmerged) = facts.iter().find(|f| !f.is_completed) {
        return Ok(Gate::NotReady {
            change_id: unmerged.change_id,
        });
    }

    let labels_to_add: Vec<String> = common_environments(facts)
        .iter()
        .map(|env| deploy_label(env))
        .collect();

    if directive.labels_only {
        return Ok(Gate::Ready(Decision {
            labels_to_add,
            should_close: false,
            should_evaluate_board_placement: false,
        }));
    }

    let should_close = facts.iter().all(|f| f.deployed_to_all_environments);
    Ok(Gate::Ready(Decision {
        labels_to_add,
        should_close,
        should_evaluate_board_placement: !should_close,
    }))
}

fn check_coverage(directive: &TrackingDirective, facts: &[DeploymentFact]) -> Result<()> {
    if facts.is_empty() {
        return Err(AztrackError::NoDeploymentFacts);
    }

    let requested: BTreeSet<u64> = directive.change_ids.iter().copied().collect();
    let supplied: BTreeSet<u64> = facts.iter().map(|f| f.change_id).collect();
    if requested == supplied {
        return Ok(());
    }

    Err(AztrackError::FactsMismatch {
        missing: requested.difference(&supplied).copied().collect(),
        unexpected: supplied.difference(&requested).copied().collect(),
    })
}

/// Intersection of every fact's environments, seeded by the first fact so the
/// result keeps its order. Callers guarantee `facts` is non-empty.
fn common_environments(facts: &[DeploymentFact]) -> Vec<&str> {
    let Some((first, rest)) = facts.split_first() else {
        return Vec::new();
    };
    rest.iter().fold(
        first.deployed_environments.iter().map(String::as_str).collect(),
        |acc: Vec<&str>, fact| {
            acc.into_iter()
                .filter(|env| fact.deployed_environments.iter().any(|e| e == env))
                .collect()
        },
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(ids: &[u64], labels_only: bool) -> TrackingDirective {
        TrackingDirective {
            change_ids: ids.to_vec(),
            labels_only,
        }
    }

    fn fact(id: u64, completed: bool, envs: &[&str], all: bool) -> DeploymentFact {
        DeploymentFact {
            change_id: id,
            is_completed: completed,
            deployed_environments: envs.iter().map(|e| e.to_string()).collect(),
            deployed_to_all_environments: all,
        }
    }

    fn ready(gate: Gate) -> Decision {
        match gate {
            Gate::Ready(d) => d,
            other => panic!("expected ready gate, got {other:?}"),
        }
    }

    #[test]
    fn single_fact_reproduces_its_environments() {
        let gate = decide(
            &directive(&[1], false),
            &[fact(1, true, &["Ring0", "Ring1", "Ring2"], false)],
        )
        .unwrap();
        let d = ready(gate);
        assert_eq!(
            d.labels_to_add,
            vec!["Deploy - Ring0", "Deploy - Ring1", "Deploy - Ring2"]
        );
    }

    #[test]
    fn labels_are_the_intersection() {
        let d = ready(
            decide(
                &directive(&[1, 2], false),
                &[fact(1, true, &["A", "B"], false), fact(2, true, &["B", "C"], false)],
            )
            .unwrap(),
        );
        assert_eq!(d.labels_to_add, vec!["Deploy - B"]);
    }

    #[test]
    fn two_pull_requests_partially_deployed() {
        let d = ready(
            decide(
                &directive(&[1, 2], false),
                &[
                    fact(1, true, &["Ring0", "Ring1"], false),
                    fact(2, true, &["Ring0"], true),
                ],
            )
            .unwrap(),
        );
        assert_eq!(
            d,
            Decision {
                labels_to_add: vec!["Deploy - Ring0".to_string()],
                should_close: false,
                should_evaluate_board_placement: true,
            }
        );
    }

    #[test]
    fn any_incomplete_pull_request_blocks_everything() {
        let gate = decide(
            &directive(&[1, 2], false),
            &[fact(1, true, &["Ring0"], true), fact(2, false, &["Ring0"], true)],
        )
        .unwrap();
        assert_eq!(gate, Gate::NotReady { change_id: 2 });
    }

    #[test]
    fn fully_deployed_closes() {
        let d = ready(
            decide(
                &directive(&[1, 2], false),
                &[fact(1, true, &["Ring0"], true), fact(2, true, &["Ring0"], true)],
            )
            .unwrap(),
        );
        assert!(d.should_close);
        assert!(!d.should_evaluate_board_placement);
    }

    #[test]
    fn labels_only_never_closes_or_moves() {
        let d = ready(
            decide(
                &directive(&[1], true),
                &[fact(1, true, &["Ring0", "Ring1"], true)],
            )
            .unwrap(),
        );
        assert_eq!(d.labels_to_add.len(), 2);
        assert!(!d.should_close);
        assert!(!d.should_evaluate_board_placement);
    }

    #[test]
    fn no_common_environment_gives_no_labels() {
        let d = ready(
            decide(
                &directive(&[1, 2], false),
                &[fact(1, true, &["A"], false), fact(2, true, &["B"], false)],
            )
            .unwrap(),
        );
        assert!(d.labels_to_add.is_empty());
        assert!(d.should_evaluate_board_placement);
    }

    #[test]
    fn duplicate_ids_are_covered_by_one_fact() {
        let gate = decide(&directive(&[5, 5], false), &[fact(5, true, &["A"], true)]).unwrap();
        assert!(ready(gate).should_close);
    }

    #[test]
    fn empty_facts_are_an_error() {
        let err = decide(&directive(&[1], false), &[]).unwrap_err();
        assert!(matches!(err, AztrackError::NoDeploymentFacts));
    }

    #[test]
    fn mismatched_facts_are_an_error() {
        let err = decide(
            &directive(&[1, 2], false),
            &[fact(1, true, &["A"], true), fact(3, true, &["A"], true)],
        )
        .unwrap_err();
        match err {
            AztrackError::FactsMismatch {
                missing,
                unexpected,
            } => {
                assert_eq!(missing, vec![2]);
                assert_eq!(unexpected, vec![3]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decision_is_independent_of_existing_labels() {
        let facts = [fact(1, true, &["Ring0", "Ring1"], false)];
        let first = ready(decide(&directive(&[1], false), &facts).unwrap());
        let second = ready(decide(&directive(&[1], false), &facts).unwrap());
        assert_eq!(first, second);

        let existing = vec!["Deploy - Ring0".to_string(), "bug".to_string()];
        assert_eq!(first.missing_labels(&existing), vec!["Deploy - Ring1"]);
    }
}
