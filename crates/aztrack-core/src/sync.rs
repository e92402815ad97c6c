use crate::board::{plan_moves, CardMove};
use crate::error::Result;
use crate::gating::{decide, Decision, Gate};
use crate::ports::{DeploymentStatusProvider, Issue, IssueTracker, ProjectBoard};
use crate::tracking::TrackingParser;
use serde::Serialize;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BoardTarget {
    pub project_url: String,
    pub column: String,
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Where cards of tracked, not-yet-closed issues should sit.
    pub board: Option<BoardTarget>,
    /// Compute and log every action without writing anything.
    pub dry_run: bool,
    /// Restrict the run to a single issue number.
    pub only_issue: Option<u64>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IssueOutcome {
    PullRequest,
    NoTracking,
    NotReady {
        change_id: u64,
    },
    Updated {
        labels_added: Vec<String>,
        labels_only: bool,
        closed: bool,
        cards_moved: Vec<CardMove>,
    },
    Failed {
        error: String,
    },
}

impl IssueOutcome {
    pub fn summary(&self) -> String {
        match self {
            IssueOutcome::PullRequest => "skipped (pull request)".to_string(),
            IssueOutcome::NoTracking => "no tracking information".to_string(),
            IssueOutcome::NotReady { change_id } => format!("PR {change_id} not completed"),
            IssueOutcome::Updated {
                labels_added,
                labels_only,
                closed,
                cards_moved,
            } => {
                let mut parts = Vec::new();
                if !labels_added.is_empty() {
                    parts.push(format!("labeled {}", labels_added.join(", ")));
                }
                if *closed {
                    parts.push("closed".to_string());
                }
                for mv in cards_moved {
                    parts.push(format!("moved card to '{}'", mv.to.name));
                }
                if *labels_only {
                    parts.push("labels-only".to_string());
                }
                if parts.is_empty() {
                    "up to date".to_string()
                } else {
                    parts.join("; ")
                }
            }
            IssueOutcome::Failed { error } => format!("failed: {error}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueReport {
    pub number: u64,
    pub title: String,
    #[serde(flatten)]
    pub outcome: IssueOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub dry_run: bool,
    pub issues: Vec<IssueReport>,
}

impl SyncReport {
    pub fn failures(&self) -> impl Iterator<Item = &IssueReport> {
        self.issues
            .iter()
            .filter(|r| matches!(r.outcome, IssueOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

// ---------------------------------------------------------------------------
// Syncer
// ---------------------------------------------------------------------------

/// Applies tracking decisions to every open issue.
///
/// Each issue is processed independently: an error while handling one issue
/// is recorded in the report and the run moves on to the next.
pub struct Syncer<'a> {
    issues: &'a dyn IssueTracker,
    deployments: &'a dyn DeploymentStatusProvider,
    board: Option<&'a dyn ProjectBoard>,
    parser: TrackingParser,
    options: SyncOptions,
}

impl<'a> Syncer<'a> {
    pub fn new(
        issues: &'a dyn IssueTracker,
        deployments: &'a dyn DeploymentStatusProvider,
        parser: TrackingParser,
        options: SyncOptions,
    ) -> Self {
        Self {
            issues,
            deployments,
            board: None,
            parser,
            options,
        }
    }

    pub fn with_board(mut self, board: &'a dyn ProjectBoard) -> Self {
        self.board = Some(board);
        self
    }

    pub fn run(&self) -> Result<SyncReport> {
        let environments = self.deployments.environment_names()?;
        info!(environments = ?environments, "release environments");

        let issues = self.issues.open_issues()?;
        debug!(count = issues.len(), "open issues");

        let mut report = SyncReport {
            dry_run: self.options.dry_run,
            issues: Vec::new(),
        };
        for issue in issues {
            if self.options.only_issue.is_some_and(|n| n != issue.number) {
                continue;
            }
            debug!(issue = issue.number, title = %issue.title, "inspecting issue");

            let outcome = match self.process(&issue) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(issue = issue.number, error = %e, "failed to process issue");
                    IssueOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.issues.push(IssueReport {
                number: issue.number,
                title: issue.title,
                outcome,
            });
        }
        Ok(report)
    }

    fn process(&self, issue: &Issue) -> Result<IssueOutcome> {
        if issue.is_pull_request {
            debug!(issue = issue.number, "skipping pull request");
            return Ok(IssueOutcome::PullRequest);
        }

        let body = issue.body.as_deref().unwrap_or_default();
        let Some(directive) = self.parser.parse(body) else {
            debug!(issue = issue.number, "no tracking information");
            return Ok(IssueOutcome::NoTracking);
        };
        debug!(issue = issue.number, change_ids = ?directive.change_ids, labels_only = directive.labels_only, "tracking directive");

        let facts = self.deployments.resolve(&directive.change_ids)?;
        let decision = match decide(&directive, &facts)? {
            Gate::NotReady { change_id } => {
                debug!(issue = issue.number, change_id, "pull request not completed; skipping");
                return Ok(IssueOutcome::NotReady { change_id });
            }
            Gate::Ready(decision) => decision,
        };

        let labels_added = self.apply_labels(issue, &decision)?;

        let mut closed = false;
        let mut cards_moved = Vec::new();
        if decision.should_close {
            self.close(issue)?;
            closed = true;
        } else if decision.should_evaluate_board_placement {
            cards_moved = self.place_card(issue)?;
        }

        Ok(IssueOutcome::Updated {
            labels_added,
            labels_only: directive.labels_only,
            closed,
            cards_moved,
        })
    }

    fn apply_labels(&self, issue: &Issue, decision: &Decision) -> Result<Vec<String>> {
        let missing = decision.missing_labels(&issue.labels);
        if missing.is_empty() {
            debug!(issue = issue.number, "no new labels to add");
            return Ok(missing);
        }

        info!(issue = issue.number, labels = ?missing, dry_run = self.options.dry_run, "adding labels");
        if !self.options.dry_run {
            self.issues.add_labels(issue.number, &missing)?;
        }
        Ok(missing)
    }

    fn close(&self, issue: &Issue) -> Result<()> {
        info!(issue = issue.number, dry_run = self.options.dry_run, "deployed to all environments; closing issue");
        if !self.options.dry_run {
            self.issues.close_issue(issue.number)?;
        }
        Ok(())
    }

    fn place_card(&self, issue: &Issue) -> Result<Vec<CardMove>> {
        let (Some(board), Some(target)) = (self.board, &self.options.board) else {
            debug!(issue = issue.number, "no project board configured");
            return Ok(Vec::new());
        };

        let cards = board.cards_for_issue(issue.number)?;
        let moves = plan_moves(&cards, &target.project_url, &target.column)?;
        for mv in &moves {
            info!(
                issue = issue.number,
                from = %mv.from.name,
                to = %mv.to.name,
                dry_run = self.options.dry_run,
                "moving project card"
            );
            if !self.options.dry_run {
                board.move_card(&mv.card_id, &mv.to.id)?;
            }
        }
        Ok(moves)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
