use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use aztrack_core::azdo::AzureDevOpsClient;
use aztrack_core::github::GitHubClient;
use aztrack_core::sync::{BoardTarget, SyncOptions, Syncer};
use clap::Args;
use std::path::Path;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct SyncArgs {
    /// Show what would change without labeling, closing, or moving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Only process this issue number
    #[arg(long)]
    pub issue: Option<u64>,

    /// Token used to read, label, and close issues (falls back to GITHUB_TOKEN)
    #[arg(long, env = "AZTRACK_ISSUES_TOKEN", hide_env_values = true)]
    pub issues_token: Option<String>,

    /// Token used to read and move project cards (defaults to the issues token)
    #[arg(long, env = "AZTRACK_PROJECT_TOKEN", hide_env_values = true)]
    pub project_token: Option<String>,

    /// Azure DevOps personal access token
    #[arg(long, env = "AZURE_DEVOPS_TOKEN", hide_env_values = true)]
    pub azure_devops_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config_path: &Path, args: SyncArgs, json: bool) -> anyhow::Result<()> {
    let config = super::load_valid_config(config_path)?;

    let issues_token = args
        .issues_token
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .filter(|t| !t.is_empty())
        .context("missing GitHub token: set AZTRACK_ISSUES_TOKEN or GITHUB_TOKEN")?;
    let project_token = args
        .project_token
        .unwrap_or_else(|| issues_token.clone());
    let azure_token = super::azure_devops_token(args.azure_devops_token)?;

    let deployments = AzureDevOpsClient::from_config(&config.azure_devops, &azure_token)
        .context("failed to create Azure DevOps client")?;
    let issues = GitHubClient::from_config(&config.github, &issues_token)
        .context("failed to create GitHub client")?;
    let board = GitHubClient::from_config(&config.github, &project_token)
        .context("failed to create GitHub project client")?;

    let options = SyncOptions {
        board: config.board.as_ref().map(|b| BoardTarget {
            project_url: b.project_url.clone(),
            column: b.column_for_completed_prs.clone(),
        }),
        dry_run: args.dry_run,
        only_issue: args.issue,
    };

    let mut syncer = Syncer::new(&issues, &deployments, config.tracking_parser(), options);
    if config.board.is_some() {
        syncer = syncer.with_board(&board);
    }
    let report = syncer.run().context("sync failed")?;

    if json {
        print_json(&report)?;
    } else if report.issues.is_empty() {
        println!("No open issues.");
    } else {
        if report.dry_run {
            println!("Dry run: nothing was changed.\n");
        }
        let rows: Vec<Vec<String>> = report
            .issues
            .iter()
            .map(|r| {
                vec![
                    format!("#{}", r.number),
                    truncate(&r.title, 50),
                    r.outcome.summary(),
                ]
            })
            .collect();
        print_table(&["ISSUE", "TITLE", "OUTCOME"], &rows);
    }

    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!("{failed} issue(s) failed to sync");
    }
    Ok(())
}
