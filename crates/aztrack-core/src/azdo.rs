//! Azure DevOps deployment status: pull request completion plus the release
//! environments each completed pull request has reached.

use crate::config::AzureDevOpsConfig;
use crate::error::{AztrackError, Result};
use crate::gating::DeploymentFact;
use crate::http;
use crate::ports::DeploymentStatusProvider;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;

const API_VERSION: &str = "7.1";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PullRequestStatus {
    NotSet,
    Active,
    Abandoned,
    Completed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub pull_request_id: u64,
    pub status: PullRequestStatus,
    #[serde(default)]
    pub closed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEnvironment {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub rank: i32,
}

#[derive(Deserialize)]
struct ReleaseDefinition {
    #[serde(default)]
    environments: Vec<ReleaseEnvironment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Deployment {
    id: u64,
    queued_on: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

// ---------------------------------------------------------------------------
// AzureDevOpsClient
// ---------------------------------------------------------------------------

pub struct AzureDevOpsClient {
    http: Client,
    token: String,
    org_url: String,
    release_url: String,
    project: String,
    release_definition_id: u32,
    environments_to_ignore: Vec<String>,
}

impl AzureDevOpsClient {
    pub fn from_config(cfg: &AzureDevOpsConfig, token: &str) -> Result<Self> {
        let release_url = cfg.release_base_url().ok_or_else(|| {
            AztrackError::InvalidConfig(format!(
                "cannot derive a release url from '{}'; set azure_devops.release_url",
                cfg.org_url
            ))
        })?;

        Ok(Self {
            http: http::client(HeaderMap::new())?,
            token: token.to_string(),
            org_url: cfg.org_url.trim_end_matches('/').to_string(),
            release_url,
            project: cfg.project.clone(),
            release_definition_id: cfg.release_definition_id,
            environments_to_ignore: cfg.environments_to_ignore.clone(),
        })
    }

    fn get<T: serde::de::DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .basic_auth("", Some(&self.token))
            .query(&[("api-version", API_VERSION)])
            .query(query)
            .send()?;
        Ok(http::check(resp)?.json()?)
    }

    /// Release environments that count towards "deployed everywhere", in
    /// pipeline rank order.
    pub fn environments(&self) -> Result<Vec<ReleaseEnvironment>> {
        let url = format!(
            "{}/{}/_apis/release/definitions/{}",
            self.release_url, self.project, self.release_definition_id
        );
        let definition: ReleaseDefinition = self.get(&url, &[])?;

        let mut envs: Vec<ReleaseEnvironment> = definition
            .environments
            .into_iter()
            .filter(|env| {
                !self
                    .environments_to_ignore
                    .iter()
                    .any(|ignored| ignored.eq_ignore_ascii_case(&env.name))
            })
            .collect();
        envs.sort_by_key(|env| env.rank);
        Ok(envs)
    }

    pub fn pull_request(&self, id: u64) -> Result<PullRequest> {
        let url = format!(
            "{}/{}/_apis/git/pullrequests/{id}",
            self.org_url, self.project
        );
        match self.get(&url, &[]) {
            Err(AztrackError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(AztrackError::PullRequestNotFound(id))
            }
            other => other,
        }
    }

    fn latest_deployment(&self, env: &ReleaseEnvironment) -> Result<Option<Deployment>> {
        let url = format!("{}/{}/_apis/release/deployments", self.release_url, self.project);
        let list: ListResponse<Deployment> = self.get(
            &url,
            &[
                ("definitionId", self.release_definition_id.to_string()),
                ("definitionEnvironmentId", env.id.to_string()),
                ("deploymentStatus", "succeeded".to_string()),
                ("queryOrder", "descending".to_string()),
                ("$top", "1".to_string()),
            ],
        )?;
        Ok(list.value.into_iter().next())
    }
}

impl DeploymentStatusProvider for AzureDevOpsClient {
    fn environment_names(&self) -> Result<Vec<String>> {
        Ok(self.environments()?.into_iter().map(|env| env.name).collect())
    }

    fn resolve(&self, change_ids: &[u64]) -> Result<Vec<DeploymentFact>> {
        let envs = self.environments()?;
        let mut latest = Vec::with_capacity(envs.len());
        for env in &envs {
            let deployment = self.latest_deployment(env)?;
            tracing::debug!(
                environment = %env.name,
                deployment = ?deployment.as_ref().map(|d| d.id),
                "latest succeeded deployment"
            );
            latest.push((env.name.as_str(), deployment));
        }

        let mut pull_requests: HashMap<u64, PullRequest> = HashMap::new();
        let mut facts = Vec::with_capacity(change_ids.len());
        for &id in change_ids {
            if !pull_requests.contains_key(&id) {
                let pr = self.pull_request(id)?;
                pull_requests.insert(id, pr);
            }
            let pr = &pull_requests[&id];
            facts.push(fact_for(pr, &latest));
        }
        Ok(facts)
    }
}

/// An environment is reached once a succeeded deployment was queued at or
/// after the pull request completed.
fn fact_for(pr: &PullRequest, latest: &[(&str, Option<Deployment>)]) -> DeploymentFact {
    let is_completed = pr.status == PullRequestStatus::Completed;
    let deployed_environments: Vec<String> = match (is_completed, pr.closed_date) {
        (true, Some(closed)) => latest
            .iter()
            .filter(|(_, d)| d.as_ref().is_some_and(|d| d.queued_on >= closed))
            .map(|(name, _)| name.to_string())
            .collect(),
        _ => Vec::new(),
    };
    let deployed_to_all_environments = is_completed && deployed_environments.len() == latest.len();

    DeploymentFact {
        change_id: pr.pull_request_id,
        is_completed,
        deployed_environments,
        deployed_to_all_environments,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
