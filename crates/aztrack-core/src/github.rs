//! GitHub REST + GraphQL client for issues and classic project boards.

use crate::board::{Column, ProjectCard};
use crate::config::GitHubConfig;
use crate::error::{AztrackError, Result};
use crate::http;
use crate::ports::{Issue, IssueTracker, ProjectBoard};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

const PER_PAGE: usize = 100;

const PROJECT_CARDS_QUERY: &str = r#"
query projectCards($owner: String!, $repo: String!, $issueNumber: Int!) {
  repository(owner: $owner, name: $repo) {
    issue(number: $issueNumber) {
      projectCards(first: 100) {
        nodes {
          id
          column { id name }
          project {
            url
            columns(first: 100) { nodes { id name } }
          }
        }
      }
    }
  }
}
"#;

const MOVE_CARD_MUTATION: &str = r#"
mutation($moveInput: MoveProjectCardInput!) {
  moveProjectCard(input: $moveInput) {
    clientMutationId
  }
}
"#;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    labels: Vec<RawLabel>,
    #[serde(default)]
    pull_request: Option<Value>,
}

#[derive(Deserialize)]
struct RawLabel {
    name: String,
}

impl From<RawIssue> for Issue {
    fn from(raw: RawIssue) -> Self {
        Issue {
            number: raw.number,
            title: raw.title,
            body: raw.body,
            labels: raw.labels.into_iter().map(|l| l.name).collect(),
            is_pull_request: raw.pull_request.is_some(),
        }
    }
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct Nodes<T> {
    nodes: Vec<T>,
}

#[derive(Deserialize)]
struct CardsData {
    repository: Option<RepositoryNode>,
}

#[derive(Deserialize)]
struct RepositoryNode {
    issue: Option<IssueNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueNode {
    project_cards: Nodes<CardNode>,
}

#[derive(Deserialize)]
struct CardNode {
    id: String,
    column: Option<Column>,
    project: ProjectNode,
}

#[derive(Deserialize)]
struct ProjectNode {
    url: String,
    columns: Nodes<Column>,
}

// ---------------------------------------------------------------------------
// GitHubClient
// ---------------------------------------------------------------------------

pub struct GitHubClient {
    http: Client,
    api_url: String,
    owner: String,
    repo: String,
}

impl GitHubClient {
    pub fn new(
        api_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: &str,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| AztrackError::InvalidConfig("github token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            http: http::client(headers)?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
        })
    }

    pub fn from_config(cfg: &GitHubConfig, token: &str) -> Result<Self> {
        Self::new(&cfg.api_url, &cfg.owner, &cfg.repo, token)
    }

    fn issue_url(&self, number: u64) -> String {
        format!(
            "{}/repos/{}/{}/issues/{number}",
            self.api_url, self.owner, self.repo
        )
    }

    fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let resp = self
            .http
            .post(format!("{}/graphql", self.api_url))
            .json(&json!({ "query": query, "variables": variables }))
            .send()?;
        let parsed: GraphQlResponse<T> = http::check(resp)?.json()?;

        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(AztrackError::GraphQl(messages.join("; ")));
        }
        parsed
            .data
            .ok_or_else(|| AztrackError::GraphQl("response has no data".to_string()))
    }
}

impl IssueTracker for GitHubClient {
    fn open_issues(&self) -> Result<Vec<Issue>> {
        let url = format!("{}/repos/{}/{}/issues", self.api_url, self.owner, self.repo);
        let mut issues = Vec::new();
        let mut page = 1u32;

        loop {
            let resp = self
                .http
                .get(&url)
                .query(&[
                    ("state", "open".to_string()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()?;
            let batch: Vec<RawIssue> = http::check(resp)?.json()?;
            let len = batch.len();
            tracing::debug!(page, count = len, "fetched open issues");
            issues.extend(batch.into_iter().map(Issue::from));

            if len < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(issues)
    }

    fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/labels", self.issue_url(number)))
            .json(&json!({ "labels": labels }))
            .send()?;
        http::check(resp)?;
        Ok(())
    }

    fn close_issue(&self, number: u64) -> Result<()> {
        let resp = self
            .http
            .patch(self.issue_url(number))
            .json(&json!({ "state": "closed" }))
            .send()?;
        http::check(resp)?;
        Ok(())
    }
}

impl ProjectBoard for GitHubClient {
    fn cards_for_issue(&self, number: u64) -> Result<Vec<ProjectCard>> {
        let data: CardsData = self.graphql(
            PROJECT_CARDS_QUERY,
            json!({ "owner": self.owner, "repo": self.repo, "issueNumber": number }),
        )?;

        let Some(issue) = data.repository.and_then(|r| r.issue) else {
            return Ok(Vec::new());
        };

        let cards = issue
            .project_cards
            .nodes
            .into_iter()
            .filter_map(|node| {
                let Some(column) = node.column else {
                    tracing::debug!(card = %node.id, "card has no column; skipping");
                    return None;
                };
                Some(ProjectCard {
                    id: node.id,
                    column,
                    project_url: node.project.url,
                    project_columns: node.project.columns.nodes,
                })
            })
            .collect();
        Ok(cards)
    }

    fn move_card(&self, card_id: &str, column_id: &str) -> Result<()> {
        let _: Value = self.graphql(
            MOVE_CARD_MUTATION,
            json!({ "moveInput": { "cardId": card_id, "columnId": column_id } }),
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client(server: &Server) -> GitHubClient {
        GitHubClient::new(server.url(), "acme", "widgets", "t0ken").unwrap()
    }

    #[test]
    fn lists_open_issues_and_flags_pull_requests() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/repos/acme/widgets/issues")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("state".into(), "open".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .match_header("authorization", "Bearer t0ken")
            .with_header("content-type", "application/json")
            .with_body(
                r#"[
                  {"number": 7, "title": "Bug", "body": "text", "labels": [{"name": "Deploy - Ring0"}]},
                  {"number": 8, "title": "PR", "body": null, "labels": [], "pull_request": {"url": "x"}}
                ]"#,
            )
            .create();

        let issues = client(&server).open_issues().unwrap();
        mock.assert();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].labels, vec!["Deploy - Ring0"]);
        assert!(!issues[0].is_pull_request);
        assert!(issues[1].is_pull_request);
        assert_eq!(issues[1].body, None);
    }

    #[test]
    fn adds_labels() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/repos/acme/widgets/issues/7/labels")
            .match_body(Matcher::Json(json!({ "labels": ["Deploy - Ring0"] })))
            .with_status(200)
            .with_body("[]")
            .create();

        client(&server)
            .add_labels(7, &["Deploy - Ring0".to_string()])
            .unwrap();
        mock.assert();
    }

    #[test]
    fn closes_issue() {
        let mut server = Server::new();
        let mock = server
            .mock("PATCH", "/repos/acme/widgets/issues/7")
            .match_body(Matcher::Json(json!({ "state": "closed" })))
            .with_status(200)
            .with_body("{}")
            .create();

        client(&server).close_issue(7).unwrap();
        mock.assert();
    }

    #[test]
    fn api_errors_carry_status() {
        let mut server = Server::new();
        server
            .mock("PATCH", "/repos/acme/widgets/issues/7")
            .with_status(403)
            .with_body("forbidden")
            .create();

        let err = client(&server).close_issue(7).unwrap_err();
        assert!(matches!(err, AztrackError::Api { status: 403, ref body, .. } if body == "forbidden"));
    }

    #[test]
    fn reads_project_cards() {
        let mut server = Server::new();
        server
            .mock("POST", "/graphql")
            .match_body(Matcher::PartialJson(json!({ "variables": { "issueNumber": 7 } })))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data": {"repository": {"issue": {"projectCards": {"nodes": [
                  {"id": "card-1",
                   "column": {"id": "c1", "name": "To do"},
                   "project": {"url": "https://github.com/orgs/acme/projects/1",
                               "columns": {"nodes": [{"id": "c1", "name": "To do"}, {"id": "c2", "name": "Merged"}]}}},
                  {"id": "card-2",
                   "column": null,
                   "project": {"url": "https://github.com/orgs/acme/projects/2",
                               "columns": {"nodes": []}}}
                ]}}}}}"#,
            )
            .create();

        let cards = client(&server).cards_for_issue(7).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, "card-1");
        assert_eq!(cards[0].project_columns.len(), 2);
    }

    #[test]
    fn graphql_errors_are_surfaced() {
        let mut server = Server::new();
        server
            .mock("POST", "/graphql")
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": null, "errors": [{"message": "Could not resolve to a node"}]}"#)
            .create();

        let err = client(&server).move_card("card-1", "c2").unwrap_err();
        assert!(matches!(err, AztrackError::GraphQl(ref m) if m.contains("Could not resolve")));
    }

    #[test]
    fn moves_card() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/graphql")
            .match_body(Matcher::PartialJson(json!({
                "variables": { "moveInput": { "cardId": "card-1", "columnId": "c2" } }
            })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": {"moveProjectCard": {"clientMutationId": null}}}"#)
            .create();

        client(&server).move_card("card-1", "c2").unwrap();
        mock.assert();
    }
}
