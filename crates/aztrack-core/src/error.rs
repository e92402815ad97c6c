use thiserror::Error;

#[derive(Debug, Error)]
pub enum AztrackError {
    #[error("config not found at {0}: create .aztrack.yaml or pass --config")]
    NotConfigured(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("no deployment facts supplied for a tracked issue")]
    NoDeploymentFacts,

    #[error("deployment facts do not match tracked pull requests (missing: {missing:?}, unexpected: {unexpected:?})")]
    FactsMismatch {
        missing: Vec<u64>,
        unexpected: Vec<u64>,
    },

    #[error("{project_url} doesn't include a column named '{column}'")]
    MissingColumn { project_url: String, column: String },

    #[error("pull request not found: {0}")]
    PullRequestNotFound(u64),

    #[error("{url} returned {status}: {body}")]
    Api {
        status: u16,
        url: String,
        body: String,
    },

    #[error("graphql error: {0}")]
    GraphQl(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AztrackError>;
