use crate::error::{AztrackError, Result};
use crate::tracking::TrackingParser;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const CONFIG_FILE: &str = ".aztrack.yaml";

const AZURE_DEVOPS_HOST: &str = "https://dev.azure.com/";
const AZURE_RELEASE_HOST: &str = "https://vsrm.dev.azure.com/";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// GitHubConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

// ---------------------------------------------------------------------------
// AzureDevOpsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureDevOpsConfig {
    /// e.g. `https://dev.azure.com/mseng`
    pub org_url: String,
    /// Release management endpoint. Derived from `org_url` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_url: Option<String>,
    pub project: String,
    pub release_definition_id: u32,
    #[serde(default)]
    pub environments_to_ignore: Vec<String>,
}

impl AzureDevOpsConfig {
    /// Organization name: the last path segment of `org_url`.
    pub fn organization(&self) -> Option<&str> {
        self.org_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty() && !s.contains(':'))
    }

    pub fn release_base_url(&self) -> Option<String> {
        if let Some(url) = &self.release_url {
            return Some(url.trim_end_matches('/').to_string());
        }
        self.org_url
            .strip_prefix(AZURE_DEVOPS_HOST)
            .map(|rest| format!("{AZURE_RELEASE_HOST}{}", rest.trim_end_matches('/')))
    }
}

// ---------------------------------------------------------------------------
// BoardConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub project_url: String,
    pub column_for_completed_prs: String,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub github: GitHubConfig,
    pub azure_devops: AzureDevOpsConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<BoardConfig>,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            version: 1,
            github: GitHubConfig {
                owner: owner.into(),
                repo: repo.into(),
                api_url: default_github_api_url(),
            },
            azure_devops: AzureDevOpsConfig {
                org_url: format!("{AZURE_DEVOPS_HOST}mseng"),
                release_url: None,
                project: "AzureDevOps".to_string(),
                release_definition_id: 0,
                environments_to_ignore: Vec::new(),
            },
            board: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AztrackError::NotConfigured(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Write through a tempfile in the same directory so a crash never
    /// leaves a truncated config behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Parser that recognises pull request links for the configured
    /// organization and project.
    pub fn tracking_parser(&self) -> TrackingParser {
        match self.azure_devops.organization() {
            Some(org) => TrackingParser::for_project(org, &self.azure_devops.project),
            None => TrackingParser::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        if self.github.owner.trim().is_empty() || self.github.repo.trim().is_empty() {
            error("github.owner and github.repo must both be set".to_string());
        }

        let ado = &self.azure_devops;
        if ado.organization().is_none() {
            error(format!(
                "cannot derive an organization from azure_devops.org_url '{}'",
                ado.org_url
            ));
        }
        if ado.project.trim().is_empty() {
            error("azure_devops.project is empty".to_string());
        }
        if ado.release_definition_id == 0 {
            error("azure_devops.release_definition_id must be set".to_string());
        }
        if ado.release_base_url().is_none() {
            error(format!(
                "azure_devops.release_url is required when org_url is not under {AZURE_DEVOPS_HOST}"
            ));
        }

        if let Some(board) = &self.board {
            if board.project_url.trim().is_empty() {
                error("board.project_url is empty".to_string());
            }
            if board.column_for_completed_prs.trim().is_empty() {
                error("board.column_for_completed_prs is empty".to_string());
            }
        }

        if !ado.org_url.starts_with("https://") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("azure_devops.org_url '{}' is not https", ado.org_url),
            });
        }
        if ado.environments_to_ignore.iter().any(|e| e.trim().is_empty()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "azure_devops.environments_to_ignore contains an empty name".to_string(),
            });
        }
        if self.board.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no board configured: project cards will not be moved".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
