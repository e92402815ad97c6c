pub mod config;
pub mod environments;
pub mod parse;
pub mod sync;

use anyhow::Context;
use aztrack_core::config::{Config, WarnLevel};
use std::path::Path;

/// Load the config and refuse to continue if validation reports errors.
pub(crate) fn load_valid_config(path: &Path) -> anyhow::Result<Config> {
    let config = Config::load(path).context("failed to load config")?;
    let errors: Vec<String> = config
        .validate()
        .into_iter()
        .filter(|w| w.level == WarnLevel::Error)
        .map(|w| w.message)
        .collect();
    if !errors.is_empty() {
        anyhow::bail!(
            "{} has errors (run 'aztrack config validate'):\n  {}",
            path.display(),
            errors.join("\n  ")
        );
    }
    Ok(config)
}

pub(crate) fn azure_devops_token(token: Option<String>) -> anyhow::Result<String> {
    token.context("missing Azure DevOps token: set AZURE_DEVOPS_TOKEN or pass --azure-devops-token")
}
