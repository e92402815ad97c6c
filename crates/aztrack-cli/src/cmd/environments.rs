use crate::output::print_json;
use anyhow::Context;
use aztrack_core::azdo::AzureDevOpsClient;
use aztrack_core::gating::deploy_label;
use aztrack_core::ports::DeploymentStatusProvider;
use std::path::Path;

pub fn run(config_path: &Path, token: Option<String>, json: bool) -> anyhow::Result<()> {
    let config = super::load_valid_config(config_path)?;
    let token = super::azure_devops_token(token)?;
    let client = AzureDevOpsClient::from_config(&config.azure_devops, &token)
        .context("failed to create Azure DevOps client")?;

    let names = client
        .environment_names()
        .context("failed to read release environments")?;

    if json {
        return print_json(&serde_json::json!({ "environments": names }));
    }
    if names.is_empty() {
        println!("No release environments (all ignored?).");
    }
    for name in &names {
        println!("{name}  ->  {}", deploy_label(name));
    }
    Ok(())
}
