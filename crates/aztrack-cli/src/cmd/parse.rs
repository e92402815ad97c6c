use crate::output::print_json;
use anyhow::Context;
use aztrack_core::config::Config;
use aztrack_core::{AztrackError, TrackingParser};
use std::io::Read;
use std::path::Path;

/// Parse an issue body from `file` (or stdin) and print its tracking
/// directive. Uses the configured organization/project when a config exists.
pub fn run(config_path: &Path, file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let parser = match Config::load(config_path) {
        Ok(cfg) => cfg.tracking_parser(),
        Err(AztrackError::NotConfigured(_)) => TrackingParser::default(),
        Err(e) => return Err(e).context("failed to load config"),
    };
    let directive = parser.parse(&text);

    if json {
        return print_json(&directive);
    }
    match directive {
        None => println!("No tracking information found."),
        Some(d) => {
            let ids: Vec<String> = d.change_ids.iter().map(|id| id.to_string()).collect();
            println!("Pull requests: {}", ids.join(", "));
            println!("Labels only:   {}", d.labels_only);
        }
    }
    Ok(())
}
