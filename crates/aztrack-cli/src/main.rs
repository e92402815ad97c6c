mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, sync::SyncArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "aztrack",
    about = "Label, close, and move GitHub issues as their Azure DevOps pull requests deploy",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest .aztrack.yaml, or one at the git root)
    #[arg(long, global = true, env = "AZTRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log at debug level
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply deploy labels, close deployed issues, and move project cards
    Sync(SyncArgs),

    /// Print the tracking directive found in an issue body
    Parse {
        /// File containing the issue body (default: stdin)
        file: Option<PathBuf>,
    },

    /// List the release environments that gate closing
    Environments {
        /// Azure DevOps personal access token
        #[arg(long, env = "AZURE_DEVOPS_TOKEN", hide_env_values = true)]
        azure_devops_token: Option<String>,
    },

    /// Create, show, and validate the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        match &cli.command {
            Commands::Sync(_) => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = root::resolve_config(cli.config.as_deref());

    let result = match cli.command {
        Commands::Sync(args) => cmd::sync::run(&config_path, args, cli.json),
        Commands::Parse { file } => cmd::parse::run(&config_path, file.as_deref(), cli.json),
        Commands::Environments { azure_devops_token } => {
            cmd::environments::run(&config_path, azure_devops_token, cli.json)
        }
        Commands::Config { subcommand } => cmd::config::run(&config_path, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
