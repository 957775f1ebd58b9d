mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, Globals};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "theme-preview",
    about = "Per-pull-request Shopify theme previews, driven from CI",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: .theme-preview.yaml found walking up from cwd)
    #[arg(long, global = true, env = "THEME_PREVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Repository as OWNER/NAME
    #[arg(long, global = true, env = "GITHUB_REPOSITORY")]
    repo: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a pull_request event payload (deploy, teardown or skip)
    Event {
        /// Event payload file
        #[arg(long, env = "GITHUB_EVENT_PATH")]
        path: PathBuf,
    },

    /// Create or update the preview theme for a pull request
    Deploy {
        #[arg(long)]
        pr: u64,

        /// Head branch (default: looked up on GitHub)
        #[arg(long)]
        branch: Option<String>,

        /// Head commit
        #[arg(long)]
        sha: Option<String>,
    },

    /// Delete the preview theme for a pull request
    Teardown {
        #[arg(long)]
        pr: u64,
    },

    /// Delete previews whose pull request is no longer open
    Sweep {
        /// Report what would be deleted without deleting it
        #[arg(long)]
        dry_run: bool,
    },

    /// List preview themes on the store
    List,

    /// Inspect or validate the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Config { .. } => tracing::Level::WARN,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let globals = Globals {
        config: cli.config,
        repo: cli.repo,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Event { path } => cmd::event::run(&globals, &path),
        Commands::Deploy { pr, branch, sha } => cmd::deploy::run(&globals, pr, branch, sha),
        Commands::Teardown { pr } => cmd::teardown::run(&globals, pr),
        Commands::Sweep { dry_run } => cmd::sweep::run(&globals, dry_run),
        Commands::List => cmd::list::run(&globals),
        Commands::Config { subcommand } => cmd::config::run(&globals, subcommand),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
