mod cmd;
mod context;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "musubi",
    about = "Personal sync manager: keep Todoist, Things and Obsidian in step",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ~/.musubi/config.yaml)
    #[arg(long, global = true, env = "MUSUBI_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log at debug level
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show task counts and reachability for every platform
    Status,

    /// Run the health script and probe the worker
    Health,

    /// Run a three-way sync and wait for it
    Sync,

    /// Remove duplicate tasks
    Dedupe,

    /// Show worker sync metrics
    Metrics {
        /// Window in hours (1, 24 or 168)
        #[arg(long, default_value = "24", value_parser = clap::builder::PossibleValuesParser::new(["1", "24", "168"]))]
        hours: String,
    },

    /// List tasks waiting in the worker inbox
    Tasks {
        /// Print only the number of tasks
        #[arg(long)]
        count: bool,
    },

    /// Start a script in the background and return immediately
    Trigger {
        /// Script file name inside the scripts directory
        script: String,
        /// Arguments passed to the script
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Poll status on the configured interval, syncing when auto-sync is on
    Watch {
        /// Override sync.interval_ms
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Inspect and edit the configuration
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
            Commands::Watch { .. } => tracing::Level::INFO,
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

    if let Err(e) = run(cli) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.as_deref();
    let json = cli.json;

    match cli.command {
        Commands::Status => cmd::status::run(config, json),
        Commands::Health => cmd::health::run(config, json),
        Commands::Sync => cmd::sync::run(config, json),
        Commands::Dedupe => cmd::dedupe::run(config, json),
        Commands::Metrics { hours } => cmd::metrics::run(config, hours.parse()?, json),
        Commands::Tasks { count } => cmd::tasks::run(config, count, json),
        Commands::Trigger { script, args } => cmd::trigger::run(config, &script, &args, json),
        Commands::Watch { interval_ms } => cmd::watch::run(config, interval_ms),
        Commands::Config { subcommand } => cmd::config::run(config, subcommand, json),
    }
}
