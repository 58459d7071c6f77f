//! clusterwatchd — the clusterwatch daemon.
//!
//! Wires a snapshot-backed data provider into the health monitor and the
//! score calculator:
//! - `run`: monitor loop until Ctrl-C
//! - `check`: one evaluation cycle, printed as JSON
//! - `score`: composite health score, printed as JSON
//!
//! # Usage
//!
//! ```text
//! clusterwatchd --snapshot cluster.json --config clusterwatch.toml run
//! ```

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clusterwatchd", about = "Cluster health monitor daemon")]
struct Cli {
    /// Cluster snapshot (JSON) served as the data provider.
    #[arg(long, global = true, default_value = "cluster.json")]
    snapshot: PathBuf,

    /// Monitor configuration (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the check interval, e.g. "30s", "500ms", "2m".
    #[arg(long, global = true)]
    interval: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the health monitor until interrupted.
    Run,
    /// Run every check once and print the cluster health.
    Check,
    /// Print the composite health score.
    Score,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = commands::load_config(cli.config.as_deref(), cli.interval.as_deref())?;
    let provider = commands::load_provider(&cli.snapshot)?;

    match cli.command {
        Command::Run => commands::run(provider, config).await,
        Command::Check => commands::check(provider, config).await,
        Command::Score => commands::score(&provider),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,clusterwatch=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
