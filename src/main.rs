use anyhow::Result;
use clap::Parser;
use salesboard::cli::Cli;
use salesboard::config::{Config, Overrides};
use salesboard::dispatcher::{dispatch_command, AppContext};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so tables and JSON on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.no_color || cli.json {
        colored::control::set_override(false);
    }

    let config = Config::load(Overrides {
        db_path: cli.db.clone(),
        role: cli.role.clone(),
    })?;
    let ctx = AppContext {
        config,
        json: cli.json,
    };

    dispatch_command(cli.command, &ctx).await
}
