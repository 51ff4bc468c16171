mod cli;
mod commands;
mod config;
mod report;

use clap::Parser;
use config::{CliOverrides, ResolvedRunConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("diffshot=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Init { results_dir, force } => {
            commands::init(&results_dir, force)?;
        }
        cli::Command::Compare {
            original,
            current,
            output_dir,
            min_similarity,
            json,
        } => {
            let overrides = CliOverrides {
                output_dir,
                min_similarity,
            };
            let config = ResolvedRunConfig::new(overrides)?;
            let code = commands::compare(&config, &original, &current, json)?;
            std::process::exit(code);
        }
    }

    Ok(())
}
