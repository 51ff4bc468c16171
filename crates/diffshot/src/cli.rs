use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config;

fn parse_min_similarity(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|e| format!("{e}"))?;
    config::validate_min_similarity(v)
}

#[derive(Parser)]
#[command(
    name = "diffshot",
    about = "Highlight what changed between two images and score their similarity"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create .diffshot/config.toml with default settings
    Init {
        /// Directory for annotated diff images
        #[arg(long, default_value = config::DEFAULT_RESULTS_DIR)]
        results_dir: PathBuf,
        /// Overwrite existing config and gitignore
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Compare two images, save an annotated diff PNG and report similarity (exit 0/1)
    Compare {
        /// Reference image
        #[arg(long)]
        original: PathBuf,
        /// Image to check against the reference
        #[arg(long)]
        current: PathBuf,
        /// Directory for the diff image (overrides config)
        #[arg(long, short = 'o')]
        output_dir: Option<PathBuf>,
        /// Minimum similarity percentage (0–100). Lower scores exit with 1.
        #[arg(long, value_parser = parse_min_similarity)]
        min_similarity: Option<f64>,
        /// Print the report as JSON instead of a terminal line
        #[arg(long)]
        json: bool,
    },
}
