use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{Config, load, validate_min_similarity};

const ENV_RESULTS_DIR: &str = "DIFFSHOT_RESULTS_DIR";
const ENV_MIN_SIMILARITY: &str = "DIFFSHOT_MIN_SIMILARITY";

/// Values extracted from the CLI that participate in the merge.
pub struct CliOverrides {
    pub output_dir: Option<PathBuf>,
    pub min_similarity: Option<f64>,
}

/// Fully resolved config after CLI > env > file > defaults merge.
#[derive(Debug)]
pub struct ResolvedRunConfig {
    pub results_dir: PathBuf,
    pub min_similarity: f64,
    pub max_file_size: u64,
    pub allowed_extensions: Vec<String>,
}

impl ResolvedRunConfig {
    pub fn new(cli: CliOverrides) -> Result<Self> {
        let file_config = load()?;
        Self::merge(cli, file_config, |key| std::env::var(key).ok())
    }

    /// Merge the layers; `env` looks up a variable by name.
    pub fn merge(
        cli: CliOverrides,
        file_config: Config,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env_results_dir = env(ENV_RESULTS_DIR).map(PathBuf::from);
        let env_min_similarity: Option<f64> = env(ENV_MIN_SIMILARITY)
            .map(|v| v.parse::<f64>())
            .transpose()
            .with_context(|| format!("{ENV_MIN_SIMILARITY} must be a valid float"))?;

        // CLI > env > file (highest priority first)
        let results_dir = cli
            .output_dir
            .or(env_results_dir)
            .unwrap_or(file_config.output.dir);

        let min_similarity = cli
            .min_similarity
            .or(env_min_similarity)
            .unwrap_or(file_config.report.min_similarity);
        validate_min_similarity(min_similarity).map_err(|e| anyhow::anyhow!("{e}"))?;

        let allowed_extensions = file_config
            .input
            .allowed_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        Ok(Self {
            results_dir,
            min_similarity,
            max_file_size: file_config.input.max_file_size,
            allowed_extensions,
        })
    }
}
