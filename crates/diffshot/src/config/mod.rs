pub mod resolve;
pub mod template;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use self::resolve::{CliOverrides, ResolvedRunConfig};
pub use self::template::{config_file_exists, write_gitignore, write_template};

pub(crate) const CONFIG_DIR: &str = ".diffshot";
const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_RESULTS_DIR: &str = ".diffshot/results";
const DEFAULT_MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;
const DEFAULT_ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory annotated diff images are written to.
    #[serde(default = "default_results_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_results_dir(),
        }
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from(DEFAULT_RESULTS_DIR)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Largest accepted input file, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Lowercase file extensions accepted as input.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Minimum similarity percentage (0-100) for a comparison to pass.
    #[serde(default)]
    pub min_similarity: f64,
}

pub fn validate_min_similarity(v: f64) -> Result<f64, String> {
    if !(0.0..=100.0).contains(&v) {
        return Err(format!("min_similarity must be between 0 and 100, got {v}"));
    }
    Ok(v)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl Config {
    /// Validate semantic constraints that serde cannot express.
    fn validate(&self) -> Result<()> {
        validate_min_similarity(self.report.min_similarity)
            .map_err(|e| anyhow::anyhow!("report.{e}"))?;

        if self.input.max_file_size == 0 {
            bail!("input.max_file_size must be > 0");
        }

        if self.input.allowed_extensions.is_empty() {
            bail!(
                "No input extensions allowed. Add some, e.g.:\n\n  \
                 [input]\n  \
                 allowed_extensions = [\"png\", \"jpg\"]"
            );
        }

        if self.output.dir.as_os_str().is_empty() {
            bail!("output.dir must not be empty");
        }

        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    Path::new(CONFIG_DIR).join(CONFIG_FILE)
}

/// Load `.diffshot/config.toml`, falling back to defaults when it is absent.
pub fn load() -> Result<Config> {
    load_from(&config_path())
}

pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
