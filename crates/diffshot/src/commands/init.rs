use std::path::Path;

use anyhow::{Result, bail};

use crate::config;

/// `diffshot init`: create .diffshot/config.toml.
pub fn init(results_dir: &Path, force: bool) -> Result<()> {
    if !force && config::config_file_exists() {
        bail!(".diffshot/config.toml already exists (use --force to overwrite)");
    }

    config::write_template(results_dir)?;
    config::write_gitignore(results_dir, force)?;

    let verb = if force { "Regenerated" } else { "Created" };
    println!("{verb} .diffshot/config.toml");
    println!("  output.dir = {}", results_dir.display());
    Ok(())
}
