use std::path::Path;

use anyhow::{Context, Result};

use super::{CONFIG_DIR, CONFIG_FILE};

/// Hand-crafted config template with commented-out keys, so users can see the
/// available knobs without uncommenting section headers.
const CONFIG_TEMPLATE: &str = r#"[output]
dir = "{results_dir}"

# ─────────────────────────────────────────────────────────
# Inputs: all fields optional.
# ─────────────────────────────────────────────────────────
[input]
# max_file_size = 16777216          # bytes (16 MiB)
# allowed_extensions = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"]

# ─────────────────────────────────────────────────────────
# Report: all fields optional.
# ─────────────────────────────────────────────────────────
[report]
# min_similarity = 0.0              # exit 1 below this percentage (0-100)
"#;

pub fn config_file_exists() -> bool {
    Path::new(CONFIG_DIR).join(CONFIG_FILE).exists()
}

pub(super) fn render(results_dir: &Path) -> String {
    let dir = results_dir.display().to_string().replace('\\', "/");
    CONFIG_TEMPLATE.replace("{results_dir}", &dir)
}

/// Ignore generated diff images when they live inside `.diffshot/`.
pub fn write_gitignore(results_dir: &Path, force: bool) -> Result<()> {
    let path = Path::new(CONFIG_DIR).join(".gitignore");
    if !force && path.exists() {
        return Ok(());
    }
    let Ok(relative) = results_dir.strip_prefix(CONFIG_DIR) else {
        return Ok(());
    };
    let entry = format!("{}/\n", relative.display());
    std::fs::write(&path, entry).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write the hand-crafted config template (with commented-out sections).
pub fn write_template(results_dir: &Path) -> Result<()> {
    let dir = Path::new(CONFIG_DIR);
    std::fs::create_dir_all(dir).context("Failed to create .diffshot directory")?;
    let path = dir.join(CONFIG_FILE);
    std::fs::write(&path, render(results_dir))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
