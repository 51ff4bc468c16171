use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use diffshot::compare;
use diffshot::store::DirectorySink;
use tracing::debug;
use uuid::Uuid;

use crate::config::ResolvedRunConfig;
use crate::report::{JsonReport, terminal};

/// `diffshot compare`: validate inputs, compare, store the diff, report.
/// Returns exit code: 0 = similarity at or above the minimum, 1 = below.
pub fn compare(
    config: &ResolvedRunConfig,
    original: &Path,
    current: &Path,
    json: bool,
) -> Result<i32> {
    let original_png = read_input(config, original)?;
    let current_png = read_input(config, current)?;

    let session_id = Uuid::new_v4();
    let output_id = format!("{session_id}_diff");
    let sink = DirectorySink::new(&config.results_dir);

    let t_compare = Instant::now();
    let result = compare::compare(&original_png, &current_png, &sink, &output_id)
        .with_context(|| {
            format!(
                "Failed to compare {} with {}",
                original.display(),
                current.display()
            )
        })?;
    let elapsed = t_compare.elapsed();
    debug!(%session_id, elapsed_ms = elapsed.as_millis() as u64, "compared");

    if json {
        let report = JsonReport::new(session_id, &result, format!("{output_id}.png"), Utc::now());
        println!("{}", report.to_json()?);
    } else {
        terminal::print_result(original, current, &result, elapsed);
        terminal::print_summary(&result, config.min_similarity);
    }

    if result.similarity_percentage >= config.min_similarity {
        Ok(0)
    } else {
        Ok(1)
    }
}

/// Read an input image after checking its extension and size.
fn read_input(config: &ResolvedRunConfig, path: &Path) -> Result<Vec<u8>> {
    check_extension(path, &config.allowed_extensions)?;

    let meta =
        std::fs::metadata(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if meta.len() > config.max_file_size {
        bail!(
            "{} is {} bytes, larger than the {} byte limit",
            path.display(),
            meta.len(),
            config.max_file_size
        );
    }

    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn check_extension(path: &Path, allowed: &[String]) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext {
        Some(ext) if allowed.iter().any(|a| *a == ext) => Ok(()),
        _ => bail!(
            "{}: invalid file type. Allowed: {}",
            path.display(),
            allowed.join(", ")
        ),
    }
}
