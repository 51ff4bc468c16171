use std::path::Path;
use std::time::Duration;

use diffshot::compare::{ComparisonResult, Verdict};

pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

fn verdict_color(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::NearlyIdentical => "\x1b[32m",
        Verdict::MinorDifferences | Verdict::NoticeableDifferences => "\x1b[33m",
        Verdict::SignificantDifferences => "\x1b[31m",
    }
}

/// One-line summary: similarity, verdict, changed pixel counts and timing.
pub fn format_result_line(result: &ComparisonResult, elapsed: Duration) -> String {
    let verdict = Verdict::from_similarity(result.similarity_percentage);
    format!(
        "  {}{:>6.2}%\x1b[0m  {}  ({} of {} pixels, {:.3}%)  \x1b[2m{}\x1b[0m",
        verdict_color(verdict),
        result.similarity_percentage,
        verdict.label(),
        result.different_pixels,
        result.total_pixels,
        result.difference_ratio,
        format_duration(elapsed),
    )
}

pub fn print_result(
    original: &Path,
    current: &Path,
    result: &ComparisonResult,
    elapsed: Duration,
) {
    println!("Original:   {}", original.display());
    println!("Current:    {}", current.display());
    println!("Canonical:  {}", result.image_dimensions);
    println!();
    println!("{}", format_result_line(result, elapsed));
    println!();
    println!("Diff image: {}", result.output_identifier);
}

/// Print the pass/fail line against the configured minimum similarity.
pub fn print_summary(result: &ComparisonResult, min_similarity: f64) {
    if min_similarity <= 0.0 {
        return;
    }
    if result.similarity_percentage >= min_similarity {
        println!(
            "\x1b[32mPASS\x1b[0m  similarity {:.2}% >= {:.2}%",
            result.similarity_percentage, min_similarity
        );
    } else {
        println!(
            "\x1b[31mFAIL\x1b[0m  similarity {:.2}% is below the minimum of {:.2}%",
            result.similarity_percentage, min_similarity
        );
    }
}
