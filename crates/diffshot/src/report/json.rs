use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diffshot::compare::{CANONICAL_HEIGHT, CANONICAL_WIDTH, ComparisonResult};
use serde::Serialize;
use uuid::Uuid;

const ALGORITHM: &str = "Enhanced multi-threshold detection";
const QUALITY: &str = "High-definition output";

#[derive(Debug, Serialize)]
pub struct ProcessingInfo {
    pub optimized_for: String,
    pub algorithm: &'static str,
    pub quality: &'static str,
}

/// Machine-readable report printed by `diffshot compare --json`.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub success: bool,
    pub session_id: Uuid,
    #[serde(flatten)]
    pub result: &'a ComparisonResult,
    /// File name of the diff image inside the results directory.
    pub diff_filename: String,
    pub timestamp: DateTime<Utc>,
    pub processing_info: ProcessingInfo,
}

impl<'a> JsonReport<'a> {
    pub fn new(
        session_id: Uuid,
        result: &'a ComparisonResult,
        diff_filename: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            success: true,
            session_id,
            result,
            diff_filename,
            timestamp,
            processing_info: ProcessingInfo {
                optimized_for: format!("{CANONICAL_WIDTH}x{CANONICAL_HEIGHT} resolution"),
                algorithm: ALGORITHM,
                quality: QUALITY,
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }
}
