use super::{ComparisonResult, DiffMask};

/// Scalar summary of a [`DiffMask`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffStats {
    pub width: u32,
    pub height: u32,
    pub total_pixels: u64,
    pub different_pixels: u64,
    /// Percentage of unchanged pixels, rounded to 2 decimals.
    pub similarity_percentage: f64,
    /// Percentage of changed pixels, rounded to 3 decimals.
    pub difference_ratio: f64,
}

impl DiffStats {
    pub fn from_mask(mask: &DiffMask) -> Self {
        let total_pixels = mask.width() as u64 * mask.height() as u64;
        let different_pixels = mask.changed_pixels();

        let (similarity, ratio) = if total_pixels > 0 {
            let total = total_pixels as f64;
            let diff = different_pixels as f64;
            ((total - diff) / total * 100.0, diff / total * 100.0)
        } else {
            (100.0, 0.0)
        };

        Self {
            width: mask.width(),
            height: mask.height(),
            total_pixels,
            different_pixels,
            similarity_percentage: round_to(similarity, 2),
            difference_ratio: round_to(ratio, 3),
        }
    }

    pub fn image_dimensions(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn into_result(self, output_identifier: String) -> ComparisonResult {
        ComparisonResult {
            output_identifier,
            similarity_percentage: self.similarity_percentage,
            total_pixels: self.total_pixels,
            different_pixels: self.different_pixels,
            image_dimensions: self.image_dimensions(),
            difference_ratio: self.difference_ratio,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Coarse human-facing reading of a similarity percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 95% and above.
    NearlyIdentical,
    /// 85% up to 95%.
    MinorDifferences,
    /// 70% up to 85%.
    NoticeableDifferences,
    /// Below 70%.
    SignificantDifferences,
}

impl Verdict {
    pub fn from_similarity(percentage: f64) -> Self {
        if percentage >= 95.0 {
            Self::NearlyIdentical
        } else if percentage >= 85.0 {
            Self::MinorDifferences
        } else if percentage >= 70.0 {
            Self::NoticeableDifferences
        } else {
            Self::SignificantDifferences
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NearlyIdentical => "nearly identical",
            Self::MinorDifferences => "minor differences",
            Self::NoticeableDifferences => "noticeable differences",
            Self::SignificantDifferences => "significant differences",
        }
    }
}
