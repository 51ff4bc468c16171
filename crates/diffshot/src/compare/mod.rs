pub mod canonical;
pub mod mask;
pub mod render;
pub mod score;

use std::fmt;

use image::{DynamicImage, RgbImage};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::store::{OutputSink, StoreError};

pub use self::mask::DiffMask;
pub use self::score::{DiffStats, Verdict};

/// Width every input is resampled to before comparison.
pub const CANONICAL_WIDTH: u32 = 480;
/// Height every input is resampled to before comparison.
pub const CANONICAL_HEIGHT: u32 = 800;
/// Blurred intensity above which a pixel counts as a subtle change.
pub const COARSE_THRESHOLD: u8 = 20;
/// Blurred intensity above which a pixel counts as a strong change.
pub const FINE_THRESHOLD: u8 = 35;
/// Side of the square Gaussian kernel applied to the gray difference.
pub const BLUR_KERNEL_SIZE: usize = 3;
/// Side of the all-ones structuring element used by closing and opening.
pub const STRUCTURING_ELEMENT_SIZE: usize = 2;

/// Which of the two inputs an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Original,
    Current,
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => f.write_str("original"),
            Self::Current => f.write_str("current"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("image has no pixel data ({width}x{height})")]
    ZeroDimensions { width: u32, height: u32 },
}

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("failed to decode {input} image")]
    Decode {
        input: Input,
        #[source]
        source: DecodeError,
    },

    #[error("failed to encode diff image")]
    Encode(#[source] image::ImageError),

    #[error("failed to store diff image '{id}'")]
    Storage {
        id: String,
        #[source]
        source: StoreError,
    },
}

impl CompareError {
    /// True when the caller supplied bad input rather than the service failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// Outcome of one comparison, handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// Locator returned by the output sink for the annotated image.
    pub output_identifier: String,
    /// Share of unchanged pixels, 0.0–100.0, two decimals.
    pub similarity_percentage: f64,
    pub total_pixels: u64,
    pub different_pixels: u64,
    /// Canonical size as `"WxH"`.
    pub image_dimensions: String,
    /// Share of changed pixels, 0.0–100.0, three decimals.
    pub difference_ratio: f64,
}

/// In-memory products of a comparison, before anything is persisted.
pub struct Comparison {
    pub mask: DiffMask,
    pub stats: DiffStats,
    pub rendered: RgbImage,
}

/// Compare two already decoded images.
///
/// Both are brought to the canonical resolution first, so their sizes may
/// differ. Fails only when one of them has no pixel data.
pub fn compare_decoded(
    original: &DynamicImage,
    current: &DynamicImage,
) -> Result<Comparison, CompareError> {
    let original = canonical::canonicalize(original, Input::Original)?;
    let current = canonical::canonicalize(current, Input::Current)?;

    let mask = DiffMask::build(&original, &current);
    let stats = DiffStats::from_mask(&mask);
    debug!(
        different_pixels = stats.different_pixels,
        total_pixels = stats.total_pixels,
        "mask built"
    );

    let rendered = render::render(&current, &mask);
    Ok(Comparison {
        mask,
        stats,
        rendered,
    })
}

/// Full pipeline: decode both buffers, compare, encode the annotated image as
/// PNG and store it under `output_id`.
///
/// Any failure aborts the whole comparison; no partial result is returned.
pub fn compare<S>(
    original: &[u8],
    current: &[u8],
    sink: &S,
    output_id: &str,
) -> Result<ComparisonResult, CompareError>
where
    S: OutputSink + ?Sized,
{
    let original = canonical::decode(original, Input::Original)?;
    let current = canonical::decode(current, Input::Current)?;

    let comparison = compare_decoded(&original, &current)?;

    let png = render::encode_png(&comparison.rendered).map_err(CompareError::Encode)?;
    let output_identifier = sink
        .put(output_id, &png)
        .map_err(|source| CompareError::Storage {
            id: output_id.to_owned(),
            source,
        })?;

    info!(
        output = %output_identifier,
        similarity = comparison.stats.similarity_percentage,
        "comparison complete"
    );
    Ok(comparison.stats.into_result(output_identifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySink;
    use image::{ImageFormat, Rgb, Rgba, RgbaImage};

    fn encode(img: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn solid(w: u32, h: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb(color))
    }

    fn canonical_solid(color: [u8; 3]) -> RgbImage {
        solid(CANONICAL_WIDTH, CANONICAL_HEIGHT, color)
    }

    /// Paint a `size`x`size` square with its top-left corner at (`x`, `y`).
    fn with_square(base: &RgbImage, x: u32, y: u32, size: u32, color: [u8; 3]) -> RgbImage {
        let mut img = base.clone();
        for yy in y..y + size {
            for xx in x..x + size {
                img.put_pixel(xx, yy, Rgb(color));
            }
        }
        img
    }

    fn run(a: &RgbImage, b: &RgbImage) -> ComparisonResult {
        let sink = MemorySink::default();
        compare(&encode(a), &encode(b), &sink, "diff").unwrap()
    }

    #[test]
    fn identical_gray_images_are_fully_similar() {
        let img = canonical_solid([128, 128, 128]);
        let r = run(&img, &img);
        assert_eq!(r.different_pixels, 0);
        assert_eq!(r.total_pixels, 384_000);
        assert_eq!(r.similarity_percentage, 100.0);
        assert_eq!(r.difference_ratio, 0.0);
        assert_eq!(r.image_dimensions, "480x800");
    }

    #[test]
    fn black_versus_white_is_fully_different() {
        let r = run(&canonical_solid([0, 0, 0]), &canonical_solid([255, 255, 255]));
        assert_eq!(r.different_pixels, 384_000);
        assert_eq!(r.total_pixels, 384_000);
        assert_eq!(r.similarity_percentage, 0.0);
        assert_eq!(r.difference_ratio, 100.0);
    }

    #[test]
    fn single_square_change_is_localized() {
        let base = canonical_solid([255, 255, 255]);
        let changed = with_square(&base, 200, 300, 50, [0, 0, 0]);
        let r = run(&base, &changed);
        assert!(
            (2400..=2800).contains(&r.different_pixels),
            "got {} different pixels",
            r.different_pixels
        );
        assert!((r.similarity_percentage - 99.35).abs() < 0.1);
    }

    #[test]
    fn stored_output_matches_returned_identifier() {
        let base = canonical_solid([40, 40, 40]);
        let changed = with_square(&base, 10, 10, 30, [250, 250, 250]);
        let sink = MemorySink::default();
        let r = compare(&encode(&base), &encode(&changed), &sink, "session_diff").unwrap();
        assert_eq!(r.output_identifier, "session_diff");

        let png = sink.get("session_diff").expect("diff image stored");
        let stored = image::load_from_memory(&png).unwrap();
        assert_eq!(
            (stored.width(), stored.height()),
            (CANONICAL_WIDTH, CANONICAL_HEIGHT)
        );
    }

    #[test]
    fn repeated_runs_are_deterministic() {
        let base = canonical_solid([90, 120, 150]);
        let changed = with_square(&base, 100, 100, 80, [200, 30, 30]);
        let a = DynamicImage::ImageRgb8(base);
        let b = DynamicImage::ImageRgb8(changed);

        let first = compare_decoded(&a, &b).unwrap();
        let second = compare_decoded(&a, &b).unwrap();
        assert_eq!(first.mask.as_raw(), second.mask.as_raw());
        assert_eq!(first.stats, second.stats);
        assert_eq!(first.rendered.as_raw(), second.rendered.as_raw());
    }

    #[test]
    fn any_input_size_normalizes_to_canonical() {
        for (w, h) in [(100, 100), (1200, 900), (37, 1500), (4000, 3000)] {
            let a = DynamicImage::ImageRgb8(solid(w, h, [10, 200, 10]));
            let b = DynamicImage::ImageRgb8(solid(w, h, [200, 10, 10]));
            let c = compare_decoded(&a, &b).unwrap();
            assert_eq!(c.mask.width(), CANONICAL_WIDTH);
            assert_eq!(c.mask.height(), CANONICAL_HEIGHT);
            assert_eq!(c.rendered.dimensions(), (CANONICAL_WIDTH, CANONICAL_HEIGHT));
            assert_eq!(c.stats.image_dimensions(), "480x800");
        }
    }

    #[test]
    fn inputs_of_different_sizes_are_comparable() {
        let a = DynamicImage::ImageRgb8(solid(240, 400, [128, 128, 128]));
        let b = DynamicImage::ImageRgb8(solid(960, 1600, [128, 128, 128]));
        let c = compare_decoded(&a, &b).unwrap();
        assert_eq!(c.stats.different_pixels, 0);
    }

    #[test]
    fn alpha_inputs_are_accepted() {
        let rgba = RgbaImage::from_pixel(64, 64, Rgba([20, 40, 60, 128]));
        let mut buf = Vec::new();
        rgba.write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        let sink = MemorySink::default();
        let r = compare(&buf, &buf, &sink, "alpha").unwrap();
        assert_eq!(r.different_pixels, 0);
    }

    #[test]
    fn statistics_sum_to_one_hundred() {
        let base = canonical_solid([255, 255, 255]);
        for size in [1, 7, 33, 120, 333] {
            let changed = with_square(&base, 50, 50, size, [0, 0, 0]);
            let r = run(&base, &changed);
            let truncated_ratio = (r.difference_ratio * 100.0 + 1e-6).trunc() / 100.0;
            let sum = r.similarity_percentage + truncated_ratio;
            assert!((sum - 100.0).abs() <= 0.01 + 1e-9, "size {size}: sum {sum}");
        }
    }

    #[test]
    fn difference_ratio_grows_with_changed_area() {
        let base = DynamicImage::ImageRgb8(canonical_solid([255, 255, 255]));
        let mut previous = 0.0;
        for size in [0, 10, 40, 90, 200, 400] {
            let changed = with_square(&canonical_solid([255, 255, 255]), 20, 20, size, [0, 0, 0]);
            let c = compare_decoded(&base, &DynamicImage::ImageRgb8(changed)).unwrap();
            assert!(
                c.stats.difference_ratio >= previous,
                "size {size}: {} < {previous}",
                c.stats.difference_ratio
            );
            previous = c.stats.difference_ratio;
        }
    }

    struct RejectingSink;

    impl OutputSink for RejectingSink {
        fn put(&self, id: &str, _png: &[u8]) -> Result<String, StoreError> {
            Err(StoreError::InvalidId(id.to_owned()))
        }
    }

    #[test]
    fn sink_failure_is_a_storage_error() {
        let png = encode(&canonical_solid([0, 0, 0]));
        let err = compare(&png, &png, &RejectingSink, "x").unwrap_err();
        assert!(
            matches!(&err, CompareError::Storage { id, source: StoreError::InvalidId(_) } if id == "x"),
            "got {err:?}"
        );
        assert!(!err.is_client_error());
    }

    #[test]
    fn unwritable_results_dir_is_a_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("results");
        std::fs::write(&blocker, b"").unwrap();
        let sink = crate::store::DirectorySink::new(&blocker);

        let png = encode(&canonical_solid([0, 0, 0]));
        let err = compare(&png, &png, &sink, "run_diff").unwrap_err();
        assert!(
            matches!(&err, CompareError::Storage { id, source: StoreError::Io { .. } } if id == "run_diff"),
            "got {err:?}"
        );
        assert!(!err.is_client_error());
    }

    #[test]
    fn empty_buffer_is_a_decode_failure() {
        let good = encode(&canonical_solid([0, 0, 0]));
        let sink = MemorySink::default();

        let err = compare(&[], &good, &sink, "x").unwrap_err();
        assert!(matches!(
            err,
            CompareError::Decode {
                input: Input::Original,
                ..
            }
        ));
        assert!(err.is_client_error());

        let err = compare(&good, &[], &sink, "x").unwrap_err();
        assert!(matches!(
            err,
            CompareError::Decode {
                input: Input::Current,
                ..
            }
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn garbage_bytes_are_a_decode_failure() {
        let good = encode(&canonical_solid([0, 0, 0]));
        let sink = MemorySink::default();
        let err = compare(b"definitely not an image", &good, &sink, "x").unwrap_err();
        assert!(matches!(err, CompareError::Decode { .. }));
    }

    #[test]
    fn zero_sized_image_is_a_decode_failure() {
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let ok = DynamicImage::ImageRgb8(solid(4, 4, [1, 2, 3]));
        let err = compare_decoded(&ok, &empty).err().unwrap();
        assert!(matches!(
            err,
            CompareError::Decode {
                input: Input::Current,
                source: DecodeError::ZeroDimensions { .. },
            }
        ));
    }
}
