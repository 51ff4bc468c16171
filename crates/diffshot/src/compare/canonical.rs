use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use tracing::debug;

use super::{CANONICAL_HEIGHT, CANONICAL_WIDTH, CompareError, DecodeError, Input};

/// Resampling filter used to reach the canonical resolution.
const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Decode an encoded raster (PNG, JPEG, GIF, BMP, TIFF, ...) from memory.
pub fn decode(bytes: &[u8], input: Input) -> Result<DynamicImage, CompareError> {
    let image = image::load_from_memory(bytes).map_err(|e| CompareError::Decode {
        input,
        source: DecodeError::Image(e),
    })?;
    debug!(
        %input,
        width = image.width(),
        height = image.height(),
        "decoded"
    );
    Ok(image)
}

/// Convert to 3-channel color and resample to `CANONICAL_WIDTH` x
/// `CANONICAL_HEIGHT`. Alpha is dropped, gray is expanded.
pub fn canonicalize(image: &DynamicImage, input: Input) -> Result<RgbImage, CompareError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(CompareError::Decode {
            input,
            source: DecodeError::ZeroDimensions { width, height },
        });
    }

    let rgb = image.to_rgb8();
    if (width, height) == (CANONICAL_WIDTH, CANONICAL_HEIGHT) {
        return Ok(rgb);
    }

    debug!(%input, width, height, "resampling to canonical size");
    Ok(imageops::resize(
        &rgb,
        CANONICAL_WIDTH,
        CANONICAL_HEIGHT,
        RESAMPLE_FILTER,
    ))
}
