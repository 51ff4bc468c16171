use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageResult, Rgb, RgbImage};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::drawing::draw_line_segment_mut;

use super::DiffMask;

/// Color painted over changed pixels and used for contour outlines.
pub const HIGHLIGHT: Rgb<u8> = Rgb([255, 0, 0]);
/// Weight of the current image in the overlay blend.
pub const IMAGE_WEIGHT: f32 = 0.7;
/// Weight of the highlight layer in the overlay blend.
pub const OVERLAY_WEIGHT: f32 = 0.3;
/// Contour stroke width in pixels.
pub const CONTOUR_THICKNESS: i32 = 2;
pub const CONTRAST_GAIN: f32 = 1.1;
pub const BRIGHTNESS_OFFSET: f32 = 10.0;

/// Annotate `current` with the changed regions of `mask`.
///
/// The overlay blend runs over every pixel, so unchanged areas come out at
/// 70% brightness before the final contrast boost.
pub fn render(current: &RgbImage, mask: &DiffMask) -> RgbImage {
    let mut out = blend_overlay(current, mask);
    for contour in external_contours(mask) {
        draw_contour(&mut out, &contour);
    }
    adjust_contrast(&mut out);
    out
}

/// Encode as PNG, trading size for speed.
pub fn encode_png(image: &RgbImage) -> ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buf, CompressionType::Fast, FilterType::Adaptive);
    image.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Saturating conversion with round-half-to-even.
fn saturate(v: f32) -> u8 {
    v.round_ties_even().clamp(0.0, 255.0) as u8
}

fn blend_overlay(current: &RgbImage, mask: &DiffMask) -> RgbImage {
    let mut out = current.clone();
    for (pixel, &m) in out.pixels_mut().zip(mask.as_raw()) {
        let overlay = if m != 0 { HIGHLIGHT } else { Rgb([0, 0, 0]) };
        for c in 0..3 {
            pixel[c] =
                saturate(IMAGE_WEIGHT * pixel[c] as f32 + OVERLAY_WEIGHT * overlay[c] as f32);
        }
    }
    out
}

/// Outer borders of changed regions that are not nested inside a hole.
pub fn external_contours(mask: &DiffMask) -> Vec<Contour<i32>> {
    find_contours::<i32>(&mask.to_gray_image())
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .collect()
}

/// Stroke the closed polygon through the contour points. The pen covers the
/// point and its upper-left neighbors, giving a two-pixel line.
fn draw_contour(canvas: &mut RgbImage, contour: &Contour<i32>) {
    let points = &contour.points;
    let Some(first) = points.first() else {
        return;
    };
    let pen = -(CONTOUR_THICKNESS / 2)..(CONTOUR_THICKNESS - CONTOUR_THICKNESS / 2);

    let segments = points
        .iter()
        .zip(points.iter().skip(1).chain(std::iter::once(first)));
    for (a, b) in segments {
        for dy in pen.clone() {
            for dx in pen.clone() {
                draw_line_segment_mut(
                    canvas,
                    ((a.x + dx) as f32, (a.y + dy) as f32),
                    ((b.x + dx) as f32, (b.y + dy) as f32),
                    HIGHLIGHT,
                );
            }
        }
    }
}

/// `p' = clamp(1.1 * p + 10)` on every channel.
fn adjust_contrast(image: &mut RgbImage) {
    for v in image.iter_mut() {
        *v = saturate(CONTRAST_GAIN * *v as f32 + BRIGHTNESS_OFFSET);
    }
}
