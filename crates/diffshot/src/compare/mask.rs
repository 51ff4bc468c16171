use image::{GrayImage, RgbImage};

use super::{BLUR_KERNEL_SIZE, COARSE_THRESHOLD, FINE_THRESHOLD, STRUCTURING_ELEMENT_SIZE};

pub const CHANGED: u8 = 255;
pub const UNCHANGED: u8 = 0;

/// Fixed-point luma weights (14 fractional bits) for R, G and B.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// Binary per-pixel change classification, stored row-major.
///
/// Every byte is either [`CHANGED`] or [`UNCHANGED`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl DiffMask {
    /// Classify every pixel of two equally sized images as changed or not.
    ///
    /// 1. absolute per-channel difference, reduced to luma
    /// 2. 3x3 Gaussian blur
    /// 3. coarse and fine binary thresholds, OR-ed together
    /// 4. closing, then opening, with a 2x2 square element
    ///
    /// # Panics
    ///
    /// If the two images differ in size.
    pub fn build(original: &RgbImage, current: &RgbImage) -> Self {
        assert_eq!(
            original.dimensions(),
            current.dimensions(),
            "mask inputs must share dimensions"
        );
        let (width, height) = original.dimensions();
        let (w, h) = (width as usize, height as usize);

        let gray = abs_diff_luma(original, current);
        let blurred = gaussian_blur_3x3(&gray, w, h);

        // Subtle changes pass the coarse level, strong ones the fine level.
        let coarse = threshold(&blurred, COARSE_THRESHOLD);
        let fine = threshold(&blurred, FINE_THRESHOLD);
        let combined = bitwise_or(&coarse, &fine);

        let closed = close(&combined, w, h);
        let data = open(&closed, w, h);

        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap an existing row-major buffer; nonzero bytes are normalized to
    /// [`CHANGED`].
    ///
    /// Returns `None` when the buffer length does not match `width * height`.
    pub fn from_raw(width: u32, height: u32, mut data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        for v in &mut data {
            if *v != UNCHANGED {
                *v = CHANGED;
            }
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn is_changed(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize] != UNCHANGED
    }

    pub fn changed_pixels(&self) -> u64 {
        self.data.iter().filter(|&&v| v != UNCHANGED).count() as u64
    }

    /// Copy into an `image` buffer for contour tracing.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_raw(self.width, self.height, self.data.clone())
            .expect("mask buffer length matches its dimensions")
    }
}

fn abs_diff_luma(a: &RgbImage, b: &RgbImage) -> Vec<u8> {
    a.pixels()
        .zip(b.pixels())
        .map(|(pa, pb)| {
            let r = pa[0].abs_diff(pb[0]) as u32;
            let g = pa[1].abs_diff(pb[1]) as u32;
            let b = pa[2].abs_diff(pb[2]) as u32;
            ((r * LUMA_R + g * LUMA_G + b * LUMA_B + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
        })
        .collect()
}

/// Mirror an out-of-range index back into `0..len` without repeating the edge.
fn reflect_101(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let i = if i < 0 { -i } else { i };
    let i = if i > last { 2 * last - i } else { i };
    i as usize
}

/// Separable 3x3 Gaussian with the sigma derived from the kernel size,
/// i.e. weights 1/4, 1/2, 1/4 along each axis. Rounds half up.
fn gaussian_blur_3x3(src: &[u8], w: usize, h: usize) -> Vec<u8> {
    const RADIUS: isize = (BLUR_KERNEL_SIZE / 2) as isize;
    const WEIGHTS: [u16; BLUR_KERNEL_SIZE] = [1, 2, 1];

    let mut horizontal = vec![0u16; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            horizontal[y * w + x] = (-RADIUS..=RADIUS)
                .zip(WEIGHTS)
                .map(|(d, k)| k * row[reflect_101(x as isize + d, w)] as u16)
                .sum();
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let sum: u16 = (-RADIUS..=RADIUS)
                .zip(WEIGHTS)
                .map(|(d, k)| k * horizontal[reflect_101(y as isize + d, h) * w + x])
                .sum();
            out[y * w + x] = ((sum + 8) >> 4) as u8;
        }
    }
    out
}

/// Strictly-greater binary threshold.
fn threshold(src: &[u8], level: u8) -> Vec<u8> {
    src.iter()
        .map(|&v| if v > level { CHANGED } else { UNCHANGED })
        .collect()
}

fn bitwise_or(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(&x, &y)| x | y).collect()
}

/// Apply `op` over the square structuring element anchored at its center
/// `(1, 1)`, so each pixel looks at itself and its upper-left neighbors.
/// Neighbors outside the image are skipped.
fn morph(src: &[u8], w: usize, h: usize, op: fn(u8, u8) -> u8) -> Vec<u8> {
    const ANCHOR: usize = STRUCTURING_ELEMENT_SIZE / 2;
    let mut out = vec![UNCHANGED; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = src[y * w + x];
            for ky in 0..STRUCTURING_ELEMENT_SIZE {
                for kx in 0..STRUCTURING_ELEMENT_SIZE {
                    let (Some(sy), Some(sx)) =
                        ((y + ky).checked_sub(ANCHOR), (x + kx).checked_sub(ANCHOR))
                    else {
                        continue;
                    };
                    if sy < h && sx < w {
                        acc = op(acc, src[sy * w + sx]);
                    }
                }
            }
            out[y * w + x] = acc;
        }
    }
    out
}

fn dilate(src: &[u8], w: usize, h: usize) -> Vec<u8> {
    morph(src, w, h, u8::max)
}

fn erode(src: &[u8], w: usize, h: usize) -> Vec<u8> {
    morph(src, w, h, u8::min)
}

/// Dilate then erode: bridges one-pixel gaps.
fn close(src: &[u8], w: usize, h: usize) -> Vec<u8> {
    erode(&dilate(src, w, h), w, h)
}

/// Erode then dilate: drops isolated specks.
fn open(src: &[u8], w: usize, h: usize) -> Vec<u8> {
    dilate(&erode(src, w, h), w, h)
}
