//! Difference mask construction.

use crate::{PairError, ThresholdMode};
use image::GrayImage;
use pcb_inspect_core::otsu_level;

/// Binary mask with the level that produced it.
#[derive(Clone, Debug)]
pub struct DiffMask {
    /// 255 where `|test - template| > level`, 0 elsewhere.
    pub mask: GrayImage,
    pub level: u8,
}

/// Per-pixel `|a - b|`.
pub fn abs_diff(a: &GrayImage, b: &GrayImage) -> Result<GrayImage, PairError> {
    if a.dimensions() != b.dimensions() {
        return Err(PairError::DimensionMismatch {
            test: a.dimensions(),
            template: b.dimensions(),
        });
    }
    let (w, h) = a.dimensions();
    let data: Vec<u8> = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| x.abs_diff(y))
        .collect();
    GrayImage::from_raw(w, h, data).ok_or(PairError::DimensionMismatch {
        test: a.dimensions(),
        template: b.dimensions(),
    })
}

/// Level used for `diff` under `mode`.
pub fn threshold_level(diff: &GrayImage, mode: ThresholdMode) -> u8 {
    match mode {
        ThresholdMode::Fixed { value } => value,
        ThresholdMode::OtsuWithFloor { floor } => otsu_level(diff).max(floor),
    }
}

/// Map `v > level` to 255 and everything else to 0.
pub fn binarize(img: &GrayImage, level: u8) -> GrayImage {
    let mut out = img.clone();
    for v in out.iter_mut() {
        *v = if *v > level { 255 } else { 0 };
    }
    out
}

/// Difference of two intensity images, binarised according to `mode`.
pub fn build_mask(
    test_gray: &GrayImage,
    template_gray: &GrayImage,
    mode: ThresholdMode,
) -> Result<DiffMask, PairError> {
    let diff = abs_diff(test_gray, template_gray)?;
    let level = threshold_level(&diff, mode);
    Ok(DiffMask {
        mask: binarize(&diff, level),
        level,
    })
}
