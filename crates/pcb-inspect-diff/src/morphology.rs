//! Mask cleaning: opening to drop speckles, dilation to merge fragments.

use crate::MorphologyParams;
use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Radius of a `size × size` square structuring element.
///
/// `size` is odd and at most 511 once the params are validated.
#[inline]
fn radius(size: u32) -> u8 {
    (size.saturating_sub(1) / 2).min(u8::MAX as u32) as u8
}

/// Opening (erode then dilate) with a square kernel.
pub fn open_mask(mask: &GrayImage, kernel: u32) -> GrayImage {
    let r = radius(kernel);
    if r == 0 {
        return mask.clone();
    }
    morphology::open(mask, Norm::LInf, r)
}

/// `iterations` successive dilations with a square kernel.
pub fn dilate_mask(mask: &GrayImage, kernel: u32, iterations: u32) -> GrayImage {
    let r = radius(kernel);
    let mut out = mask.clone();
    if r == 0 {
        return out;
    }
    for _ in 0..iterations {
        morphology::dilate_mut(&mut out, Norm::LInf, r);
    }
    out
}

/// Optional opening followed by repeated dilation.
pub fn clean_mask(mask: &GrayImage, params: &MorphologyParams) -> GrayImage {
    let opened = match params.open_kernel {
        Some(k) => open_mask(mask, k),
        None => mask.clone(),
    };
    dilate_mask(&opened, params.dilate_kernel, params.dilate_iterations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn with_square(w: u32, h: u32, x0: u32, y0: u32, side: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let inside = (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y);
            Luma([if inside { 255 } else { 0 }])
        })
    }

    fn count_on(img: &GrayImage) -> usize {
        img.iter().filter(|&&v| v > 0).count()
    }

    #[test]
    fn opening_removes_isolated_pixels() {
        let mut mask = with_square(40, 40, 10, 10, 8);
        mask.put_pixel(30, 30, Luma([255]));
        mask.put_pixel(2, 35, Luma([255]));
        let opened = open_mask(&mask, 3);
        assert_eq!(count_on(&opened), 64);
        assert_eq!(opened.get_pixel(30, 30).0[0], 0);
    }

    #[test]
    fn two_dilations_grow_by_two_pixels() {
        let mask = with_square(40, 40, 10, 10, 8);
        let grown = dilate_mask(&mask, 3, 2);
        assert_eq!(count_on(&grown), 12 * 12);
        assert_eq!(grown.get_pixel(8, 8).0[0], 255);
        assert_eq!(grown.get_pixel(7, 8).0[0], 0);
    }

    #[test]
    fn dilation_bridges_small_gaps() {
        let mut mask = GrayImage::new(30, 10);
        for x in 5..12 {
            mask.put_pixel(x, 5, Luma([255]));
        }
        for x in 15..22 {
            mask.put_pixel(x, 5, Luma([255]));
        }
        let grown = dilate_mask(&mask, 3, 2);
        assert!((5..22).all(|x| grown.get_pixel(x, 5).0[0] == 255));
    }

    #[test]
    fn sensitive_cleaning_keeps_thin_lines() {
        let mut mask = GrayImage::new(30, 30);
        for y in 5..25 {
            mask.put_pixel(15, y, Luma([255]));
        }
        let standard = MorphologyParams {
            open_kernel: Some(3),
            dilate_kernel: 3,
            dilate_iterations: 2,
        };
        let sensitive = MorphologyParams {
            open_kernel: None,
            ..standard
        };
        assert_eq!(count_on(&clean_mask(&mask, &standard)), 0);
        assert!(count_on(&clean_mask(&mask, &sensitive)) > 20);
    }

    #[test]
    fn unit_kernel_is_identity() {
        let mask = with_square(20, 20, 3, 3, 4);
        assert_eq!(dilate_mask(&mask, 1, 5), mask);
        assert_eq!(open_mask(&mask, 1), mask);
    }
}
