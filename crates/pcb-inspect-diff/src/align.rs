//! Image loading and size reconciliation.
//!
//! Alignment here is a plain resize of the test image to the template's
//! dimensions. There is no registration: any shift, rotation or skew between
//! the two photographs survives into the difference image.

use crate::PairError;
use image::imageops::{self, FilterType};
use image::{ImageReader, RgbImage};
use std::path::Path;

/// Test and template with identical dimensions.
#[derive(Clone, Debug)]
pub struct AlignedPair {
    pub test: RgbImage,
    pub template: RgbImage,
    /// `true` when the test image had to be resized.
    pub resized: bool,
}

/// Decode an image file into 8-bit RGB.
pub fn load_rgb(path: &Path) -> Result<RgbImage, PairError> {
    let decode_err = |source| PairError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let img = ImageReader::open(path)
        .map_err(|e| decode_err(image::ImageError::IoError(e)))?
        .with_guessed_format()
        .map_err(|e| decode_err(image::ImageError::IoError(e)))?
        .decode()
        .map_err(decode_err)?;
    Ok(img.to_rgb8())
}

/// Resize `test` to the template's dimensions (bilinear) when they differ.
pub fn align(test: RgbImage, template: RgbImage) -> AlignedPair {
    if test.dimensions() == template.dimensions() {
        return AlignedPair {
            test,
            template,
            resized: false,
        };
    }
    let (w, h) = template.dimensions();
    log::debug!(
        "resizing test image {}x{} -> {w}x{h}",
        test.width(),
        test.height()
    );
    let test = imageops::resize(&test, w, h, FilterType::Triangle);
    AlignedPair {
        test,
        template,
        resized: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn same_size_is_untouched() {
        let test = RgbImage::from_pixel(20, 10, Rgb([1, 2, 3]));
        let template = RgbImage::new(20, 10);
        let pair = align(test.clone(), template);
        assert!(!pair.resized);
        assert_eq!(pair.test, test);
    }

    #[test]
    fn test_image_takes_template_shape() {
        let test = RgbImage::from_pixel(40, 30, Rgb([200, 200, 200]));
        let template = RgbImage::new(64, 48);
        let pair = align(test, template);
        assert!(pair.resized);
        assert_eq!(pair.test.dimensions(), (64, 48));
        assert_eq!(pair.template.dimensions(), (64, 48));
        assert!(pair.test.pixels().all(|p| p.0 == [200, 200, 200]));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_rgb(&dir.path().join("absent.jpg")).unwrap_err();
        assert!(matches!(err, PairError::Decode { .. }));
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();
        let err = load_rgb(&path).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }
}
