//! Crop extraction and persistence.

use crate::{CropFormat, PairError};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops;
use image::{ImageError, RgbImage};
use pcb_inspect_core::{CandidateRegion, Rect};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Copy `region` out of `image`. The region is clamped to the image first.
pub fn crop_region(image: &RgbImage, region: &Rect) -> RgbImage {
    let (w, h) = image.dimensions();
    let x = region.x.min(w);
    let y = region.y.min(h);
    let cw = region.width.min(w - x);
    let ch = region.height.min(h - y);
    imageops::crop_imm(image, x, y, cw, ch).to_image()
}

/// `{base_name}_{ordinal}.{ext}`, e.g. `00041_3.jpg_0.jpg`.
pub fn crop_file_name(base_name: &str, ordinal: usize, format: CropFormat) -> String {
    format!("{base_name}_{ordinal}.{}", format.extension())
}

/// Encode `image` to `path` in the given format.
pub fn write_image(image: &RgbImage, path: &Path, format: CropFormat) -> Result<(), PairError> {
    let write_err = |source| PairError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|e| write_err(ImageError::IoError(e)))?;
    let mut writer = BufWriter::new(file);
    match format {
        CropFormat::Jpeg { quality } => {
            image
                .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
                .map_err(write_err)?;
        }
        CropFormat::Png => {
            image
                .write_with_encoder(PngEncoder::new(&mut writer))
                .map_err(write_err)?;
        }
    }
    writer
        .flush()
        .map_err(|e| write_err(ImageError::IoError(e)))
}

/// Cut `region` out of the test image and write it to
/// `output_dir/{base_name}_{ordinal}.{ext}`.
pub fn emit_crop(
    test_image: &RgbImage,
    region: &Rect,
    output_dir: &Path,
    base_name: &str,
    ordinal: usize,
    format: CropFormat,
) -> Result<PathBuf, PairError> {
    let path = output_dir.join(crop_file_name(base_name, ordinal, format));
    let crop = crop_region(test_image, region);
    write_image(&crop, &path, format)?;
    Ok(path)
}

/// Outcome of emitting every candidate of one pair.
#[derive(Debug, Default)]
pub struct EmitReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<PairError>,
}

/// Emit one crop per candidate; a failed write does not stop the rest.
///
/// Ordinals follow the candidate order, so a failed crop leaves a gap in the
/// numbering rather than shifting later names.
pub fn emit_crops(
    test_image: &RgbImage,
    candidates: &[CandidateRegion],
    output_dir: &Path,
    base_name: &str,
    format: CropFormat,
) -> EmitReport {
    let mut report = EmitReport::default();
    for (ordinal, candidate) in candidates.iter().enumerate() {
        match emit_crop(
            test_image,
            &candidate.padded,
            output_dir,
            base_name,
            ordinal,
            format,
        ) {
            Ok(path) => report.written.push(path),
            Err(err) => {
                log::warn!("skipping crop {ordinal} of {base_name}: {err}");
                report.failures.push(err);
            }
        }
    }
    report
}
