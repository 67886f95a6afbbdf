//! Gate-and-classify inspection of a single uploaded board photo.
//!
//! The template difference acts as a gate: only regions that differ from the
//! reference board are cut out and handed to the classifier. Each classified
//! region becomes a [`DefectRecord`] and is drawn onto an annotated copy of the
//! (aligned) test image.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use pcb_inspect_core::{BoardId, Classification, ClassifyError, DefectClassifier, Detection, Rect};
use pcb_inspect_diff::{
    crop_region, load_rgb, DiffParams, PairError, ParamsError, TemplateDiffDetector,
    TemplateResolver,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Label recorded when the classifier fails on a crop.
pub const UNCLASSIFIED: &str = "unclassified";

/// Outline thickness used by [`annotate`].
pub const BOX_THICKNESS: u32 = 3;

const UNKNOWN_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

#[derive(thiserror::Error, Debug)]
pub enum InspectError {
    #[error("image {file_name} is empty")]
    EmptyImage { file_name: String },
    #[error(transparent)]
    Pair(#[from] PairError),
}

/// One classified region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefectRecord {
    pub label: String,
    pub confidence: f32,
    /// Unpadded bounding box of the differing region.
    pub bbox: Rect,
    /// Region that was cropped and classified.
    pub padded: Rect,
}

#[derive(Clone, Debug)]
pub struct InspectionReport {
    pub file_name: String,
    pub board_id: BoardId,
    pub defects: Vec<DefectRecord>,
    /// Aligned test image with one box per defect.
    pub annotated: RgbImage,
}

/// Difference gate plus crop classifier.
///
/// Build one per application and share it by reference; the classifier is
/// owned here and never reloaded.
pub struct Inspector<C> {
    detector: TemplateDiffDetector,
    resolver: TemplateResolver,
    classifier: C,
}

impl<C: DefectClassifier> Inspector<C> {
    pub fn new(
        params: DiffParams,
        resolver: TemplateResolver,
        classifier: C,
    ) -> Result<Self, ParamsError> {
        Ok(Self {
            detector: TemplateDiffDetector::new(params)?,
            resolver,
            classifier,
        })
    }

    /// Inspector with the sensitive preset and fuzzy template lookup.
    pub fn sensitive(template_dir: impl AsRef<Path>, classifier: C) -> Result<Self, ParamsError> {
        let resolver = TemplateResolver::new(template_dir.as_ref()).with_fuzzy_fallback(true);
        Self::new(DiffParams::sensitive(), resolver, classifier)
    }

    #[inline]
    pub fn detector(&self) -> &TemplateDiffDetector {
        &self.detector
    }

    #[inline]
    pub fn resolver(&self) -> &TemplateResolver {
        &self.resolver
    }

    #[inline]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Inspect an already decoded test image. `file_name` selects the
    /// template.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self, image)))]
    pub fn inspect(
        &self,
        file_name: &str,
        image: &RgbImage,
    ) -> Result<InspectionReport, InspectError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(InspectError::EmptyImage {
                file_name: file_name.to_string(),
            });
        }
        let (board_id, template_path) = self.resolver.resolve(file_name)?;
        let template = load_rgb(&template_path)?;
        let result = self.detector.detect(image.clone(), template)?;

        let defects: Vec<DefectRecord> = result
            .candidates
            .iter()
            .map(|candidate| {
                let crop = crop_region(&result.test, &candidate.padded);
                let Classification { label, confidence } = self.classify_crop(file_name, &crop);
                DefectRecord {
                    label,
                    confidence,
                    bbox: candidate.bbox,
                    padded: candidate.padded,
                }
            })
            .collect();

        log::info!("{file_name}: board {board_id}, {} defect(s)", defects.len());

        let mut annotated = result.test;
        annotate(&mut annotated, &defects);
        Ok(InspectionReport {
            file_name: file_name.to_string(),
            board_id,
            defects,
            annotated,
        })
    }

    /// Decode `path` and inspect it under its own file name.
    pub fn inspect_path(&self, path: &Path) -> Result<InspectionReport, InspectError> {
        let image = load_rgb(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.inspect(&file_name, &image)
    }

    fn classify_crop(&self, file_name: &str, crop: &RgbImage) -> Classification {
        let checked = self.classifier.classify(crop).and_then(|c| {
            if (0.0..=1.0).contains(&c.confidence) {
                Ok(c)
            } else {
                Err(ClassifyError::InvalidConfidence(c.confidence))
            }
        });
        match checked {
            Ok(c) => c,
            Err(err) => {
                log::warn!(
                    "{file_name}: classifier failed on a {}x{} crop: {err}",
                    crop.width(),
                    crop.height()
                );
                Classification {
                    label: UNCLASSIFIED.to_string(),
                    confidence: 0.0,
                }
            }
        }
    }
}

/// Outline colour for a defect label. Labels are matched case-insensitively
/// with spaces and dashes treated as underscores.
pub fn class_color(label: &str) -> Rgb<u8> {
    let key: String = label
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect();
    match key.as_str() {
        "missing_hole" => Rgb([0, 0, 0]),
        "mouse_bite" => Rgb([128, 0, 128]),
        "open_circuit" => Rgb([255, 0, 0]),
        "short" => Rgb([255, 255, 0]),
        "spur" => Rgb([0, 200, 0]),
        "spurious_copper" => Rgb([255, 165, 0]),
        _ => UNKNOWN_COLOR,
    }
}

/// Draw a [`BOX_THICKNESS`]-pixel outline centred on the border of `rect`.
pub fn draw_box(image: &mut RgbImage, rect: &Rect, color: Rgb<u8>) {
    if rect.is_empty() {
        return;
    }
    let half = (BOX_THICKNESS / 2) as i32;
    for offset in -half..=(BOX_THICKNESS as i32 - 1 - half) {
        let w = rect.width as i64 + 2 * offset as i64;
        let h = rect.height as i64 + 2 * offset as i64;
        if w <= 0 || h <= 0 {
            continue;
        }
        let r = imageproc::rect::Rect::at(rect.x as i32 - offset, rect.y as i32 - offset)
            .of_size(w as u32, h as u32);
        draw_hollow_rect_mut(image, r, color);
    }
}

/// Outline every defect's padded region in its class colour.
pub fn annotate(image: &mut RgbImage, defects: &[DefectRecord]) {
    for d in defects {
        draw_box(image, &d.padded, class_color(&d.label));
    }
}

/// Outline object-detector output in class colours.
pub fn annotate_detections(image: &mut RgbImage, detections: &[Detection]) {
    for d in detections {
        draw_box(image, &d.bbox, class_color(&d.label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_colors_follow_labels() {
        assert_eq!(class_color("Missing_hole"), Rgb([0, 0, 0]));
        assert_eq!(class_color("spurious copper"), Rgb([255, 165, 0]));
        assert_eq!(class_color("Mouse-bite"), Rgb([128, 0, 128]));
        assert_eq!(class_color("scratch"), UNKNOWN_COLOR);
    }

    #[test]
    fn box_is_three_pixels_wide() {
        let mut img = RgbImage::new(40, 40);
        let color = Rgb([0, 200, 0]);
        draw_box(&mut img, &Rect::new(10, 10, 20, 20), color);
        // left edge at x = 10 covers 9..=11
        for x in 9..=11 {
            assert_eq!(*img.get_pixel(x, 20), color, "x = {x}");
        }
        assert_eq!(*img.get_pixel(8, 20), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(12, 20), Rgb([0, 0, 0]));
        // interior untouched
        assert_eq!(*img.get_pixel(20, 20), Rgb([0, 0, 0]));
    }

    #[test]
    fn boxes_at_the_border_are_clipped() {
        let mut img = RgbImage::new(16, 16);
        draw_box(&mut img, &Rect::new(0, 0, 16, 16), Rgb([9, 9, 9]));
        assert_eq!(*img.get_pixel(0, 8), Rgb([9, 9, 9]));
        assert_eq!(*img.get_pixel(1, 8), Rgb([9, 9, 9]));
        assert_eq!(*img.get_pixel(8, 8), Rgb([0, 0, 0]));
    }

    #[test]
    fn tiny_rects_do_not_panic() {
        let mut img = RgbImage::new(8, 8);
        draw_box(&mut img, &Rect::new(3, 3, 1, 1), Rgb([1, 1, 1]));
        draw_box(&mut img, &Rect::new(3, 3, 0, 4), Rgb([1, 1, 1]));
        assert_eq!(*img.get_pixel(3, 3), Rgb([1, 1, 1]));
    }
}
