use crate::align::{align, load_rgb};
use crate::contours::extract_candidates;
use crate::emit::{emit_crops, EmitReport};
use crate::mask::build_mask;
use crate::morphology::clean_mask;
use crate::{DiffParams, PairError, ParamsError};
use image::{GrayImage, RgbImage};
use pcb_inspect_core::{gray_bt601, CandidateRegion};
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Output of one (test, template) comparison.
#[derive(Clone, Debug)]
pub struct DiffResult {
    /// Test image after alignment to the template's dimensions.
    pub test: RgbImage,
    /// Cleaned binary mask the candidates were extracted from.
    pub mask: GrayImage,
    /// Binarisation level actually applied to the difference image.
    pub threshold_level: u8,
    /// Candidates sorted by top-left corner.
    pub candidates: Vec<CandidateRegion>,
    /// `true` when the test image was resized during alignment.
    pub resized: bool,
}

/// Template-difference candidate extractor.
///
/// Parameters are validated once at construction; a detector can then be
/// shared across threads and applied to any number of pairs.
#[derive(Clone, Debug)]
pub struct TemplateDiffDetector {
    params: DiffParams,
}

impl TemplateDiffDetector {
    pub fn new(params: DiffParams) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(Self { params })
    }

    #[inline]
    pub fn params(&self) -> &DiffParams {
        &self.params
    }

    /// Run align -> diff -> clean -> extract on decoded images.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip_all,
            fields(width = template.width(), height = template.height())
        )
    )]
    pub fn detect(&self, test: RgbImage, template: RgbImage) -> Result<DiffResult, PairError> {
        let pair = align(test, template);
        let test_gray = gray_bt601(&pair.test);
        let template_gray = gray_bt601(&pair.template);

        let diff = build_mask(&test_gray, &template_gray, self.params.threshold)?;
        let mask = clean_mask(&diff.mask, &self.params.morphology);
        let candidates = extract_candidates(&mask, self.params.min_area, self.params.padding_px());

        log::debug!(
            "level {} -> {} candidate(s) (min_area {}, padding {})",
            diff.level,
            candidates.len(),
            self.params.min_area,
            self.params.padding
        );

        Ok(DiffResult {
            test: pair.test,
            mask,
            threshold_level: diff.level,
            candidates,
            resized: pair.resized,
        })
    }

    /// Decode both files and run [`TemplateDiffDetector::detect`].
    pub fn detect_paths(
        &self,
        test_path: &Path,
        template_path: &Path,
    ) -> Result<DiffResult, PairError> {
        let test = load_rgb(test_path)?;
        let template = load_rgb(template_path)?;
        self.detect(test, template)
    }

    /// Write one crop per candidate into `output_dir`.
    pub fn emit(&self, result: &DiffResult, output_dir: &Path, base_name: &str) -> EmitReport {
        emit_crops(
            &result.test,
            &result.candidates,
            output_dir,
            base_name,
            self.params.crop_format,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_validates_params() {
        let mut params = DiffParams::standard();
        params.padding = -5;
        assert!(TemplateDiffDetector::new(params).is_err());
        assert!(TemplateDiffDetector::new(DiffParams::sensitive()).is_ok());
    }
}
