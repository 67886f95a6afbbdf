//! Template-difference defect candidate extraction.
//!
//! Given a test photo of a board and a reference (template) photo of the same
//! board, the pipeline flags regions that differ and cuts padded crops out of
//! the test image for a downstream classifier:
//!
//! 1. resolve the template from the test file name ([`TemplateResolver`]),
//! 2. resize the test image to the template's size ([`align`]),
//! 3. absolute intensity difference, binarised ([`build_mask`]),
//! 4. optional opening, then dilation ([`clean_mask`]),
//! 5. external contours above a minimum area, padded and clamped
//!    ([`extract_candidates`]),
//! 6. crop and write each region ([`emit_crop`]).
//!
//! ## Quickstart
//!
//! ```no_run
//! use pcb_inspect_diff::{DiffParams, TemplateDiffDetector, TemplateResolver};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = TemplateDiffDetector::new(DiffParams::standard())?;
//! let resolver = TemplateResolver::new("PCB_DATASET/pcb_used");
//!
//! let test = Path::new("PCB_DATASET/images/Short/01_short_01.jpg");
//! let (_board, template) = resolver.resolve(test)?;
//! let result = detector.detect_paths(test, &template)?;
//! let report = detector.emit(&result, Path::new("crops/Short"), "01_short_01.jpg");
//! println!("{} crops written", report.written.len());
//! # Ok(())
//! # }
//! ```

mod align;
mod contours;
mod detector;
mod emit;
mod error;
mod mask;
mod morphology;
mod params;
mod resolver;

pub use align::{align, load_rgb, AlignedPair};
pub use contours::{bounding_rect, external_contours, extract_candidates, polygon_area};
pub use detector::{DiffResult, TemplateDiffDetector};
pub use emit::{crop_file_name, crop_region, emit_crop, emit_crops, write_image, EmitReport};
pub use error::PairError;
pub use mask::{abs_diff, binarize, build_mask, threshold_level, DiffMask};
pub use morphology::{clean_mask, dilate_mask, open_mask};
pub use params::{
    CropFormat, DiffParams, DiffParamsOverrides, MorphologyParams, ParamsError, Preset,
    ThresholdMode,
};
pub use resolver::{default_naming, resolve_template, TemplateResolver, ID_PLACEHOLDER};

pub use pcb_inspect_core::{BoardId, CandidateRegion, Rect};
