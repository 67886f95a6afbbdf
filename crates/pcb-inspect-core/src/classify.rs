//! Boundary types for external models.
//!
//! The pipeline never sees a model's native result object. Adapters
//! implementing [`DefectClassifier`] or [`ObjectDetector`] convert whatever the
//! model returns into [`Classification`] / [`Detection`] values.

use crate::Rect;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Errors reported by model adapters.
#[derive(thiserror::Error, Debug)]
pub enum ClassifyError {
    #[error("model is not available: {0}")]
    Unavailable(String),
    #[error("model rejected input ({width}x{height}): {reason}")]
    InvalidInput {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("invalid box [{x0}, {y0}, {x1}, {y1}]")]
    InvalidBox { x0: f32, y0: f32, x1: f32, y1: f32 },
    #[error("confidence {0} is outside [0, 1]")]
    InvalidConfidence(f32),
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Label assigned to one cropped region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Crop classifier: `classify(cropped_image) -> (label, confidence)`.
///
/// Implementations are shared across worker threads, so they must be
/// `Send + Sync`; any interior model state is the adapter's concern.
pub trait DefectClassifier: Send + Sync {
    fn classify(&self, crop: &RgbImage) -> Result<Classification, ClassifyError>;
}

impl<T: DefectClassifier + ?Sized> DefectClassifier for &T {
    fn classify(&self, crop: &RgbImage) -> Result<Classification, ClassifyError> {
        (**self).classify(crop)
    }
}

impl<T: DefectClassifier + ?Sized> DefectClassifier for Box<T> {
    fn classify(&self, crop: &RgbImage) -> Result<Classification, ClassifyError> {
        (**self).classify(crop)
    }
}

/// Thresholds forwarded to an object detector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionThresholds {
    /// Minimum box confidence.
    pub confidence: f32,
    /// IoU threshold for non-maximum suppression.
    pub iou: f32,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            confidence: 0.25,
            iou: 0.45,
        }
    }
}

/// One labelled box produced by an object detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: Rect,
    pub label: String,
    pub confidence: f32,
}

impl Detection {
    /// Adapt a corner-format box (`x0, y0, x1, y1` in pixels) as emitted by
    /// typical detection models.
    ///
    /// Coordinates are rounded and clamped to the image; boxes that end up
    /// empty, or have non-finite coordinates, are rejected.
    pub fn from_xyxy(
        xyxy: [f32; 4],
        label: impl Into<String>,
        confidence: f32,
        image_width: u32,
        image_height: u32,
    ) -> Result<Self, ClassifyError> {
        let [x0, y0, x1, y1] = xyxy;
        let invalid = || ClassifyError::InvalidBox { x0, y0, x1, y1 };
        if !xyxy.iter().all(|v| v.is_finite()) {
            return Err(invalid());
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ClassifyError::InvalidConfidence(confidence));
        }

        let clamp = |v: f32, max: u32| v.round().clamp(0.0, max as f32) as u32;
        let bbox = Rect::from_corners(
            clamp(x0, image_width),
            clamp(y0, image_height),
            clamp(x1, image_width),
            clamp(y1, image_height),
        )
        .filter(|r| !r.is_empty())
        .ok_or_else(invalid)?;

        Ok(Self {
            bbox,
            label: label.into(),
            confidence,
        })
    }
}

/// Whole-image object detector: `detect(image, confidence, iou) -> boxes`.
pub trait ObjectDetector: Send + Sync {
    fn detect(
        &self,
        image: &RgbImage,
        thresholds: &DetectionThresholds,
    ) -> Result<Vec<Detection>, ClassifyError>;
}
