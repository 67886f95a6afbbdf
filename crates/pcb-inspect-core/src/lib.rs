//! Core types and utilities for PCB defect inspection.
//!
//! This crate is intentionally small. It holds the value types shared by the
//! template-difference pipeline and the inspection facade, the traits that
//! fence off external models (classifiers, object detectors), and a couple of
//! image helpers that must behave identically everywhere (intensity
//! conversion and Otsu thresholding).

mod board;
mod classify;
mod geometry;
mod intensity;
mod logger;
mod threshold;

pub use board::{BoardId, BoardIdError};
pub use classify::{
    Classification, ClassifyError, DefectClassifier, Detection, DetectionThresholds,
    ObjectDetector,
};
pub use geometry::{CandidateRegion, Rect};
pub use intensity::gray_bt601;
pub use threshold::{otsu_level, otsu_level_from_histogram};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
