//! High-level facade crate for the `pcb-inspect-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core types and the template-difference pipeline;
//! - a batch driver that crops every (test, template) pair of a
//!   class-per-subfolder dataset on a worker pool ([`batch`]);
//! - gate-and-classify inspection of single photos with an external
//!   classifier and annotated output ([`inspect`]);
//! - JSON config and report helpers ([`io`]);
//! - the `pcb-inspect` command-line tool (feature `cli`).
//!
//! ## Quickstart
//!
//! ```no_run
//! use pcb_inspect::batch::{run_batch, BatchConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = BatchConfig::new("PCB_DATASET/pcb_used", "PCB_DATASET/images", "crops");
//! let summary = run_batch(&cfg)?;
//! println!(
//!     "{} crops from {}/{} pairs",
//!     summary.crops_written, summary.pairs_processed, summary.pairs_total
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `pcb_inspect::core`: geometry, board ids, classifier/detector traits,
//!   grayscale and Otsu helpers, logging setup.
//! - `pcb_inspect::diff`: the difference pipeline, its parameters and presets.
//! - `pcb_inspect::batch`, `pcb_inspect::inspect`, `pcb_inspect::io`.

pub use pcb_inspect_core as core;
pub use pcb_inspect_diff as diff;

pub use pcb_inspect_core::{
    BoardId, CandidateRegion, Classification, ClassifyError, DefectClassifier, Detection, Rect,
};
pub use pcb_inspect_diff::{DiffParams, PairError, Preset, TemplateDiffDetector, TemplateResolver};

pub mod batch;
pub mod inspect;
pub mod io;

pub use batch::{run_batch, BatchConfig, BatchError, BatchSummary};
pub use inspect::{DefectRecord, InspectError, InspectionReport, Inspector};
