use pcb_inspect_core::{BoardId, BoardIdError};
use std::path::PathBuf;

/// Per-item failures. A batch skips the affected pair (or crop) and moves on.
#[derive(thiserror::Error, Debug)]
pub enum PairError {
    #[error("cannot derive a board id from {path}: {source}")]
    InvalidFileName {
        path: PathBuf,
        #[source]
        source: BoardIdError,
    },
    #[error("no template found for board {board_id}")]
    TemplateNotFound { board_id: BoardId },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image sizes differ: test {test:?} vs template {template:?}")]
    DimensionMismatch {
        test: (u32, u32),
        template: (u32, u32),
    },
}

impl PairError {
    /// Short stable tag for counters and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PairError::InvalidFileName { .. } => "invalid_file_name",
            PairError::TemplateNotFound { .. } => "template_not_found",
            PairError::Decode { .. } => "decode",
            PairError::Write { .. } => "write",
            PairError::DimensionMismatch { .. } => "dimension_mismatch",
        }
    }
}
