//! JSON configuration and report helpers.

use pcb_inspect_core::{BoardId, CandidateRegion};
use pcb_inspect_diff::{DiffParams, DiffResult, PairError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Read any JSON document from disk.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigIoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write `value` to disk as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(
    value: &T,
    path: impl AsRef<Path>,
) -> Result<(), ConfigIoError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Report for a single (test, template) comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatesReport {
    pub test_path: String,
    #[serde(default)]
    pub template_path: Option<String>,
    #[serde(default)]
    pub board_id: Option<BoardId>,
    pub params: DiffParams,
    #[serde(default)]
    pub threshold_level: Option<u8>,
    #[serde(default)]
    pub resized: bool,
    #[serde(default)]
    pub candidates: Vec<CandidateRegion>,
    #[serde(default)]
    pub crops: Vec<String>,
    #[serde(default)]
    pub annotated_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CandidatesReport {
    pub fn new(test_path: &Path, params: &DiffParams) -> Self {
        Self {
            test_path: test_path.to_string_lossy().into_owned(),
            template_path: None,
            board_id: None,
            params: params.clone(),
            threshold_level: None,
            resized: false,
            candidates: Vec::new(),
            crops: Vec::new(),
            annotated_path: None,
            error: None,
        }
    }

    pub fn set_template(&mut self, board_id: BoardId, template_path: &Path) {
        self.board_id = Some(board_id);
        self.template_path = Some(template_path.to_string_lossy().into_owned());
    }

    /// Populate report fields from a successful comparison.
    pub fn set_result(&mut self, res: &DiffResult) {
        self.threshold_level = Some(res.threshold_level);
        self.resized = res.resized;
        self.candidates = res.candidates.clone();
        self.error = None;
    }

    pub fn set_crops(&mut self, crops: &[PathBuf]) {
        self.crops = crops
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
    }

    /// Record a per-pair failure.
    pub fn set_error(&mut self, err: &PairError) {
        self.error = Some(err.to_string());
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        load_json(path)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        write_json(self, path)
    }
}
