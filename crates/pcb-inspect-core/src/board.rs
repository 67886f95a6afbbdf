//! Board identifiers parsed from image file names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Key joining a test image to its template: the file-name prefix before the
/// first underscore (`00041_3.jpg` -> `00041`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(String);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum BoardIdError {
    #[error("path has no file name")]
    MissingFileName,
    #[error("file name {0:?} has an empty board prefix")]
    EmptyPrefix(String),
}

impl BoardId {
    /// Parse the board identifier from a file name or path.
    ///
    /// Names without an underscore fall back to the file stem, so a bare
    /// `00041.jpg` test image still maps to `00041`.
    pub fn from_file_name(name: impl AsRef<Path>) -> Result<Self, BoardIdError> {
        let path = name.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or(BoardIdError::MissingFileName)?;

        let prefix = match file_name.split_once('_') {
            Some((prefix, _)) => prefix.to_owned(),
            None => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        if prefix.is_empty() {
            return Err(BoardIdError::EmptyPrefix(file_name));
        }
        Ok(Self(prefix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
