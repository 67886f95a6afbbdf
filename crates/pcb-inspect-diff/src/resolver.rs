//! Template lookup by board identifier.

use crate::PairError;
use pcb_inspect_core::BoardId;
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the board id in naming patterns.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Naming conventions tried in order: `{id}.jpg`, then `{id}_temp.jpg`.
pub fn default_naming() -> Vec<String> {
    vec!["{id}.jpg".to_owned(), "{id}_temp.jpg".to_owned()]
}

/// Locates the reference image of a board inside a template directory.
#[derive(Clone, Debug)]
pub struct TemplateResolver {
    template_dir: PathBuf,
    naming: Vec<String>,
    fuzzy_fallback: bool,
}

impl TemplateResolver {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            naming: default_naming(),
            fuzzy_fallback: false,
        }
    }

    /// Replace the ordered list of naming patterns.
    pub fn with_naming(mut self, naming: Vec<String>) -> Self {
        self.naming = naming;
        self
    }

    /// After the explicit patterns, accept the first (by name) `{id}*.jpg`.
    ///
    /// Prefix matching is loose: board `4` also matches `41.jpg`.
    pub fn with_fuzzy_fallback(mut self, enabled: bool) -> Self {
        self.fuzzy_fallback = enabled;
        self
    }

    #[inline]
    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    #[inline]
    pub fn naming(&self) -> &[String] {
        &self.naming
    }

    /// Template path for a board id, or `None` when nothing matches.
    pub fn resolve_id(&self, id: &BoardId) -> Option<PathBuf> {
        let found = self
            .naming
            .iter()
            .map(|pattern| self.template_dir.join(pattern.replace(ID_PLACEHOLDER, id.as_str())))
            .find(|p| p.is_file());
        if found.is_some() || !self.fuzzy_fallback {
            return found;
        }
        self.fuzzy_match(id)
    }

    /// Board id and template path for a test image file name.
    pub fn resolve(&self, test_file: impl AsRef<Path>) -> Result<(BoardId, PathBuf), PairError> {
        let test_file = test_file.as_ref();
        let board_id =
            BoardId::from_file_name(test_file).map_err(|source| PairError::InvalidFileName {
                path: test_file.to_path_buf(),
                source,
            })?;
        match self.resolve_id(&board_id) {
            Some(path) => Ok((board_id, path)),
            None => Err(PairError::TemplateNotFound { board_id }),
        }
    }

    fn fuzzy_match(&self, id: &BoardId) -> Option<PathBuf> {
        let entries = match fs::read_dir(&self.template_dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::debug!(
                    "cannot list template dir {}: {err}",
                    self.template_dir.display()
                );
                return None;
            }
        };
        let mut matches: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                let name = p
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                name.starts_with(id.as_str()) && has_extension(p, "jpg")
            })
            .collect();
        matches.sort();
        matches.into_iter().next()
    }
}

/// Resolve with the default naming conventions.
pub fn resolve_template(
    test_file_name: impl AsRef<Path>,
    template_dir: impl AsRef<Path>,
) -> Option<PathBuf> {
    let id = BoardId::from_file_name(test_file_name).ok()?;
    TemplateResolver::new(template_dir.as_ref()).resolve_id(&id)
}

pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    #[test]
    fn exact_name_wins_over_temp_suffix() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "00041.jpg");
        touch(dir.path(), "00041_temp.jpg");
        let found = resolve_template("00041_3.jpg", dir.path()).unwrap();
        assert_eq!(found, dir.path().join("00041.jpg"));
    }

    #[test]
    fn temp_suffix_is_second_choice() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "00041_temp.jpg");
        let found = resolve_template("00041_3.jpg", dir.path()).unwrap();
        assert_eq!(found, dir.path().join("00041_temp.jpg"));
    }

    #[test]
    fn missing_template_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "00042.jpg");
        assert!(resolve_template("00041_3.jpg", dir.path()).is_none());

        let err = TemplateResolver::new(dir.path())
            .resolve("00041_3.jpg")
            .unwrap_err();
        assert!(matches!(err, PairError::TemplateNotFound { ref board_id } if board_id.as_str() == "00041"));
    }

    #[test]
    fn custom_naming_patterns() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "ref-7.png");
        let resolver = TemplateResolver::new(dir.path()).with_naming(vec!["ref-{id}.png".into()]);
        let (id, path) = resolver.resolve("7_short_2.jpg").unwrap();
        assert_eq!(id.as_str(), "7");
        assert_eq!(path, dir.path().join("ref-7.png"));
    }

    #[test]
    fn fuzzy_fallback_takes_first_by_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "00041_b.jpg");
        touch(dir.path(), "00041_a.JPG");
        let strict = TemplateResolver::new(dir.path());
        assert!(strict.resolve("00041_3.jpg").is_err());

        let fuzzy = strict.with_fuzzy_fallback(true);
        let (_, path) = fuzzy.resolve("00041_3.jpg").unwrap();
        assert_eq!(path, dir.path().join("00041_a.JPG"));
    }

    #[test]
    fn directories_do_not_count_as_templates() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("00041.jpg")).unwrap();
        assert!(resolve_template("00041_3.jpg", dir.path()).is_none());
    }
}
