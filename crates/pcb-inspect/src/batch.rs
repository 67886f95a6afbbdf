//! Batch cropping over a class-per-subfolder dataset.
//!
//! ```text
//! input_dir/<class>/<board>_<n>.jpg   ->   output_dir/<class>/<board>_<n>.jpg_<k>.jpg
//! ```
//!
//! Pairs run on a bounded worker pool. A pair that cannot be processed is
//! logged, counted and skipped; only configuration problems abort the run.

use crate::io::{load_json, write_json, ConfigIoError};
use pcb_inspect_diff::{
    default_naming, DiffParams, DiffParamsOverrides, PairError, ParamsError, Preset,
    TemplateDiffDetector, TemplateResolver,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    Params(#[from] ParamsError),
    #[error("{role} directory {path} does not exist")]
    MissingDir { role: &'static str, path: PathBuf },
    #[error("refusing to clean {path}: it contains the {role} directory")]
    UnsafeClean { role: &'static str, path: PathBuf },
    #[error("failed to read {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

fn default_extensions() -> Vec<String> {
    vec!["jpg".to_string()]
}

/// Configuration of a batch cropping run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub template_dir: PathBuf,
    /// Root holding one subfolder per defect class.
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub preset: Preset,
    #[serde(default)]
    pub overrides: DiffParamsOverrides,
    /// Template naming patterns tried in order, with `{id}` placeholders.
    #[serde(default = "default_naming")]
    pub naming: Vec<String>,
    #[serde(default)]
    pub fuzzy_fallback: bool,
    /// Accepted test image extensions, compared case-insensitively.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Worker threads; 0 lets rayon pick.
    #[serde(default)]
    pub workers: usize,
    /// Delete `output_dir` before the run.
    #[serde(default)]
    pub clean_output: bool,
}

impl BatchConfig {
    pub fn new(
        template_dir: impl Into<PathBuf>,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            template_dir: template_dir.into(),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            preset: Preset::default(),
            overrides: DiffParamsOverrides::default(),
            naming: default_naming(),
            fuzzy_fallback: false,
            extensions: default_extensions(),
            workers: 0,
            clean_output: false,
        }
    }

    /// Preset parameters with the configured overrides applied.
    pub fn params(&self) -> DiffParams {
        self.overrides.resolve(self.preset)
    }

    pub fn resolver(&self) -> TemplateResolver {
        TemplateResolver::new(&self.template_dir)
            .with_naming(self.naming.clone())
            .with_fuzzy_fallback(self.fuzzy_fallback)
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        load_json(path)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        write_json(self, path)
    }
}

/// One test image and the class folder it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CropJob {
    pub class_name: String,
    pub test_path: PathBuf,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub pairs_total: usize,
    pub pairs_processed: usize,
    pub crops_written: usize,
}

/// Counters for a finished batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub pairs_total: usize,
    pub pairs_processed: usize,
    pub skipped_no_template: usize,
    pub skipped_decode: usize,
    pub skipped_invalid_name: usize,
    pub crops_written: usize,
    pub crop_write_failures: usize,
    pub per_class: BTreeMap<String, ClassSummary>,
}

impl BatchSummary {
    pub fn pairs_skipped(&self) -> usize {
        self.skipped_no_template + self.skipped_decode + self.skipped_invalid_name
    }

    fn record(&mut self, class_name: &str, outcome: &JobOutcome) {
        self.pairs_total += 1;
        let class = self.per_class.entry(class_name.to_string()).or_default();
        class.pairs_total += 1;
        match outcome {
            JobOutcome::Processed {
                crops_written,
                crop_failures,
            } => {
                self.pairs_processed += 1;
                self.crops_written += crops_written;
                self.crop_write_failures += crop_failures;
                class.pairs_processed += 1;
                class.crops_written += crops_written;
            }
            JobOutcome::Skipped(err) => match err {
                PairError::TemplateNotFound { .. } => self.skipped_no_template += 1,
                PairError::InvalidFileName { .. } => self.skipped_invalid_name += 1,
                PairError::Decode { .. }
                | PairError::Write { .. }
                | PairError::DimensionMismatch { .. } => self.skipped_decode += 1,
            },
        }
    }
}

#[derive(Debug)]
enum JobOutcome {
    Processed {
        crops_written: usize,
        crop_failures: usize,
    },
    Skipped(PairError),
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| {
            let e = e.to_string_lossy();
            extensions
                .iter()
                .any(|x| x.trim_start_matches('.').eq_ignore_ascii_case(&e))
        })
        .unwrap_or(false)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let read_err = |source| BatchError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        entries.push(entry.map_err(read_err)?.path());
    }
    entries.sort();
    Ok(entries)
}

/// Class subfolders of `input_dir`, sorted by name.
pub fn discover_classes(input_dir: &Path) -> Result<Vec<String>, BatchError> {
    Ok(sorted_entries(input_dir)?
        .into_iter()
        .filter(|p| p.is_dir())
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect())
}

/// Every matching image in each immediate subfolder of `input_dir`.
///
/// Classes and files are visited in name order; files directly under
/// `input_dir` are ignored.
pub fn discover_jobs(input_dir: &Path, extensions: &[String]) -> Result<Vec<CropJob>, BatchError> {
    let mut jobs = Vec::new();
    for class_name in discover_classes(input_dir)? {
        for path in sorted_entries(&input_dir.join(&class_name))? {
            if path.is_file() && has_extension(&path, extensions) {
                jobs.push(CropJob {
                    class_name: class_name.clone(),
                    test_path: path,
                });
            }
        }
    }
    Ok(jobs)
}

fn require_dir(role: &'static str, path: &Path) -> Result<(), BatchError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(BatchError::MissingDir {
            role,
            path: path.to_path_buf(),
        })
    }
}

fn clean_output_dir(config: &BatchConfig) -> Result<(), BatchError> {
    let output = &config.output_dir;
    if !output.exists() {
        return Ok(());
    }
    let out_err = |source| BatchError::OutputDir {
        path: output.clone(),
        source,
    };
    let canonical = output.canonicalize().map_err(out_err)?;
    for (role, dir) in [
        ("input", &config.input_dir),
        ("template", &config.template_dir),
    ] {
        let inner = dir.canonicalize().map_err(|source| BatchError::ReadDir {
            path: dir.clone(),
            source,
        })?;
        if inner.starts_with(&canonical) {
            return Err(BatchError::UnsafeClean {
                role,
                path: output.clone(),
            });
        }
    }
    log::info!("removing previous output {}", output.display());
    fs::remove_dir_all(output).map_err(out_err)
}

fn process_pair(
    job: &CropJob,
    resolver: &TemplateResolver,
    detector: &TemplateDiffDetector,
    output_dir: &Path,
) -> Result<JobOutcome, PairError> {
    let (_board, template_path) = resolver.resolve(&job.test_path)?;
    let result = detector.detect_paths(&job.test_path, &template_path)?;
    let base_name = job
        .test_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let report = detector.emit(&result, &output_dir.join(&job.class_name), &base_name);
    Ok(JobOutcome::Processed {
        crops_written: report.written.len(),
        crop_failures: report.failures.len(),
    })
}

fn run_job(
    job: &CropJob,
    resolver: &TemplateResolver,
    detector: &TemplateDiffDetector,
    output_dir: &Path,
) -> JobOutcome {
    match process_pair(job, resolver, detector, output_dir) {
        Ok(done) => {
            log::debug!("{}: {done:?}", job.test_path.display());
            done
        }
        Err(err) => {
            log::warn!("skipping {}: {err}", job.test_path.display());
            JobOutcome::Skipped(err)
        }
    }
}

/// Crop every (test, template) pair found under `config.input_dir`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(input = %config.input_dir.display()))
)]
pub fn run_batch(config: &BatchConfig) -> Result<BatchSummary, BatchError> {
    let detector = TemplateDiffDetector::new(config.params())?;
    require_dir("input", &config.input_dir)?;
    require_dir("template", &config.template_dir)?;

    if config.clean_output {
        clean_output_dir(config)?;
    }
    let classes = discover_classes(&config.input_dir)?;
    for class_name in &classes {
        let dir = config.output_dir.join(class_name);
        fs::create_dir_all(&dir).map_err(|source| BatchError::OutputDir { path: dir, source })?;
    }

    let jobs = discover_jobs(&config.input_dir, &config.extensions)?;
    log::info!(
        "{} test image(s) in {} class folder(s)",
        jobs.len(),
        classes.len()
    );

    let resolver = config.resolver();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("pcb-crop-{i}"))
        .build()?;
    let outcomes: Vec<JobOutcome> = pool.install(|| {
        jobs.par_iter()
            .map(|job| run_job(job, &resolver, &detector, &config.output_dir))
            .collect()
    });

    let mut summary = BatchSummary::default();
    for class_name in classes {
        summary.per_class.entry(class_name).or_default();
    }
    for (job, outcome) in jobs.iter().zip(&outcomes) {
        summary.record(&job.class_name, outcome);
    }

    log::info!(
        "processed {}/{} pair(s), {} crop(s) written, {} skipped, {} crop write failure(s)",
        summary.pairs_processed,
        summary.pairs_total,
        summary.crops_written,
        summary.pairs_skipped(),
        summary.crop_write_failures
    );
    Ok(summary)
}
