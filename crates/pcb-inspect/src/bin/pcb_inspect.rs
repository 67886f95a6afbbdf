//! pcb-inspect CLI: crop defect candidates out of PCB photos by template
//! difference.

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use pcb_inspect::batch::{run_batch, BatchConfig};
use pcb_inspect::diff::{
    DiffParams, DiffParamsOverrides, Preset, TemplateDiffDetector, TemplateResolver,
};
use pcb_inspect::inspect::{class_color, draw_box};
use pcb_inspect::io::{write_json, CandidatesReport};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "pcb-inspect")]
#[command(about = "Extract PCB defect candidates by template difference")]
#[command(version)]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Emit JSON tracing output instead of plain text.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Parameter flags layered over the chosen preset.
#[derive(Args, Clone, Debug, Default)]
struct ParamArgs {
    /// Named parameter set: standard or sensitive.
    #[arg(long)]
    preset: Option<Preset>,

    /// Minimum contour area (strictly exceeded).
    #[arg(long)]
    min_area: Option<f64>,

    /// Padding in pixels around each region.
    #[arg(long)]
    padding: Option<i32>,

    /// Fixed threshold or Otsu floor, depending on the preset's mode.
    #[arg(long)]
    threshold: Option<u8>,
}

impl ParamArgs {
    fn apply(&self, overrides: &mut DiffParamsOverrides) {
        if let Some(v) = self.min_area {
            overrides.min_area = Some(v);
        }
        if let Some(v) = self.padding {
            overrides.padding = Some(v);
        }
        if let Some(v) = self.threshold {
            overrides.threshold_value = Some(v);
        }
    }

    fn resolve(&self) -> DiffParams {
        let mut overrides = DiffParamsOverrides::default();
        self.apply(&mut overrides);
        overrides.resolve(self.preset.unwrap_or_default())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Crop candidates for every image of a class-per-subfolder dataset.
    Crop {
        /// JSON batch config; flags below override its fields.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory holding the defect-free template images.
        #[arg(long, required_unless_present = "config")]
        templates: Option<PathBuf>,

        /// Dataset root with one subfolder per defect class.
        #[arg(long, required_unless_present = "config")]
        input: Option<PathBuf>,

        /// Destination root; crops land in `<output>/<class>/`.
        #[arg(long, required_unless_present = "config")]
        output: Option<PathBuf>,

        #[command(flatten)]
        params: ParamArgs,

        /// Worker threads (0 = one per core).
        #[arg(long)]
        workers: Option<usize>,

        /// Remove the output directory before running.
        #[arg(long)]
        clean: bool,

        /// Write the run summary (JSON) here.
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Compare one test image with its template and report the candidates.
    Candidates {
        /// Test image; its file name selects the template.
        #[arg(long)]
        test: PathBuf,

        /// Template directory searched by board id.
        #[arg(long, required_unless_present = "template")]
        templates: Option<PathBuf>,

        /// Explicit template image, bypassing the lookup.
        #[arg(long, conflicts_with = "templates")]
        template: Option<PathBuf>,

        #[command(flatten)]
        params: ParamArgs,

        /// Path to write the report (JSON).
        #[arg(long, default_value = "candidates_report.json")]
        report: PathBuf,

        /// Also write the aligned test image with candidate boxes.
        #[arg(long)]
        annotated: Option<PathBuf>,

        /// Also write the crops into this directory.
        #[arg(long)]
        crops: Option<PathBuf>,
    },
    /// Print the built-in presets as JSON.
    Presets,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match cli.command {
        Commands::Crop {
            config,
            templates,
            input,
            output,
            params,
            workers,
            clean,
            summary,
        } => {
            let cfg = build_batch_config(
                config.as_deref(),
                templates,
                input,
                output,
                &params,
                workers,
                clean,
            )?;
            run_crop(&cfg, summary.as_deref())
        }
        Commands::Candidates {
            test,
            templates,
            template,
            params,
            report,
            annotated,
            crops,
        } => run_candidates(
            &test,
            templates.as_deref(),
            template.as_deref(),
            &params.resolve(),
            &report,
            annotated.as_deref(),
            crops.as_deref(),
        ),
        Commands::Presets => {
            let presets: BTreeMap<&str, DiffParams> = Preset::ALL
                .iter()
                .map(|p| (p.name(), DiffParams::preset(*p)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&presets)?);
            Ok(())
        }
    }
}

fn log_level(cli: &Cli) -> LevelFilter {
    if cli.quiet {
        return LevelFilter::Warn;
    }
    match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) -> CliResult<()> {
    pcb_inspect::core::init_with_level(log_level(cli))?;
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) -> CliResult<()> {
    pcb_inspect::core::init_tracing(cli.log_json);
    // Spans follow RUST_LOG; explicit -v/-q still cap `log` records.
    if cli.quiet || cli.verbose > 0 {
        log::set_max_level(log_level(cli));
    }
    Ok(())
}

fn build_batch_config(
    config: Option<&Path>,
    templates: Option<PathBuf>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    params: &ParamArgs,
    workers: Option<usize>,
    clean: bool,
) -> CliResult<BatchConfig> {
    let mut cfg = match config {
        Some(path) => BatchConfig::load_json(path)?,
        None => {
            let (Some(t), Some(i), Some(o)) = (templates.clone(), input.clone(), output.clone())
            else {
                return Err("--templates, --input and --output are required without --config".into());
            };
            BatchConfig::new(t, i, o)
        }
    };
    if let Some(t) = templates {
        cfg.template_dir = t;
    }
    if let Some(i) = input {
        cfg.input_dir = i;
    }
    if let Some(o) = output {
        cfg.output_dir = o;
    }
    if let Some(p) = params.preset {
        cfg.preset = p;
    }
    params.apply(&mut cfg.overrides);
    if let Some(w) = workers {
        cfg.workers = w;
    }
    cfg.clean_output |= clean;
    Ok(cfg)
}

fn run_crop(cfg: &BatchConfig, summary_path: Option<&Path>) -> CliResult<()> {
    let summary = run_batch(cfg)?;
    println!(
        "{} crop(s) from {}/{} pair(s) ({} without template, {} undecodable, {} bad names)",
        summary.crops_written,
        summary.pairs_processed,
        summary.pairs_total,
        summary.skipped_no_template,
        summary.skipped_decode,
        summary.skipped_invalid_name
    );
    if let Some(path) = summary_path {
        write_json(&summary, path)?;
        log::info!("wrote summary to {}", path.display());
    }
    Ok(())
}

fn run_candidates(
    test: &Path,
    templates: Option<&Path>,
    template: Option<&Path>,
    params: &DiffParams,
    report_path: &Path,
    annotated_path: Option<&Path>,
    crops_dir: Option<&Path>,
) -> CliResult<()> {
    let detector = TemplateDiffDetector::new(params.clone())?;
    let mut report = CandidatesReport::new(test, params);

    let template_path = match (template, templates) {
        (Some(path), _) => Ok(path.to_path_buf()),
        (None, Some(dir)) => TemplateResolver::new(dir)
            .resolve(test)
            .map(|(board, path)| {
                report.set_template(board, &path);
                path
            }),
        (None, None) => return Err("either --template or --templates is required".into()),
    };

    match template_path.and_then(|t| detector.detect_paths(test, &t).map(|r| (t, r))) {
        Ok((template_path, result)) => {
            if report.template_path.is_none() {
                report.template_path = Some(template_path.to_string_lossy().into_owned());
            }
            report.set_result(&result);
            log::info!(
                "{}: {} candidate(s) at level {}",
                test.display(),
                result.candidates.len(),
                result.threshold_level
            );

            if let Some(dir) = crops_dir {
                std::fs::create_dir_all(dir)?;
                let base_name = test
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let emitted = detector.emit(&result, dir, &base_name);
                report.set_crops(&emitted.written);
            }

            if let Some(path) = annotated_path {
                let mut annotated = result.test.clone();
                for c in &result.candidates {
                    draw_box(&mut annotated, &c.padded, class_color(""));
                }
                annotated.save(path)?;
                report.annotated_path = Some(path.to_string_lossy().into_owned());
            }
        }
        Err(err) => {
            log::warn!("{}: {err}", test.display());
            report.set_error(&err);
        }
    }

    report.write_json(report_path)?;
    println!("wrote report JSON to {}", report_path.display());
    Ok(())
}
