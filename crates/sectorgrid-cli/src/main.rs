//! sectorgrid CLI: spot detection, sector-scan calibration and correction.

use clap::{Args, Parser, Subcommand, ValueEnum};
use sectorgrid::{
    CalibrationMethod, EllipseEstimate, LinearParams, PipelineConfig, PixelBuffer, Polarity,
    RansacLineConfig, SectorCalibrator, TrimParams,
};
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "sectorgrid")]
#[command(about = "Calibrate and correct sector-scan images from a grid of fiducial spots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment fiducial spots and write their ellipses (JSON).
    Detect {
        #[command(flatten)]
        input: ImageArgs,
        #[command(flatten)]
        segment: SegmentArgs,
    },

    /// Fit the calibration model to an ellipse file.
    Calibrate {
        /// Path to an ellipse list written by `detect`.
        #[arg(long)]
        ellipses: PathBuf,

        /// Path to write the calibration outcome (JSON).
        #[arg(long)]
        out: PathBuf,

        #[command(flatten)]
        method: MethodArgs,
    },

    /// Full pipeline: detect, calibrate, resolve the grid, remap and score.
    Run {
        #[command(flatten)]
        input: ImageArgs,

        /// Path to write the corrected image (PNG, transparent outside the fan).
        #[arg(long)]
        corrected: Option<PathBuf>,

        /// Pipeline config (JSON); flags given on the command line override it.
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        segment: SegmentArgs,

        #[command(flatten)]
        method: MethodArgs,
    },
}

#[derive(Debug, Clone, Args)]
struct ImageArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write results (JSON).
    #[arg(long)]
    out: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct SegmentArgs {
    /// Spot polarity relative to the background.
    #[arg(long, value_enum)]
    polarity: Option<PolarityArg>,

    /// Luminance threshold (0-255).
    #[arg(long)]
    threshold: Option<u8>,

    /// Minimum spot semi-axis in pixels.
    #[arg(long)]
    min_radius: Option<f64>,

    /// Maximum spot semi-axis in pixels.
    #[arg(long)]
    max_radius: Option<f64>,
}

#[derive(Debug, Clone, Args)]
struct MethodArgs {
    /// Calibration strategy.
    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    /// Trim rounds for `--method trim`.
    #[arg(long)]
    iterations: Option<usize>,

    /// Percent of samples discarded per trim round.
    #[arg(long)]
    trim_percent: Option<f64>,

    /// RANSAC random seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolarityArg {
    Dark,
    Light,
}

impl PolarityArg {
    fn to_core(self) -> Polarity {
        match self {
            Self::Dark => Polarity::Dark,
            Self::Light => Polarity::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    Linear,
    Ransac,
    Trim,
}

impl SegmentArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        let seg = &mut config.segment;
        if let Some(p) = self.polarity {
            seg.polarity = p.to_core();
        }
        if let Some(t) = self.threshold {
            seg.threshold = t;
        }
        if let Some(r) = self.min_radius {
            seg.min_radius = r;
        }
        if let Some(r) = self.max_radius {
            seg.max_radius = r;
        }
    }
}

impl MethodArgs {
    /// Replace the method when `--method` is given, then patch its parameters.
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(m) = self.method {
            config.calibration = match m {
                MethodArg::Linear => CalibrationMethod::Linear(LinearParams::default()),
                MethodArg::Ransac => CalibrationMethod::Ransac(RansacLineConfig::default()),
                MethodArg::Trim => CalibrationMethod::IterativeTrim(TrimParams::default()),
            };
        }
        match &mut config.calibration {
            CalibrationMethod::Ransac(c) => {
                if let Some(seed) = self.seed {
                    c.seed = seed;
                }
            }
            CalibrationMethod::IterativeTrim(p) => {
                if let Some(n) = self.iterations {
                    p.iterations = n;
                }
                if let Some(pct) = self.trim_percent {
                    p.trim_percent = pct;
                }
            }
            CalibrationMethod::Linear(_) => {}
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect { input, segment } => run_detect(&input, &segment),
        Commands::Calibrate {
            ellipses,
            out,
            method,
        } => run_calibrate(&ellipses, &out, &method),
        Commands::Run {
            input,
            corrected,
            config,
            segment,
            method,
        } => run_pipeline(&input, corrected.as_deref(), config.as_deref(), &segment, &method),
    }
}

fn load_image(path: &Path) -> CliResult<PixelBuffer> {
    tracing::info!("Loading image: {}", path.display());
    let img = image::open(path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", path.display(), e).into()
    })?;
    tracing::info!("Image size: {}x{}", img.width(), img.height());
    Ok(PixelBuffer::from(&img))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    tracing::info!("Results written to {}", path.display());
    Ok(())
}

fn checked(config: PipelineConfig) -> CliResult<SectorCalibrator> {
    config.validate()?;
    Ok(SectorCalibrator::with_config(config))
}

// ── detect ─────────────────────────────────────────────────────────────

fn run_detect(input: &ImageArgs, segment: &SegmentArgs) -> CliResult<()> {
    let buffer = load_image(&input.image)?;
    let mut config = PipelineConfig::default();
    segment.apply(&mut config);
    let calibrator = checked(config)?;

    let seg = calibrator.detect(&buffer);
    tracing::info!("Detected {} spots", seg.ellipses.len());
    write_json(&input.out, &seg.ellipses)
}

// ── calibrate ──────────────────────────────────────────────────────────

fn run_calibrate(ellipses: &Path, out: &Path, method: &MethodArgs) -> CliResult<()> {
    let data = std::fs::read_to_string(ellipses).map_err(|e| -> CliError {
        format!("Failed to read {}: {}", ellipses.display(), e).into()
    })?;
    let ellipses: Vec<EllipseEstimate> = serde_json::from_str(&data)?;

    let mut config = PipelineConfig::default();
    method.apply(&mut config);
    let calibrator = checked(config)?;

    let outcome = calibrator.calibrate(&ellipses);
    let model = &outcome.model;
    tracing::info!(
        "Model: slope {:.6}, center x {:.1}, R² {:.3}, {} of {} inliers, valid {}",
        model.slope,
        model.rotation_center_x,
        model.r_squared,
        model.inlier_count,
        model.sample_count,
        model.is_valid
    );
    write_json(out, &outcome)
}

// ── run ────────────────────────────────────────────────────────────────

fn run_pipeline(
    input: &ImageArgs,
    corrected: Option<&Path>,
    config: Option<&Path>,
    segment: &SegmentArgs,
    method: &MethodArgs,
) -> CliResult<()> {
    let buffer = load_image(&input.image)?;
    let mut cfg = match config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    segment.apply(&mut cfg);
    method.apply(&mut cfg);
    let calibrator = checked(cfg)?;

    let run = calibrator.run(&buffer)?;
    let report = &run.report;
    tracing::info!(
        "{} spots, model valid {}, raw score {}",
        report.ellipses.len(),
        report.model.is_valid,
        report.metrics.final_score
    );
    if let Some(after) = report.corrected_metrics {
        tracing::info!("Corrected score {}", after.final_score);
    }
    write_json(&input.out, report)?;

    if let Some(path) = corrected {
        match run.corrected.as_ref() {
            Some(img) => {
                img.buffer.to_rgba_image().save(path)?;
                tracing::info!("Corrected image written to {}", path.display());
            }
            None => tracing::warn!("No corrected image: calibration model is not usable"),
        }
    }
    Ok(())
}
