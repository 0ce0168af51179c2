//! survey-density CLI: detection density maps from aerial survey captures.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::path::PathBuf;
use survey_density::core::CaptureId;
use survey_density::grid::CoverageTest;
use survey_density::{pipeline, CaptureStatus, RunConfig};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "survey-density")]
#[command(
    about = "Bin per-image detections into a ground grid without double counting overlapping captures"
)]
#[command(version)]
struct Cli {
    /// Only report errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// More log output, repeat for debug and trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit structured JSON logs instead of plain text.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pixel detections plus telemetry, gridded in meters around an origin capture.
    Local {
        /// Telemetry JSON, one record per capture.
        #[arg(long)]
        telemetry: PathBuf,

        /// Capture anchoring the local frame (default: lowest capture id).
        #[arg(long)]
        origin: Option<String>,

        /// Meters added to every telemetry altitude.
        #[arg(long)]
        sensor_offset: Option<f64>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Georeferenced detections plus surveyed image corners, gridded in degrees.
    Geodetic {
        /// `capture label lat lon` corner list.
        #[arg(long)]
        corners: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Run from a JSON configuration file.
    Run {
        #[arg(long)]
        config: PathBuf,

        /// Override the configured output directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// Directory of per-capture `<capture>.txt` detection files.
    #[arg(long)]
    detections: PathBuf,

    /// Grid cell side in meters.
    #[arg(long, default_value = "3.0")]
    cell_size: f64,

    /// Output directory for rasters, legend and report.
    #[arg(long, default_value = "density_output")]
    out: PathBuf,

    /// How a footprint must cover a cell to compete for it (default depends on mode).
    #[arg(long, value_enum)]
    coverage: Option<CoverageArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CoverageArg {
    Intersects,
    Contains,
}

impl From<CoverageArg> for CoverageTest {
    fn from(arg: CoverageArg) -> Self {
        match arg {
            CoverageArg::Intersects => CoverageTest::Intersects,
            CoverageArg::Contains => CoverageTest::Contains,
        }
    }
}

impl CommonArgs {
    fn apply(self, mut config: RunConfig) -> RunConfig {
        config.cell_size_m = self.cell_size;
        config.output_dir = self.out;
        config.coverage = self.coverage.map(CoverageTest::from);
        config
    }
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = match cli.command {
        Commands::Local {
            telemetry,
            origin,
            sensor_offset,
            common,
        } => {
            let detections = common.detections.clone();
            let mut config = common.apply(RunConfig::local(telemetry, detections));
            config.origin = origin.map(CaptureId::new);
            if let Some(offset) = sensor_offset {
                config.camera.sensor_offset_m = offset;
            }
            config
        }
        Commands::Geodetic { corners, common } => {
            let detections = common.detections.clone();
            common.apply(RunConfig::geodetic(corners, detections))
        }
        Commands::Run { config, out } => {
            let mut loaded = RunConfig::load_json(&config)
                .map_err(|e| format!("failed to read config {}: {e}", config.display()))?;
            if let Some(out) = out {
                loaded.output_dir = out;
            }
            loaded
        }
    };

    let (outcome, written) = pipeline::run(&config)?;
    let report = &outcome.report;
    let skipped = report
        .captures
        .iter()
        .filter(|c| matches!(c.status, CaptureStatus::Excluded(_)))
        .count();
    println!(
        "{} grid {}x{}: {} captures ({} skipped), {} detections binned, {} cells assigned, total density {}",
        config.mode,
        report.grid.rows,
        report.grid.cols,
        report.totals.captures,
        skipped,
        report.totals.binned,
        report.totals.assigned_cells,
        report.totals.attributed
    );
    println!(
        "wrote {} files to {}",
        written.len(),
        config.output_dir.display()
    );
    Ok(())
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) -> CliResult<()> {
    let level = survey_density::core::level_from_verbosity(cli.quiet, cli.verbose);
    survey_density::core::init_with_level(level)?;
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) -> CliResult<()> {
    let level = survey_density::core::level_from_verbosity(cli.quiet, cli.verbose);
    tracing_log::LogTracer::builder()
        .with_max_level(level)
        .init()?;
    survey_density::core::init_tracing(cli.json_logs);
    Ok(())
}
