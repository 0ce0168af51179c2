//! End-to-end run: load, align, footprint, bin, emit.
//!
//! Per-capture problems (missing telemetry, malformed lines, unprojectable
//! detections, degenerate footprints) are logged, recorded in the report
//! and do not stop the run. Configuration errors, unpaired inputs, an empty
//! extent and write failures are fatal and leave no outputs behind.

use crate::config::{ConfigError, RunConfig, RunMode};
use crate::report::{CaptureReport, CaptureStatus, GridCrs, RunReport};
use density_grid::{CaptureLayer, DensityGrid, DensityGridEngine, GridError};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use survey_density_core::{
    build_footprint, CameraModel, Capture, CaptureId, DegenerateFootprint, Footprint,
    FrameAligner, ProjectionError, ValidFootprint,
};
use survey_density_io::{
    detection_files, load_corners, load_records, load_telemetry, pair_by_capture,
    parse_geodetic_detections, parse_pixel_detections, ArtifactSet, EmitError, LoadError, REPORT,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors that abort a run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid camera parameters: {0}")]
    Camera(#[from] ProjectionError),
    #[error("origin capture `{0}` is missing or has invalid telemetry")]
    UnknownOrigin(CaptureId),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Resolved grid and its report, not yet written anywhere.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub grid: DensityGrid,
    pub report: RunReport,
}

impl RunOutcome {
    /// Every output artifact rendered in memory, report included.
    pub fn artifacts(&self) -> Result<ArtifactSet, EmitError> {
        let mut set = ArtifactSet::for_grid(&self.grid)?;
        set.push_json(REPORT, &self.report)?;
        Ok(set)
    }
}

/// Build the grid and write every artifact into the configured output
/// directory.
pub fn run(config: &RunConfig) -> Result<(RunOutcome, Vec<PathBuf>), PipelineError> {
    let outcome = build(config)?;
    let written = outcome.artifacts()?.commit(&config.output_dir)?;
    info!(
        "wrote {} artifacts to {}",
        written.len(),
        config.output_dir.display()
    );
    Ok((outcome, written))
}

/// Load inputs and resolve the density grid without touching the output
/// directory.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(config), fields(mode = %config.mode))
)]
pub fn build(config: &RunConfig) -> Result<RunOutcome, PipelineError> {
    config.validate()?;
    let (crs, layers, captures) = match config.mode {
        RunMode::Local => load_local(config)?,
        RunMode::Geodetic => load_geodetic(config)?,
    };

    let engine = DensityGridEngine::new(config.grid_params());
    let grid = engine.build(&layers)?;
    info!(
        "grid {}x{}: {} detections binned, {} cells assigned, total density {}",
        grid.rows(),
        grid.cols(),
        grid.binning().binned,
        grid.assigned_cells(),
        grid.total_density()
    );

    let report = RunReport::new(config.mode, crs, &grid, config.coverage(), captures);
    Ok(RunOutcome { grid, report })
}

type Loaded = (GridCrs, BTreeMap<CaptureId, CaptureLayer>, Vec<CaptureReport>);

fn require<'a>(
    path: &'a Option<PathBuf>,
    mode: RunMode,
    field: &'static str,
) -> Result<&'a Path, ConfigError> {
    path.as_deref()
        .ok_or(ConfigError::MissingInput { mode, field })
}

fn usable(footprint: Footprint, min_area: f64) -> Result<ValidFootprint, String> {
    footprint.validate(min_area).map_err(|e| e.to_string())
}

#[cfg_attr(feature = "tracing", instrument(level = "info", skip(config)))]
fn load_local(config: &RunConfig) -> Result<Loaded, PipelineError> {
    let telemetry_path = require(&config.telemetry_path, config.mode, "telemetry_path")?;
    let telemetry = load_telemetry(telemetry_path)?;
    let files = detection_files(&config.detections_dir)?;
    let paired = pair_by_capture(telemetry, files).map_err(LoadError::from)?;
    info!("{} captures paired with detection files", paired.len());

    let model = CameraModel::new(config.camera)?;
    let mut reports = Vec::with_capacity(paired.len());
    let mut valid = BTreeMap::new();
    for (id, (raw, path)) in paired {
        match raw.validate(&id) {
            Ok(t) => {
                valid.insert(id.clone(), (Capture::new(id, t), path));
            }
            Err(err) => {
                warn!("excluding {err}");
                reports.push(CaptureReport::new(id, CaptureStatus::Excluded(err.to_string())));
            }
        }
    }

    let origin_id = match &config.origin {
        Some(id) if valid.contains_key(id) => id.clone(),
        Some(id) => return Err(PipelineError::UnknownOrigin(id.clone())),
        None => match valid.keys().next() {
            Some(id) => id.clone(),
            None => return Err(GridError::EmptyExtent.into()),
        },
    };
    let origin = &valid[&origin_id].0;
    let aligner = FrameAligner::new(origin);
    let crs = GridCrs::LocalMeters {
        origin: origin_id.clone(),
        anchor: aligner.origin(),
    };
    info!(
        "origin {} at ({:.7}, {:.7})",
        origin_id,
        aligner.origin().lat,
        aligner.origin().lon
    );

    let min_area = config.min_footprint_area();
    let mut layers = BTreeMap::new();
    for (id, (capture, path)) in &valid {
        let parsed = load_records(path, parse_pixel_detections)?;
        let (placed, failed) = aligner.place_detections(&model, capture, &parsed.records);
        for f in &failed {
            debug!("{id}: detection {} not projected: {}", f.index, f.error);
        }
        if !failed.is_empty() {
            warn!("{id}: {} detections could not be projected", failed.len());
        }

        let offset = aligner.drone_offset(capture);
        let footprint = build_footprint(&model, capture, offset)
            .map_err(|e| DegenerateFootprint::from(e).to_string())
            .and_then(|fp| usable(fp, min_area));
        let status = match &footprint {
            Ok(_) => CaptureStatus::Used,
            Err(reason) => {
                warn!("{id}: footprint unusable, detections kept: {reason}");
                CaptureStatus::NoFootprint(reason.clone())
            }
        };

        let mut report = CaptureReport::new(id.clone(), status);
        report.detections = parsed.records.len();
        report.placed = placed.len();
        report.malformed_lines = parsed.malformed.len();
        report.unprojectable = failed.len();
        reports.push(report);

        layers.insert(
            id.clone(),
            CaptureLayer {
                footprint: footprint.ok(),
                points: placed.into_iter().map(|d| d.position).collect(),
            },
        );
    }

    reports.sort_by(|a, b| a.capture.cmp(&b.capture));
    Ok((crs, layers, reports))
}

#[cfg_attr(feature = "tracing", instrument(level = "info", skip(config)))]
fn load_geodetic(config: &RunConfig) -> Result<Loaded, PipelineError> {
    let corners_path = require(&config.corners_path, config.mode, "corners_path")?;
    let corners = load_corners(corners_path)?;
    let files = detection_files(&config.detections_dir)?;
    let paired = pair_by_capture(corners, files).map_err(LoadError::from)?;
    info!("{} captures paired with detection files", paired.len());

    let min_area = config.min_footprint_area();
    let mut reports = Vec::with_capacity(paired.len());
    let mut layers = BTreeMap::new();
    for (id, (labelled, path)) in paired {
        let parsed = load_records(&path, parse_geodetic_detections)?;
        let footprint = Footprint::from_labelled_corners(&labelled)
            .map_err(|e| e.to_string())
            .and_then(|fp| usable(fp, min_area));
        let status = match &footprint {
            Ok(_) => CaptureStatus::Used,
            Err(reason) => {
                warn!("{id}: footprint unusable, detections kept: {reason}");
                CaptureStatus::NoFootprint(reason.clone())
            }
        };

        let mut report = CaptureReport::new(id.clone(), status);
        report.detections = parsed.records.len();
        report.placed = parsed.records.len();
        report.malformed_lines = parsed.malformed.len();
        reports.push(report);

        layers.insert(
            id,
            CaptureLayer {
                footprint: footprint.ok(),
                points: parsed.records,
            },
        );
    }
    Ok((GridCrs::Wgs84, layers, reports))
}
