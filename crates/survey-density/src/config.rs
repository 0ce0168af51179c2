//! JSON run configuration.

use density_grid::{CellSize, CoverageTest, ExtentSource, GridParams};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use survey_density_core::{CameraParams, CaptureId};

#[derive(thiserror::Error, Debug)]
pub enum RunIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{mode} mode needs `{field}`")]
    MissingInput { mode: RunMode, field: &'static str },
    #[error("cell_size_m must be positive and finite, got {0}")]
    InvalidCellSize(f64),
    #[error("min_footprint_area must be non-negative and finite, got {0}")]
    InvalidMinArea(f64),
}

/// Which kind of inputs a run consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Pixel detections plus telemetry, projected into a local metric frame
    /// anchored at the origin capture.
    Local,
    /// Georeferenced detections plus surveyed image corners, gridded in
    /// longitude/latitude.
    Geodetic,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RunMode::Local => "local",
            RunMode::Geodetic => "geodetic",
        })
    }
}

fn default_cell_size_m() -> f64 {
    3.0
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("density_output")
}

/// Everything one run needs. Built once and passed by reference to every
/// stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub mode: RunMode,
    /// Directory holding one `<capture>.txt` detection file per capture.
    pub detections_dir: PathBuf,
    /// Telemetry JSON, local mode.
    #[serde(default)]
    pub telemetry_path: Option<PathBuf>,
    /// `capture label lat lon` corner list, geodetic mode.
    #[serde(default)]
    pub corners_path: Option<PathBuf>,
    /// Side of a square grid cell in meters.
    #[serde(default = "default_cell_size_m")]
    pub cell_size_m: f64,
    #[serde(default)]
    pub camera: CameraParams,
    /// Overrides the per-mode coverage test.
    #[serde(default)]
    pub coverage: Option<CoverageTest>,
    /// Capture anchoring the local frame. Defaults to the lowest capture id.
    #[serde(default)]
    pub origin: Option<CaptureId>,
    /// Footprints at or below this area are unusable. Square meters in local
    /// mode, square degrees in geodetic mode.
    #[serde(default)]
    pub min_footprint_area: Option<f64>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl RunConfig {
    /// A local-mode config with defaults for everything optional.
    pub fn local(telemetry_path: impl Into<PathBuf>, detections_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: RunMode::Local,
            detections_dir: detections_dir.into(),
            telemetry_path: Some(telemetry_path.into()),
            corners_path: None,
            cell_size_m: default_cell_size_m(),
            camera: CameraParams::default(),
            coverage: None,
            origin: None,
            min_footprint_area: None,
            output_dir: default_output_dir(),
        }
    }

    /// A geodetic-mode config with defaults for everything optional.
    pub fn geodetic(corners_path: impl Into<PathBuf>, detections_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: RunMode::Geodetic,
            telemetry_path: None,
            corners_path: Some(corners_path.into()),
            ..Self::local(PathBuf::new(), detections_dir)
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RunIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RunIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.mode {
            RunMode::Local if self.telemetry_path.is_none() => {
                return Err(ConfigError::MissingInput {
                    mode: self.mode,
                    field: "telemetry_path",
                })
            }
            RunMode::Geodetic if self.corners_path.is_none() => {
                return Err(ConfigError::MissingInput {
                    mode: self.mode,
                    field: "corners_path",
                })
            }
            _ => {}
        }
        if !self.cell_size_m.is_finite() || self.cell_size_m <= 0.0 {
            return Err(ConfigError::InvalidCellSize(self.cell_size_m));
        }
        if let Some(area) = self.min_footprint_area {
            if !area.is_finite() || area < 0.0 {
                return Err(ConfigError::InvalidMinArea(area));
            }
        }
        Ok(())
    }

    /// Local runs intersect footprints with cells; geodetic runs require
    /// full containment.
    pub fn coverage(&self) -> CoverageTest {
        self.coverage.unwrap_or(match self.mode {
            RunMode::Local => CoverageTest::Intersects,
            RunMode::Geodetic => CoverageTest::Contains,
        })
    }

    pub fn min_footprint_area(&self) -> f64 {
        self.min_footprint_area.unwrap_or(match self.mode {
            RunMode::Local => 1e-6,
            RunMode::Geodetic => 1e-14,
        })
    }

    pub fn grid_params(&self) -> GridParams {
        match self.mode {
            RunMode::Local => GridParams {
                cell_size: CellSize::Frame {
                    side: self.cell_size_m,
                },
                coverage: self.coverage(),
                extent: ExtentSource::Detections,
            },
            RunMode::Geodetic => GridParams {
                cell_size: CellSize::GeodeticMeters {
                    meters: self.cell_size_m,
                },
                coverage: self.coverage(),
                extent: ExtentSource::Footprints,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_gets_defaults() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{ "mode": "local", "detections_dir": "labels", "telemetry_path": "t.json",
                 "camera": { "sensor_offset_m": 0.4 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.cell_size_m, 3.0);
        assert_eq!(cfg.camera.sensor_offset_m, 0.4);
        assert_eq!(cfg.camera.fov_vertical_deg, 55.072);
        assert_eq!(cfg.coverage(), CoverageTest::Intersects);
        assert_eq!(cfg.output_dir, PathBuf::from("density_output"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn coverage_defaults_follow_mode() {
        let cfg = RunConfig::geodetic("corners.txt", "labels");
        assert_eq!(cfg.coverage(), CoverageTest::Contains);
        assert_eq!(cfg.grid_params().extent, ExtentSource::Footprints);

        let cfg = RunConfig {
            coverage: Some(CoverageTest::Intersects),
            ..cfg
        };
        assert_eq!(cfg.coverage(), CoverageTest::Intersects);
    }

    #[test]
    fn validation_names_missing_inputs() {
        let mut cfg = RunConfig::local("t.json", "labels");
        cfg.telemetry_path = None;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::MissingInput {
                mode: RunMode::Local,
                field: "telemetry_path"
            })
        );

        let cfg = RunConfig {
            cell_size_m: 0.0,
            ..RunConfig::local("t.json", "labels")
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidCellSize(0.0)));
    }

    #[test]
    fn json_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let cfg = RunConfig {
            origin: Some(CaptureId::new("DJI_0004")),
            ..RunConfig::local("t.json", "labels")
        };
        cfg.write_json(&path).unwrap();
        assert_eq!(RunConfig::load_json(&path).unwrap(), cfg);
    }
}
