//! JSON summary of a run.

use crate::config::{RunIoError, RunMode};
use density_grid::{CoverageTest, DensityGrid};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use survey_density_core::{CaptureId, GeoPoint, GroundBox};

/// Coordinate system of the grid axes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridCrs {
    /// East/north meters from the origin capture's GPS fix.
    LocalMeters { origin: CaptureId, anchor: GeoPoint },
    /// Longitude/latitude degrees on WGS 84.
    Wgs84,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSummary {
    pub rows: usize,
    pub cols: usize,
    pub extent: GroundBox,
    pub nominal_cell: [f64; 2],
    pub coverage: CoverageTest,
}

impl GridSummary {
    pub fn of(grid: &DensityGrid, coverage: CoverageTest) -> Self {
        let (sx, sy) = grid.axes().nominal_cell();
        Self {
            rows: grid.rows(),
            cols: grid.cols(),
            extent: grid.axes().extent(),
            nominal_cell: [sx, sy],
            coverage,
        }
    }
}

/// How a capture took part in the run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CaptureStatus {
    /// Detections binned and footprint usable for ownership.
    Used,
    /// Detections binned but the footprint could not be used.
    NoFootprint(String),
    /// Left out entirely.
    Excluded(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureReport {
    pub capture: CaptureId,
    pub status: CaptureStatus,
    /// Well-formed detection records read.
    pub detections: usize,
    /// Detections placed on the ground.
    pub placed: usize,
    pub malformed_lines: usize,
    pub unprojectable: usize,
    /// Density the grid attributes to this capture.
    pub attributed: u64,
}

impl CaptureReport {
    pub fn new(capture: CaptureId, status: CaptureStatus) -> Self {
        Self {
            capture,
            status,
            detections: 0,
            placed: 0,
            malformed_lines: 0,
            unprojectable: 0,
            attributed: 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub captures: usize,
    pub usable_footprints: usize,
    pub detections: usize,
    pub binned: usize,
    pub outside_extent: usize,
    pub attributed: u64,
    pub assigned_cells: usize,
    pub max_density: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub crs: GridCrs,
    pub grid: GridSummary,
    pub captures: Vec<CaptureReport>,
    pub totals: RunTotals,
}

impl RunReport {
    /// Assemble the report once the grid is resolved. Attributed counts are
    /// filled in from the grid.
    pub fn new(
        mode: RunMode,
        crs: GridCrs,
        grid: &DensityGrid,
        coverage: CoverageTest,
        mut captures: Vec<CaptureReport>,
    ) -> Self {
        let attributed = grid.attributed();
        for c in &mut captures {
            c.attributed = attributed.get(&c.capture).copied().unwrap_or(0);
        }
        let binning = grid.binning();
        let totals = RunTotals {
            captures: captures.len(),
            usable_footprints: captures
                .iter()
                .filter(|c| c.status == CaptureStatus::Used)
                .count(),
            detections: captures.iter().map(|c| c.placed).sum(),
            binned: binning.binned,
            outside_extent: binning.outside_extent,
            attributed: grid.total_density(),
            assigned_cells: grid.assigned_cells(),
            max_density: grid.max_density(),
        };
        Self {
            mode,
            crs,
            grid: GridSummary::of(grid, coverage),
            captures,
            totals,
        }
    }

    pub fn capture(&self, id: &CaptureId) -> Option<&CaptureReport> {
        self.captures.iter().find(|c| &c.capture == id)
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RunIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RunIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
