//! Binning and single-owner cell resolution.
//!
//! Every detection is binned into exactly one cell. A cell then takes its
//! density from one capture only: among the captures whose footprint covers
//! the cell, the one with the most detections in it. Captures are visited in
//! ascending [`CaptureId`] order and only a strictly larger count replaces
//! the current best, so the lowest id wins ties. Counts are never summed
//! across captures, which keeps overlapping images from double counting.

use crate::axes::GridAxes;
use crate::error::GridError;
use crate::grid::{CellOwner, DensityGrid, GridCell};
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use survey_density_core::{meters_to_degrees, CaptureId, GroundBox, ValidFootprint};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// How a footprint must relate to a cell box for its capture to compete.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageTest {
    /// Footprint and cell share at least one point.
    #[default]
    Intersects,
    /// Cell lies entirely inside the footprint.
    Contains,
}

impl CoverageTest {
    pub fn covers(self, footprint: &ValidFootprint, cell: &GroundBox) -> bool {
        match self {
            CoverageTest::Intersects => footprint.intersects_box(cell),
            CoverageTest::Contains => footprint.contains_box(cell),
        }
    }
}

/// What the grid extent is derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtentSource {
    /// Bounding box of every binned detection.
    Detections,
    /// Bounding box of every usable footprint corner.
    Footprints,
}

/// Nominal cell size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum CellSize {
    /// Square cells measured in ground-frame units.
    Frame { side: f64 },
    /// Square cells of `meters` on a lon/lat frame, converted to degrees at
    /// the extent's center latitude.
    GeodeticMeters { meters: f64 },
}

impl CellSize {
    /// `(side_x, side_y)` in frame units for the given extent.
    pub fn sides(self, extent: &GroundBox) -> (f64, f64) {
        match self {
            CellSize::Frame { side } => (side, side),
            CellSize::GeodeticMeters { meters } => {
                let center_lat = (extent.south + extent.north) / 2.0;
                let (lat_step, lon_step) = meters_to_degrees(meters, center_lat);
                (lon_step, lat_step)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    pub cell_size: CellSize,
    pub coverage: CoverageTest,
    pub extent: ExtentSource,
}

/// Everything the engine knows about one capture.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CaptureLayer {
    /// `None` when the footprint was degenerate; such a capture never owns
    /// cells but its detections still count toward the extent.
    pub footprint: Option<ValidFootprint>,
    pub points: Vec<Point2<f64>>,
}

/// How many points made it into the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BinningSummary {
    pub binned: usize,
    pub outside_extent: usize,
}

struct Candidate<'a> {
    id: &'a CaptureId,
    footprint: &'a ValidFootprint,
    reach: GroundBox,
    counts: HashMap<usize, u32>,
}

pub struct DensityGridEngine {
    params: GridParams,
}

impl DensityGridEngine {
    pub fn new(params: GridParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &GridParams {
        &self.params
    }

    /// Bounding box the grid will cover.
    pub fn extent(&self, layers: &BTreeMap<CaptureId, CaptureLayer>) -> Result<GroundBox, GridError> {
        let extent = match self.params.extent {
            ExtentSource::Detections => {
                GroundBox::enclosing(layers.values().flat_map(|l| l.points.iter()))
            }
            ExtentSource::Footprints => GroundBox::enclosing(
                layers
                    .values()
                    .filter_map(|l| l.footprint.as_ref())
                    .flat_map(|f| f.ring().iter()),
            ),
        };
        extent.ok_or(GridError::EmptyExtent)
    }

    /// Derive the extent and axes, then resolve every cell.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, layers), fields(captures = layers.len()))
    )]
    pub fn build(&self, layers: &BTreeMap<CaptureId, CaptureLayer>) -> Result<DensityGrid, GridError> {
        let extent = self.extent(layers)?;
        let (side_x, side_y) = self.params.cell_size.sides(&extent);
        let axes = GridAxes::from_extent(extent, side_x, side_y)?;
        debug!(
            "grid {}x{} cells of {:.6}x{:.6} over [{:.6}, {:.6}]-[{:.6}, {:.6}]",
            axes.num_rows(),
            axes.num_cols(),
            side_x,
            side_y,
            extent.west,
            extent.south,
            extent.east,
            extent.north
        );
        Ok(self.resolve(axes, layers))
    }

    /// Bin detections and pick one owner per cell on fixed axes.
    pub fn resolve(&self, axes: GridAxes, layers: &BTreeMap<CaptureId, CaptureLayer>) -> DensityGrid {
        let mut summary = BinningSummary::default();
        let candidates = candidates(&axes, layers, &mut summary);
        if summary.outside_extent > 0 {
            debug!(
                "{} detections fall outside the grid extent",
                summary.outside_extent
            );
        }

        let cols = axes.num_cols();
        let mut cells = blank_cells(&axes);

        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            cells
                .par_chunks_mut(cols)
                .for_each(|row| self.resolve_row(&axes, &candidates, row));
        }
        #[cfg(not(feature = "rayon"))]
        for row in cells.chunks_mut(cols) {
            self.resolve_row(&axes, &candidates, row);
        }

        DensityGrid::from_cells(axes, cells, summary)
    }

    fn resolve_row(&self, axes: &GridAxes, candidates: &[Candidate<'_>], row: &mut [GridCell]) {
        let coverage = self.params.coverage;
        for cell in row {
            let index = axes.index(cell.row, cell.col);
            let mut best: Option<(&CaptureId, u32)> = None;
            for cand in candidates {
                let count = cand.counts.get(&index).copied().unwrap_or(0);
                if count <= best.map_or(0, |(_, n)| n) {
                    continue;
                }
                if cand.reach.overlaps(&cell.bounds) && coverage.covers(cand.footprint, &cell.bounds)
                {
                    best = Some((cand.id, count));
                }
            }
            if let Some((id, count)) = best {
                cell.density = count;
                cell.owner = CellOwner::Capture(id.clone());
            }
        }
    }
}

/// Bin every layer and keep the captures that can own cells.
fn candidates<'a>(
    axes: &GridAxes,
    layers: &'a BTreeMap<CaptureId, CaptureLayer>,
    summary: &mut BinningSummary,
) -> Vec<Candidate<'a>> {
    let mut out = Vec::new();
    for (id, layer) in layers {
        let counts = bin_points(axes, &layer.points, summary);
        let Some(footprint) = layer.footprint.as_ref() else {
            continue;
        };
        if counts.is_empty() {
            continue;
        }
        out.push(Candidate {
            id,
            footprint,
            reach: footprint.footprint().bounds(),
            counts,
        });
    }
    out
}

fn blank_cells(axes: &GridAxes) -> Vec<GridCell> {
    let cols = axes.num_cols();
    (0..axes.num_rows())
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .map(|(row, col)| GridCell::empty(axes, row, col))
        .collect()
}

fn bin_points(
    axes: &GridAxes,
    points: &[Point2<f64>],
    summary: &mut BinningSummary,
) -> HashMap<usize, u32> {
    let mut counts = HashMap::new();
    for p in points {
        match axes.locate(*p) {
            Some((row, col)) => {
                *counts.entry(axes.index(row, col)).or_insert(0) += 1;
                summary.binned += 1;
            }
            None => summary.outside_extent += 1,
        }
    }
    counts
}
