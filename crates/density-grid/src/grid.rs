//! Resolved density grid.

use crate::axes::GridAxes;
use crate::engine::BinningSummary;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use survey_density_core::{CaptureId, GroundBox};

/// Which capture a cell's density was taken from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellOwner {
    #[default]
    Unassigned,
    Capture(CaptureId),
}

impl CellOwner {
    pub fn capture(&self) -> Option<&CaptureId> {
        match self {
            CellOwner::Capture(id) => Some(id),
            CellOwner::Unassigned => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    pub bounds: GroundBox,
    /// Detections of the owner inside this cell.
    pub density: u32,
    pub owner: CellOwner,
}

impl GridCell {
    pub(crate) fn empty(axes: &GridAxes, row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            bounds: axes.cell_box(row, col),
            density: 0,
            owner: CellOwner::Unassigned,
        }
    }
}

/// Dense 1-based numbering of the captures that own at least one cell.
///
/// Index `0` is reserved for unassigned cells.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OwnerLegend {
    entries: Vec<CaptureId>,
}

impl OwnerLegend {
    /// `(index, capture)` pairs in ascending capture order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &CaptureId)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, id)| (i as u32 + 1, id))
    }

    pub fn index_of(&self, owner: &CellOwner) -> u32 {
        owner
            .capture()
            .and_then(|id| self.entries.binary_search(id).ok())
            .map_or(0, |i| i as u32 + 1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fixed-size, row-major grid of resolved cells. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DensityGrid {
    axes: GridAxes,
    cells: Vec<GridCell>,
    binning: BinningSummary,
}

impl DensityGrid {
    pub(crate) fn from_cells(axes: GridAxes, cells: Vec<GridCell>, binning: BinningSummary) -> Self {
        debug_assert_eq!(cells.len(), axes.num_cells());
        Self {
            axes,
            cells,
            binning,
        }
    }

    #[inline]
    pub fn axes(&self) -> &GridAxes {
        &self.axes
    }

    #[inline]
    pub fn binning(&self) -> BinningSummary {
        self.binning
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.axes.num_rows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.axes.num_cols()
    }

    #[inline]
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&GridCell> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        self.cells.get(self.axes.index(row, col))
    }

    /// Cells of one row, west to east. `None` past the last row.
    pub fn row(&self, row: usize) -> Option<&[GridCell]> {
        if row >= self.rows() {
            return None;
        }
        let cols = self.cols();
        self.cells.get(row * cols..(row + 1) * cols)
    }

    pub fn total_density(&self) -> u64 {
        self.cells.iter().map(|c| u64::from(c.density)).sum()
    }

    pub fn max_density(&self) -> u32 {
        self.cells.iter().map(|c| c.density).max().unwrap_or(0)
    }

    pub fn assigned_cells(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.owner != CellOwner::Unassigned)
            .count()
    }

    /// Density attributed to each owning capture.
    pub fn attributed(&self) -> BTreeMap<CaptureId, u64> {
        let mut totals = BTreeMap::new();
        for cell in &self.cells {
            if let Some(id) = cell.owner.capture() {
                *totals.entry(id.clone()).or_insert(0) += u64::from(cell.density);
            }
        }
        totals
    }

    pub fn owner_legend(&self) -> OwnerLegend {
        let owners: BTreeSet<&CaptureId> =
            self.cells.iter().filter_map(|c| c.owner.capture()).collect();
        OwnerLegend {
            entries: owners.into_iter().cloned().collect(),
        }
    }
}
