//! Cell boundaries along the two grid axes.

use crate::error::GridError;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use survey_density_core::GroundBox;

/// Upper bound on `rows * cols` (2048 x 2048), guards against a cell size
/// typed in the wrong unit. Survey grids span a few hundred cells per axis.
pub const MAX_CELLS: usize = 1 << 22;

/// Evenly spaced boundaries between two extent edges.
///
/// Holds `cells + 1` edges. The first and last edge are the extent bounds
/// themselves, so rounding never leaves a sliver uncovered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    edges: Vec<f64>,
}

impl Axis {
    fn spaced(from: f64, to: f64, cells: usize) -> Self {
        let step = (to - from) / cells as f64;
        let mut edges: Vec<f64> = (0..cells).map(|i| from + step * i as f64).collect();
        edges.push(to);
        Self { edges }
    }

    /// Boundaries from `lo` up to `hi`.
    pub fn ascending(lo: f64, hi: f64, cells: usize) -> Self {
        Self::spaced(lo, hi, cells.max(1))
    }

    /// Boundaries from `hi` down to `lo`.
    pub fn descending(hi: f64, lo: f64, cells: usize) -> Self {
        Self::spaced(hi, lo, cells.max(1))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    fn is_descending(&self) -> bool {
        self.edges[0] > self.edges[self.len()]
    }

    /// `(min, max)` of cell `i`.
    pub fn span(&self, i: usize) -> (f64, f64) {
        let (a, b) = (self.edges[i], self.edges[i + 1]);
        (a.min(b), a.max(b))
    }

    /// Index of the cell holding `v`.
    ///
    /// Every cell owns the edge it starts from; the last cell also owns the
    /// closing edge. A value on a shared boundary therefore lands in exactly
    /// one cell.
    pub fn locate(&self, v: f64) -> Option<usize> {
        let n = self.len();
        let (first, last) = (self.edges[0], self.edges[n]);
        let starts = &self.edges[..n];
        let before = if self.is_descending() {
            if !(v <= first && v >= last) {
                return None;
            }
            starts.partition_point(|&e| e >= v)
        } else {
            if !(v >= first && v <= last) {
                return None;
            }
            starts.partition_point(|&e| e <= v)
        };
        Some(before.saturating_sub(1))
    }
}

/// Row and column boundaries covering one extent.
///
/// Rows run north to south (row 0 is the northern edge, matching raster
/// layout); columns run west to east.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridAxes {
    extent: GroundBox,
    side_x: f64,
    side_y: f64,
    rows: Axis,
    cols: Axis,
}

fn cell_count(span: f64, side: f64) -> usize {
    let n = (span / side).ceil();
    if n >= 1.0 {
        n as usize
    } else {
        1
    }
}

impl GridAxes {
    /// Tile `extent` with cells of nominal size `side_x` by `side_y`.
    ///
    /// Each axis gets `max(1, ceil(span / side))` cells spread evenly over
    /// the span, so actual cells may be slightly smaller than nominal.
    pub fn from_extent(extent: GroundBox, side_x: f64, side_y: f64) -> Result<Self, GridError> {
        for side in [side_x, side_y] {
            if !side.is_finite() || side <= 0.0 {
                return Err(GridError::InvalidCellSize { side });
            }
        }
        let bounds = [extent.west, extent.south, extent.east, extent.north];
        if bounds.iter().any(|v| !v.is_finite()) || extent.width() < 0.0 || extent.height() < 0.0
        {
            return Err(GridError::NonFiniteExtent);
        }

        let n_rows = cell_count(extent.height(), side_y);
        let n_cols = cell_count(extent.width(), side_x);
        if n_rows.saturating_mul(n_cols) > MAX_CELLS {
            return Err(GridError::TooManyCells {
                rows: n_rows,
                cols: n_cols,
                max: MAX_CELLS,
            });
        }

        Ok(Self {
            extent,
            side_x,
            side_y,
            rows: Axis::descending(extent.north, extent.south, n_rows),
            cols: Axis::ascending(extent.west, extent.east, n_cols),
        })
    }

    #[inline]
    pub fn extent(&self) -> GroundBox {
        self.extent
    }

    /// Nominal `(side_x, side_y)` requested for the grid.
    #[inline]
    pub fn nominal_cell(&self) -> (f64, f64) {
        (self.side_x, self.side_y)
    }

    #[inline]
    pub fn rows(&self) -> &Axis {
        &self.rows
    }

    #[inline]
    pub fn cols(&self) -> &Axis {
        &self.cols
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn num_cols(&self) -> usize {
        self.cols.len()
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.num_rows() * self.num_cols()
    }

    /// Row-major index of `(row, col)`.
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.num_cols() + col
    }

    /// Bounds of one cell.
    pub fn cell_box(&self, row: usize, col: usize) -> GroundBox {
        let (south, north) = self.rows.span(row);
        let (west, east) = self.cols.span(col);
        GroundBox::new(west, south, east, north)
    }

    /// `(row, col)` of the single cell holding `p`, `None` outside the extent.
    pub fn locate(&self, p: Point2<f64>) -> Option<(usize, usize)> {
        Some((self.rows.locate(p.y)?, self.cols.locate(p.x)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_round_up_and_never_drop_to_zero() {
        let axes = GridAxes::from_extent(GroundBox::new(0.0, 0.0, 10.0, 3.05), 3.0, 3.0).unwrap();
        assert_eq!(axes.num_cols(), 4);
        assert_eq!(axes.num_rows(), 2);

        let point = GroundBox::new(5.0, 5.0, 5.0, 5.0);
        let axes = GridAxes::from_extent(point, 3.0, 3.0).unwrap();
        assert_eq!((axes.num_rows(), axes.num_cols()), (1, 1));
    }

    #[test]
    fn edges_end_exactly_on_the_extent() {
        let extent = GroundBox::new(-1.3, 2.1, 7.7, 9.9);
        let axes = GridAxes::from_extent(extent, 0.7, 0.3).unwrap();
        let cols = axes.cols().edges();
        let rows = axes.rows().edges();
        assert_eq!(cols[0], extent.west);
        assert_eq!(*cols.last().unwrap(), extent.east);
        assert_eq!(rows[0], extent.north);
        assert_eq!(*rows.last().unwrap(), extent.south);
        assert!(cols.windows(2).all(|w| w[0] < w[1]));
        assert!(rows.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn cells_tile_the_extent() {
        let extent = GroundBox::new(0.0, 0.0, 10.0, 7.0);
        let axes = GridAxes::from_extent(extent, 3.0, 3.0).unwrap();
        let mut area = 0.0;
        for r in 0..axes.num_rows() {
            for c in 0..axes.num_cols() {
                let b = axes.cell_box(r, c);
                area += b.width() * b.height();
                if c + 1 < axes.num_cols() {
                    assert_eq!(b.east, axes.cell_box(r, c + 1).west);
                }
                if r + 1 < axes.num_rows() {
                    assert_eq!(b.south, axes.cell_box(r + 1, c).north);
                }
            }
        }
        assert!((area - 70.0).abs() < 1e-9);
        assert_eq!(axes.cell_box(0, 0).north, 7.0);
    }

    #[test]
    fn boundary_points_land_in_one_cell() {
        let axes = GridAxes::from_extent(GroundBox::new(0.0, 0.0, 6.0, 6.0), 3.0, 3.0).unwrap();
        // Shared edges belong to the cell they start: rows start at their
        // northern edge, columns at their western edge.
        assert_eq!(axes.locate(Point2::new(3.0, 3.0)), Some((1, 1)));
        assert_eq!(axes.locate(Point2::new(2.9, 3.1)), Some((0, 0)));
        // Outer edges stay inside.
        assert_eq!(axes.locate(Point2::new(6.0, 0.0)), Some((1, 1)));
        assert_eq!(axes.locate(Point2::new(0.0, 6.0)), Some((0, 0)));
        assert_eq!(axes.locate(Point2::new(6.01, 1.0)), None);
        assert_eq!(axes.locate(Point2::new(1.0, f64::NAN)), None);
    }

    #[test]
    fn rejects_bad_cell_sizes() {
        let extent = GroundBox::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(
            GridAxes::from_extent(extent, 0.0, 1.0),
            Err(GridError::InvalidCellSize { side: 0.0 })
        );
        assert!(matches!(
            GridAxes::from_extent(GroundBox::new(0.0, 0.0, 1e6, 1e6), 1e-3, 1e-3),
            Err(GridError::TooManyCells { .. })
        ));
    }

    #[test]
    fn cell_budget_stops_at_2048_squared() {
        let axes = GridAxes::from_extent(GroundBox::new(0.0, 0.0, 2048.0, 2048.0), 1.0, 1.0)
            .unwrap();
        assert_eq!(axes.num_cells(), MAX_CELLS);

        assert_eq!(
            GridAxes::from_extent(GroundBox::new(0.0, 0.0, 2049.0, 2048.0), 1.0, 1.0),
            Err(GridError::TooManyCells {
                rows: 2048,
                cols: 2049,
                max: MAX_CELLS,
            })
        );
    }
}
