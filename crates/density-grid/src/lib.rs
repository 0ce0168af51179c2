//! Fixed-size density grid over a survey extent.
//!
//! The grid tiles the bounding box of the inputs with evenly spaced cells
//! (row 0 north, column 0 west). Detections are binned per capture and each
//! cell keeps the count of exactly one covering capture, see
//! [`DensityGridEngine`].
//!
//! ```
//! use density_grid::{CaptureLayer, CellSize, CoverageTest, DensityGridEngine, ExtentSource, GridParams};
//! use nalgebra::Point2;
//! use std::collections::BTreeMap;
//! use survey_density_core::{CaptureId, Footprint};
//!
//! let footprint = Footprint::new([
//!     Point2::new(0.0, 6.0),
//!     Point2::new(6.0, 6.0),
//!     Point2::new(6.0, 0.0),
//!     Point2::new(0.0, 0.0),
//! ])
//! .validate(1e-9)
//! .ok();
//! let mut layers = BTreeMap::new();
//! layers.insert(
//!     CaptureId::new("DJI_0001"),
//!     CaptureLayer { footprint, points: vec![Point2::new(1.0, 1.0), Point2::new(5.0, 5.0)] },
//! );
//!
//! let engine = DensityGridEngine::new(GridParams {
//!     cell_size: CellSize::Frame { side: 3.0 },
//!     coverage: CoverageTest::Intersects,
//!     extent: ExtentSource::Footprints,
//! });
//! let grid = engine.build(&layers).unwrap();
//! assert_eq!((grid.rows(), grid.cols()), (2, 2));
//! assert_eq!(grid.total_density(), 2);
//! ```

mod axes;
mod engine;
mod error;
mod grid;

pub use axes::{Axis, GridAxes, MAX_CELLS};
pub use engine::{
    BinningSummary, CaptureLayer, CellSize, CoverageTest, DensityGridEngine, ExtentSource,
    GridParams,
};
pub use error::GridError;
pub use grid::{CellOwner, DensityGrid, GridCell, OwnerLegend};
