//! Detection density maps from overlapping aerial survey captures.
//!
//! This crate ties the workspace together:
//! - re-exports of the geometry core, the grid engine and the loaders,
//! - [`RunConfig`], the JSON run configuration,
//! - [`pipeline::run`], which loads one survey, resolves the grid and
//!   writes every artifact or none of them,
//! - [`RunReport`], the per-capture summary written next to the rasters.
//!
//! ## Quickstart
//!
//! ```no_run
//! use survey_density::{pipeline, RunConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = RunConfig::local("flight/telemetry.json", "flight/labels");
//! config.cell_size_m = 5.0;
//! config.output_dir = "flight/density".into();
//!
//! let (outcome, written) = pipeline::run(&config)?;
//! println!(
//!     "{}x{} grid, total density {}, {} files",
//!     outcome.grid.rows(),
//!     outcome.grid.cols(),
//!     outcome.grid.total_density(),
//!     written.len()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `survey_density::core`: camera model, frame alignment, footprints.
//! - `survey_density::grid`: axes, binning and ownership resolution.
//! - `survey_density::io`: telemetry/detection/corner loaders and emitters.
//! - [`config`], [`pipeline`], [`report`]: the end-to-end run.

pub use density_grid as grid;
pub use survey_density_core as core;
pub use survey_density_io as io;

pub mod config;
pub mod pipeline;
pub mod report;

pub use config::{ConfigError, RunConfig, RunIoError, RunMode};
pub use pipeline::{build, run, PipelineError, RunOutcome};
pub use report::{CaptureReport, CaptureStatus, GridCrs, RunReport};
