//! File boundary of the survey density pipeline.
//!
//! Loaders turn telemetry JSON, detection text files and surveyed corner
//! lists into core types keyed by [`CaptureId`](survey_density_core::CaptureId).
//! Writers render a resolved [`DensityGrid`](density_grid::DensityGrid) into
//! 16-bit TIFF rasters with world files, a legend and an assignment list,
//! and commit them as one set.

mod artifacts;
mod corners;
mod detections;
mod error;
mod pairing;
mod raster;
mod telemetry;

pub use artifacts::{
    assignment_text, legend_text, Artifact, ArtifactSet, ASSIGNMENTS, DENSITY_RASTER,
    DENSITY_WORLD_FILE, LEGEND, OWNERSHIP_RASTER, OWNERSHIP_WORLD_FILE, REPORT,
};
pub use corners::{load_corners, parse_corners, CornerMap};
pub use detections::{
    detection_files, load_records, parse_geodetic_detections, parse_pixel_detections,
    MalformedDetectionRecord, ParsedRecords, DETECTION_EXTENSION,
};
pub use error::{EmitError, LoadError, PairingMismatch};
pub use pairing::pair_by_capture;
pub use raster::{density_tiff, ownership_tiff, WorldFile};
pub use telemetry::{load_telemetry, parse_telemetry, AltitudeValue, TelemetryRecord};
