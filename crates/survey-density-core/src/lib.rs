//! Geometry core for turning per-image aerial detections into ground
//! positions.
//!
//! This crate is purely geometric and has no file I/O:
//! - [`CameraModel`] projects a pixel through a gimballed camera onto flat
//!   ground,
//! - [`FrameAligner`] places every capture in one frame anchored at an
//!   origin capture,
//! - [`build_footprint`] projects the image corners into a ground
//!   quadrilateral, validated into a [`ValidFootprint`] before use.

mod camera;
mod capture;
mod footprint;
mod frame;
mod logger;
pub mod polygon;

pub use camera::{
    CameraModel, CameraParams, CameraPose, ImageSize, ProjectionError, DEFAULT_FOV_HORIZONTAL_DEG,
    DEFAULT_FOV_VERTICAL_DEG, DEFAULT_MAX_OFF_NADIR_DEG,
};
pub use capture::{
    Capture, CaptureId, Detection, RawTelemetry, Telemetry, TelemetryError, TelemetryField,
};
pub use footprint::{
    build_footprint, DegenerateFootprint, Footprint, FootprintCorner, ValidFootprint,
};
pub use frame::{
    local_displacement, meters_to_degrees, rotate_by_flight_yaw, FrameAligner, GeoPoint,
    GroundDetection, ProjectionFailure, EARTH_RADIUS_M, EQUATORIAL_CIRCUMFERENCE_M,
    METERS_PER_DEGREE_LAT,
};
pub use polygon::GroundBox;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
