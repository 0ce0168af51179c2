//! Alignment of captures into one shared 2D frame.
//!
//! Every capture's GPS fix is turned into a flat-earth displacement from the
//! origin capture, rotated by the capture's flight yaw, and then combined
//! with camera-frame ground offsets to give absolute positions.

use crate::camera::{CameraModel, ProjectionError};
use crate::capture::{Capture, CaptureId, Detection};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for the flat-earth approximation, meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geodetic position in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// East/north displacement in meters from `origin` to `p`, valid over the
/// few hundred meters a survey spans.
pub fn local_displacement(origin: GeoPoint, p: GeoPoint) -> Vector2<f64> {
    let d_lat = (p.lat - origin.lat).to_radians();
    let d_lon = (p.lon - origin.lon).to_radians();
    Vector2::new(
        EARTH_RADIUS_M * origin.lat.to_radians().cos() * d_lon,
        EARTH_RADIUS_M * d_lat,
    )
}

/// Meters per degree of latitude used when sizing geodetic grid cells.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;
/// Equatorial circumference used when sizing geodetic grid cells, meters.
pub const EQUATORIAL_CIRCUMFERENCE_M: f64 = 40_075_000.0;

/// Size of a `meters` square in degrees at `latitude_deg`, as
/// `(lat_step, lon_step)`.
pub fn meters_to_degrees(meters: f64, latitude_deg: f64) -> (f64, f64) {
    let lon_meters_per_degree = EQUATORIAL_CIRCUMFERENCE_M * latitude_deg.to_radians().cos() / 360.0;
    (meters / METERS_PER_DEGREE_LAT, meters / lon_meters_per_degree)
}

/// Rotate a displacement into the shared frame using the platform yaw
/// convention `yaw_rad = 90° - flight_yaw`.
pub fn rotate_by_flight_yaw(d: Vector2<f64>, flight_yaw_deg: f64) -> Vector2<f64> {
    let yaw = (90.0 - flight_yaw_deg).to_radians();
    let (s, c) = yaw.sin_cos();
    Vector2::new(d.x * s - d.y * c, d.x * c + d.y * s)
}

/// Position of one projected detection in the shared frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundDetection {
    /// Index of the detection within its capture's record list.
    pub index: usize,
    pub position: Point2<f64>,
}

/// Detection that could not be projected.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionFailure {
    pub index: usize,
    pub error: ProjectionError,
}

/// Aligns captures against a fixed origin capture.
#[derive(Clone, Debug)]
pub struct FrameAligner {
    origin_id: CaptureId,
    origin: GeoPoint,
}

impl FrameAligner {
    pub fn new(origin: &Capture) -> Self {
        Self {
            origin_id: origin.id.clone(),
            origin: origin.telemetry.gps,
        }
    }

    #[inline]
    pub fn origin_id(&self) -> &CaptureId {
        &self.origin_id
    }

    #[inline]
    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    /// Offset of the capture's platform position in the shared frame.
    ///
    /// The origin capture maps to exactly `(0, 0)`.
    pub fn drone_offset(&self, capture: &Capture) -> Vector2<f64> {
        if capture.id == self.origin_id {
            return Vector2::zeros();
        }
        let d = local_displacement(self.origin, capture.telemetry.gps);
        rotate_by_flight_yaw(d, capture.telemetry.flight_yaw_deg)
    }

    /// Project every detection of `capture` and place it in the shared frame.
    ///
    /// Detections whose ray does not meet the ground are returned separately
    /// so the caller can report them; the remaining ones keep their record
    /// index.
    pub fn place_detections(
        &self,
        model: &CameraModel,
        capture: &Capture,
        detections: &[Detection],
    ) -> (Vec<GroundDetection>, Vec<ProjectionFailure>) {
        let offset = self.drone_offset(capture);
        let size = capture.size();
        let pose = capture.pose();

        let mut placed = Vec::with_capacity(detections.len());
        let mut failed = Vec::new();
        for (index, det) in detections.iter().enumerate() {
            match model.project(det.centered_pixel(size), size, pose) {
                Ok(ground) => placed.push(GroundDetection {
                    index,
                    position: Point2::from(offset + ground),
                }),
                Err(error) => failed.push(ProjectionFailure { index, error }),
            }
        }
        (placed, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraParams, ImageSize};
    use crate::capture::Telemetry;
    use approx::assert_relative_eq;

    fn capture(id: &str, lat: f64, lon: f64, yaw: f64) -> Capture {
        Capture::new(
            CaptureId::new(id),
            Telemetry {
                gps: GeoPoint::new(lat, lon),
                relative_altitude_m: 3.0,
                gimbal_pitch_deg: -60.0,
                flight_yaw_deg: yaw,
                size: ImageSize::new(5280, 3956),
            },
        )
    }

    fn center_detection() -> Detection {
        Detection {
            class_index: 0,
            corners: [
                Point2::new(0.49, 0.49),
                Point2::new(0.51, 0.49),
                Point2::new(0.51, 0.51),
                Point2::new(0.49, 0.51),
            ],
        }
    }

    /// Latitude step that moves a point `meters` north.
    fn north(meters: f64) -> f64 {
        (meters / EARTH_RADIUS_M).to_degrees()
    }

    #[test]
    fn origin_capture_sits_at_zero() {
        let origin = capture("a", 45.0, -93.0, 37.0);
        let aligner = FrameAligner::new(&origin);
        let d = aligner.drone_offset(&origin);
        assert_eq!(d, Vector2::zeros());
    }

    #[test]
    fn displacement_is_east_north() {
        let o = GeoPoint::new(45.0, -93.0);
        let d = local_displacement(o, GeoPoint::new(45.0 + north(10.0), -93.0));
        assert_relative_eq!(d.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(d.y, 10.0, epsilon = 1e-9);

        let d = local_displacement(o, GeoPoint::new(45.0, -93.0 + 1e-4));
        let expected = EARTH_RADIUS_M * 45f64.to_radians().cos() * 1e-4f64.to_radians();
        assert_relative_eq!(d.x, expected, epsilon = 1e-9);
    }

    #[test]
    fn degree_steps_shrink_with_latitude() {
        let (lat_eq, lon_eq) = meters_to_degrees(3.0, 0.0);
        assert_relative_eq!(lat_eq, 3.0 / 111_320.0, epsilon = 1e-15);
        assert_relative_eq!(lon_eq, 3.0 * 360.0 / 40_075_000.0, epsilon = 1e-15);

        let (lat_45, lon_45) = meters_to_degrees(3.0, 45.0);
        assert_eq!(lat_45, lat_eq);
        assert_relative_eq!(lon_45, lon_eq / 45f64.to_radians().cos(), epsilon = 1e-15);
    }

    #[test]
    fn zero_yaw_keeps_north_as_y() {
        let r = rotate_by_flight_yaw(Vector2::new(2.0, 5.0), 0.0);
        assert_relative_eq!(r.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(r.y, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn yaw_rotation_preserves_length() {
        for yaw in [-170.0, -45.0, 30.0, 90.0, 179.0] {
            let v = Vector2::new(3.0, -4.0);
            assert_relative_eq!(rotate_by_flight_yaw(v, yaw).norm(), 5.0, epsilon = 1e-9);
        }
        let r = rotate_by_flight_yaw(Vector2::new(0.0, 1.0), 90.0);
        assert_relative_eq!(r.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(r.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn second_capture_north_of_origin() {
        let origin = capture("a", 45.0, -93.0, 0.0);
        let second = capture("b", 45.0 + north(3.05), -93.0, 0.0);
        let aligner = FrameAligner::new(&origin);
        let model = CameraModel::new(CameraParams::default()).unwrap();

        let offset = aligner.drone_offset(&second);
        assert_relative_eq!(offset.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(offset.y, 3.05, epsilon = 1e-9);

        let (placed, failed) = aligner.place_detections(&model, &second, &[center_detection()]);
        assert!(failed.is_empty());
        let expected = 3.0 * 30f64.to_radians().tan() + 3.05;
        assert_relative_eq!(placed[0].position.y, expected, epsilon = 1e-6);
        assert_relative_eq!(placed[0].position.x, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn unprojectable_detections_are_reported() {
        let mut origin = capture("a", 45.0, -93.0, 0.0);
        origin.telemetry.gimbal_pitch_deg = -30.0;
        let aligner = FrameAligner::new(&origin);
        let model = CameraModel::new(CameraParams::default()).unwrap();

        let top = Detection {
            class_index: 0,
            corners: [Point2::new(0.5, 0.0); 4],
        };
        let (placed, failed) =
            aligner.place_detections(&model, &origin, &[center_detection(), top]);
        assert_eq!(placed.len(), 1);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].index, 1);
    }
}
