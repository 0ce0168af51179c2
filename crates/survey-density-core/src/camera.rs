//! Pinhole-style ground projection for a gimballed nadir camera.
//!
//! A pixel offset from the image center is turned into a ground offset in
//! meters relative to the point directly below the camera, assuming flat
//! ground. `x` is across-track, `y` is along-track (positive ahead of the
//! platform).

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Vertical field of view of the survey camera sensor, degrees.
pub const DEFAULT_FOV_VERTICAL_DEG: f64 = 55.072;
/// Horizontal field of view of the survey camera sensor, degrees.
pub const DEFAULT_FOV_HORIZONTAL_DEG: f64 = 69.72;

/// Largest accepted off-nadir ray angle, degrees.
pub const DEFAULT_MAX_OFF_NADIR_DEG: f64 = 85.0;

/// Fixed camera constants shared by every capture of a run.
///
/// Missing fields deserialize to the survey camera defaults.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraParams {
    pub fov_vertical_deg: f64,
    pub fov_horizontal_deg: f64,
    /// Added to the telemetry altitude to get the sensor height above ground.
    pub sensor_offset_m: f64,
    /// Rays tilted this far (or further) from nadir are rejected.
    pub max_off_nadir_deg: f64,
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            fov_vertical_deg: DEFAULT_FOV_VERTICAL_DEG,
            fov_horizontal_deg: DEFAULT_FOV_HORIZONTAL_DEG,
            sensor_offset_m: 0.0,
            max_off_nadir_deg: DEFAULT_MAX_OFF_NADIR_DEG,
        }
    }
}

/// Image dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel coordinates of the four image corners relative to the center,
    /// y pointing up, in TL, TR, BR, BL order.
    pub fn centered_corners(&self) -> [Point2<f64>; 4] {
        let hw = self.width as f64 / 2.0;
        let hh = self.height as f64 / 2.0;
        [
            Point2::new(-hw, hh),
            Point2::new(hw, hh),
            Point2::new(hw, -hh),
            Point2::new(-hw, -hh),
        ]
    }
}

/// Platform pose at capture time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    /// Height above ground, meters.
    pub altitude_m: f64,
    /// Gimbal pitch, radians. `0` is horizontal, `-π/2` points straight down.
    pub pitch_rad: f64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("ray is {off_nadir_deg:.2}° off nadir, ground distance diverges")]
    NearHorizon { off_nadir_deg: f64 },
    #[error("projection produced a non-finite ground offset")]
    NonFinite,
    #[error("invalid image size {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },
    #[error("field of view must be in (0, 180) degrees, got {fov_deg}")]
    InvalidFieldOfView { fov_deg: f64 },
}

/// Ground projection model for one camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraModel {
    params: CameraParams,
    half_fov_v_tan: f64,
    half_fov_h_tan: f64,
    max_off_nadir: f64,
}

impl CameraModel {
    pub fn new(params: CameraParams) -> Result<Self, ProjectionError> {
        for fov_deg in [params.fov_vertical_deg, params.fov_horizontal_deg] {
            if !fov_deg.is_finite() || fov_deg <= 0.0 || fov_deg >= 180.0 {
                return Err(ProjectionError::InvalidFieldOfView { fov_deg });
            }
        }
        Ok(Self {
            params,
            half_fov_v_tan: (params.fov_vertical_deg.to_radians() / 2.0).tan(),
            half_fov_h_tan: (params.fov_horizontal_deg.to_radians() / 2.0).tan(),
            max_off_nadir: params.max_off_nadir_deg.to_radians(),
        })
    }

    #[inline]
    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    /// Project a center-relative pixel (y up) to a ground offset from nadir.
    ///
    /// The vertical angle uses the plain pinhole focal distance; the
    /// horizontal angle is measured against the slant distance to the
    /// pixel row, and the across-track offset is scaled by the slant range
    /// to the ground point rather than the along-track distance alone.
    pub fn project(
        &self,
        pixel: Point2<f64>,
        size: ImageSize,
        pose: CameraPose,
    ) -> Result<Vector2<f64>, ProjectionError> {
        if size.width == 0 || size.height == 0 {
            return Err(ProjectionError::InvalidImageSize {
                width: size.width,
                height: size.height,
            });
        }
        let altitude = pose.altitude_m + self.params.sensor_offset_m;

        let so_v = size.height as f64 / (2.0 * self.half_fov_v_tan);
        let angle_y = (pixel.y / so_v).atan();

        let off_nadir = FRAC_PI_2 + pose.pitch_rad + angle_y;
        if !off_nadir.is_finite() || off_nadir.abs() >= self.max_off_nadir {
            return Err(ProjectionError::NearHorizon {
                off_nadir_deg: off_nadir.to_degrees(),
            });
        }
        let y_distance = altitude * off_nadir.tan();

        let so_h = size.width as f64 / (2.0 * self.half_fov_h_tan);
        let oy = (so_h * so_h + pixel.y * pixel.y).sqrt();
        let angle_x = (pixel.x / oy).atan();
        let x_distance = (altitude * altitude + y_distance * y_distance).sqrt() * angle_x.tan();

        let offset = Vector2::new(x_distance, y_distance);
        if !offset.x.is_finite() || !offset.y.is_finite() {
            return Err(ProjectionError::NonFinite);
        }
        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn size() -> ImageSize {
        ImageSize::new(5280, 3956)
    }

    fn pose(altitude_m: f64, pitch_deg: f64) -> CameraPose {
        CameraPose {
            altitude_m,
            pitch_rad: pitch_deg.to_radians(),
        }
    }

    #[test]
    fn center_pixel_lands_on_boresight() {
        let model = CameraModel::new(CameraParams::default()).unwrap();
        let p = model
            .project(Point2::origin(), size(), pose(3.0, -60.0))
            .unwrap();
        assert_eq!(p.x, 0.0);
        assert_relative_eq!(p.y, 3.0 * (FRAC_PI_2 - 60f64.to_radians()).tan(), epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.732051, epsilon = 1e-5);
    }

    #[test]
    fn center_projection_ignores_horizontal_fov() {
        let narrow = CameraModel::new(CameraParams {
            fov_horizontal_deg: 20.0,
            ..CameraParams::default()
        })
        .unwrap();
        let wide = CameraModel::new(CameraParams::default()).unwrap();
        let a = narrow.project(Point2::origin(), size(), pose(7.5, -75.0)).unwrap();
        let b = wide.project(Point2::origin(), size(), pose(7.5, -75.0)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn nadir_camera_is_symmetric() {
        let model = CameraModel::new(CameraParams::default()).unwrap();
        let up = model
            .project(Point2::new(300.0, 800.0), size(), pose(10.0, -90.0))
            .unwrap();
        let down = model
            .project(Point2::new(-300.0, -800.0), size(), pose(10.0, -90.0))
            .unwrap();
        assert_relative_eq!(up.x, -down.x, epsilon = 1e-9);
        assert_relative_eq!(up.y, -down.y, epsilon = 1e-9);
        assert!(up.x > 0.0 && up.y > 0.0);
    }

    #[test]
    fn across_track_uses_slant_range() {
        let model = CameraModel::new(CameraParams::default()).unwrap();
        let s = size();
        let p = model
            .project(Point2::new(1000.0, 500.0), s, pose(4.0, -60.0))
            .unwrap();

        let so_h = s.width as f64 / (2.0 * (69.72f64.to_radians() / 2.0).tan());
        let angle_x = (1000.0 / (so_h * so_h + 500.0 * 500.0).sqrt()).atan();
        let expected_x = (16.0 + p.y * p.y).sqrt() * angle_x.tan();
        assert_relative_eq!(p.x, expected_x, epsilon = 1e-12);
    }

    #[test]
    fn sensor_offset_raises_altitude() {
        let model = CameraModel::new(CameraParams {
            sensor_offset_m: 0.5,
            ..CameraParams::default()
        })
        .unwrap();
        let p = model.project(Point2::origin(), size(), pose(2.5, -45.0)).unwrap();
        assert_relative_eq!(p.y, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn horizontal_ray_is_rejected() {
        let model = CameraModel::new(CameraParams::default()).unwrap();
        let err = model
            .project(Point2::origin(), size(), pose(3.0, -2.0))
            .unwrap_err();
        assert!(matches!(err, ProjectionError::NearHorizon { .. }));

        // Top edge of a shallow gimbal crosses the horizon even though the center does not.
        let err = model
            .project(Point2::new(0.0, 1978.0), size(), pose(3.0, -30.0))
            .unwrap_err();
        assert!(matches!(err, ProjectionError::NearHorizon { .. }));
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(CameraModel::new(CameraParams {
            fov_vertical_deg: 0.0,
            ..CameraParams::default()
        })
        .is_err());
        let model = CameraModel::new(CameraParams::default()).unwrap();
        assert_eq!(
            model.project(Point2::origin(), ImageSize::new(0, 10), pose(3.0, -90.0)),
            Err(ProjectionError::InvalidImageSize {
                width: 0,
                height: 10
            })
        );
    }
}
