//! Captures, their telemetry and their detections.

use crate::camera::{CameraPose, ImageSize};
use crate::frame::GeoPoint;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Stable identifier of a capture, derived from the image or label file stem.
///
/// Ordering is lexicographic and is the iteration order used wherever a
/// deterministic tie-break between captures is needed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureId(String);

impl CaptureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `DJI_0001.JPG`, `out/DJI_0001.txt` and `DJI_0001` all map to `DJI_0001`.
    pub fn from_file_name(name: &str) -> Self {
        let stem = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_owned());
        Self(stem)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CaptureId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Telemetry fields a capture cannot be used without.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryField {
    Latitude,
    Longitude,
    RelativeAltitude,
    GimbalPitch,
    FlightYaw,
    Width,
    Height,
}

impl fmt::Display for TelemetryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TelemetryField::Latitude => "latitude",
            TelemetryField::Longitude => "longitude",
            TelemetryField::RelativeAltitude => "relative_altitude",
            TelemetryField::GimbalPitch => "gimbal_pitch",
            TelemetryField::FlightYaw => "flight_yaw",
            TelemetryField::Width => "width",
            TelemetryField::Height => "height",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TelemetryError {
    #[error("capture {capture}: telemetry field `{field}` is missing or unparseable")]
    Missing {
        capture: CaptureId,
        field: TelemetryField,
    },
    #[error("capture {capture}: telemetry field `{field}` is out of range ({value})")]
    OutOfRange {
        capture: CaptureId,
        field: TelemetryField,
        value: f64,
    },
}

impl TelemetryError {
    pub fn capture(&self) -> &CaptureId {
        match self {
            TelemetryError::Missing { capture, .. } | TelemetryError::OutOfRange { capture, .. } => {
                capture
            }
        }
    }
}

/// Telemetry as delivered by a metadata reader: any field may be absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTelemetry {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Height above the take-off point, positive up.
    pub relative_altitude: Option<f64>,
    pub gimbal_pitch: Option<f64>,
    pub flight_yaw: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Validated, immutable telemetry of one capture.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub gps: GeoPoint,
    pub relative_altitude_m: f64,
    pub gimbal_pitch_deg: f64,
    pub flight_yaw_deg: f64,
    pub size: ImageSize,
}

impl RawTelemetry {
    /// Check every required field. The first absent field is reported; no
    /// field is ever defaulted.
    pub fn validate(&self, capture: &CaptureId) -> Result<Telemetry, TelemetryError> {
        let float = |value: Option<f64>, field: TelemetryField| match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(TelemetryError::Missing {
                capture: capture.clone(),
                field,
            }),
        };
        let pixels = |value: Option<u32>, field: TelemetryField| match value {
            Some(0) => Err(TelemetryError::OutOfRange {
                capture: capture.clone(),
                field,
                value: 0.0,
            }),
            Some(v) => Ok(v),
            None => Err(TelemetryError::Missing {
                capture: capture.clone(),
                field,
            }),
        };
        let ranged = |value: f64, field: TelemetryField, limit: f64| {
            if value.abs() > limit {
                Err(TelemetryError::OutOfRange {
                    capture: capture.clone(),
                    field,
                    value,
                })
            } else {
                Ok(value)
            }
        };

        let lat = float(self.latitude, TelemetryField::Latitude)?;
        let lon = float(self.longitude, TelemetryField::Longitude)?;
        let relative_altitude_m = float(self.relative_altitude, TelemetryField::RelativeAltitude)?;
        // Flat-ground projection needs the camera above the ground plane.
        if relative_altitude_m <= 0.0 {
            return Err(TelemetryError::OutOfRange {
                capture: capture.clone(),
                field: TelemetryField::RelativeAltitude,
                value: relative_altitude_m,
            });
        }
        let gimbal_pitch_deg = float(self.gimbal_pitch, TelemetryField::GimbalPitch)?;
        let flight_yaw_deg = float(self.flight_yaw, TelemetryField::FlightYaw)?;
        let width = pixels(self.width, TelemetryField::Width)?;
        let height = pixels(self.height, TelemetryField::Height)?;

        Ok(Telemetry {
            gps: GeoPoint {
                lat: ranged(lat, TelemetryField::Latitude, 90.0)?,
                lon: ranged(lon, TelemetryField::Longitude, 180.0)?,
            },
            relative_altitude_m,
            gimbal_pitch_deg: ranged(gimbal_pitch_deg, TelemetryField::GimbalPitch, 180.0)?,
            flight_yaw_deg,
            size: ImageSize::new(width, height),
        })
    }
}

/// One image together with its telemetry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub id: CaptureId,
    pub telemetry: Telemetry,
}

impl Capture {
    pub fn new(id: CaptureId, telemetry: Telemetry) -> Self {
        Self { id, telemetry }
    }

    #[inline]
    pub fn size(&self) -> ImageSize {
        self.telemetry.size
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            altitude_m: self.telemetry.relative_altitude_m,
            pitch_rad: self.telemetry.gimbal_pitch_deg.to_radians(),
        }
    }
}

/// Oriented bounding box from the detector, corners normalized to `[0, 1]`
/// of image width/height with y pointing down.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_index: u32,
    pub corners: [Point2<f64>; 4],
}

impl Detection {
    /// Mean of the four corners, still normalized.
    pub fn center(&self) -> Point2<f64> {
        let sum = self
            .corners
            .iter()
            .fold(Vector2::<f64>::zeros(), |acc, c| acc + c.coords);
        Point2::from(sum / 4.0)
    }

    /// Center in pixels relative to the image center, y pointing up.
    pub fn centered_pixel(&self, size: ImageSize) -> Point2<f64> {
        let c = self.center();
        let w = size.width as f64;
        let h = size.height as f64;
        Point2::new(c.x * w - w / 2.0, -(c.y * h) + h / 2.0)
    }
}
