//! Per-capture telemetry records.
//!
//! The metadata extractor hands over a JSON array with one object per image:
//!
//! ```json
//! [{ "capture": "DJI_0001.JPG", "latitude": 45.0, "longitude": -93.0,
//!    "relative_altitude": "+3.00", "gimbal_pitch": -60.0, "flight_yaw": 12.5,
//!    "width": 5280, "height": 3956 }]
//! ```
//!
//! Only `capture` is required here. Absent fields stay absent and are
//! reported when the record is validated.

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use survey_density_core::{CaptureId, RawTelemetry};

/// Altitude as a plain number or as the platform's signed text (`"+3.00"`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AltitudeValue {
    Number(f64),
    Text(String),
}

impl AltitudeValue {
    /// Meters, positive up. Unparseable text gives `None`.
    pub fn meters(&self) -> Option<f64> {
        match self {
            AltitudeValue::Number(v) => Some(*v),
            AltitudeValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Image file name or stem.
    pub capture: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub relative_altitude: Option<AltitudeValue>,
    #[serde(default)]
    pub gimbal_pitch: Option<f64>,
    #[serde(default)]
    pub flight_yaw: Option<f64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl TelemetryRecord {
    pub fn capture_id(&self) -> CaptureId {
        CaptureId::from_file_name(&self.capture)
    }

    pub fn raw(&self) -> RawTelemetry {
        RawTelemetry {
            latitude: self.latitude,
            longitude: self.longitude,
            relative_altitude: self.relative_altitude.as_ref().and_then(AltitudeValue::meters),
            gimbal_pitch: self.gimbal_pitch,
            flight_yaw: self.flight_yaw,
            width: self.width,
            height: self.height,
        }
    }
}

/// Parse telemetry records keyed by capture id.
pub fn parse_telemetry(
    json: &str,
    path: &Path,
) -> Result<BTreeMap<CaptureId, RawTelemetry>, LoadError> {
    let records: Vec<TelemetryRecord> =
        serde_json::from_str(json).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let mut out = BTreeMap::new();
    for record in &records {
        let id = record.capture_id();
        if out.insert(id.clone(), record.raw()).is_some() {
            return Err(LoadError::DuplicateCapture {
                path: path.to_path_buf(),
                capture: id,
            });
        }
    }
    Ok(out)
}

pub fn load_telemetry(
    path: impl AsRef<Path>,
) -> Result<BTreeMap<CaptureId, RawTelemetry>, LoadError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_telemetry(&json, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_density_core::TelemetryField;

    fn path() -> &'static Path {
        Path::new("telemetry.json")
    }

    #[test]
    fn signed_altitude_strings_are_accepted() {
        let json = r#"[
            {"capture": "DJI_0002.JPG", "latitude": 45.0, "longitude": -93.0,
             "relative_altitude": "+3.00", "gimbal_pitch": -60.0, "flight_yaw": 0.0,
             "width": 5280, "height": 3956},
            {"capture": "DJI_0001.JPG", "latitude": 45.0, "longitude": -93.0,
             "relative_altitude": -1.2, "gimbal_pitch": -90.0, "flight_yaw": 0.0,
             "width": 5280, "height": 3956}
        ]"#;
        let parsed = parse_telemetry(json, path()).unwrap();
        let ids: Vec<_> = parsed.keys().map(CaptureId::as_str).collect();
        assert_eq!(ids, ["DJI_0001", "DJI_0002"]);
        assert_eq!(parsed[&CaptureId::new("DJI_0002")].relative_altitude, Some(3.0));
        assert_eq!(parsed[&CaptureId::new("DJI_0001")].relative_altitude, Some(-1.2));
    }

    #[test]
    fn absent_and_garbled_fields_surface_at_validation() {
        let json = r#"[
            {"capture": "DJI_0003.JPG", "longitude": -93.0, "relative_altitude": "+3.00",
             "gimbal_pitch": -60.0, "flight_yaw": 0.0, "width": 10, "height": 10},
            {"capture": "DJI_0004.JPG", "latitude": 45.0, "longitude": -93.0,
             "relative_altitude": "three", "gimbal_pitch": -60.0, "flight_yaw": 0.0,
             "width": 10, "height": 10}
        ]"#;
        let parsed = parse_telemetry(json, path()).unwrap();

        let id = CaptureId::new("DJI_0003");
        let err = parsed[&id].validate(&id).unwrap_err();
        assert!(err.to_string().contains("DJI_0003"));
        assert!(err.to_string().contains("latitude"));

        let id = CaptureId::new("DJI_0004");
        assert!(matches!(
            parsed[&id].validate(&id),
            Err(survey_density_core::TelemetryError::Missing {
                field: TelemetryField::RelativeAltitude,
                ..
            })
        ));
    }

    #[test]
    fn duplicate_captures_are_rejected() {
        let json = r#"[{"capture": "DJI_0001.JPG"}, {"capture": "DJI_0001"}]"#;
        assert!(matches!(
            parse_telemetry(json, path()),
            Err(LoadError::DuplicateCapture { .. })
        ));
        assert!(matches!(
            parse_telemetry("{", path()),
            Err(LoadError::Json { .. })
        ));
    }
}
