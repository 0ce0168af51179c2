//! Surveyed image corners for geodetic mode.
//!
//! One corner per line: `capture label lat lon`. Corners are stored as
//! `(lon, lat)` points so that x runs east like the local frame.

use crate::detections::{MalformedDetectionRecord, ParsedRecords};
use crate::error::LoadError;
use log::warn;
use nalgebra::Point2;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use survey_density_core::CaptureId;

/// Labelled corners of every capture named in the file, in file order.
pub type CornerMap = BTreeMap<CaptureId, Vec<(String, Point2<f64>)>>;

fn parse_corner(tokens: &[&str]) -> Option<(CaptureId, String, Point2<f64>)> {
    let [capture, label, lat, lon] = tokens else {
        return None;
    };
    let lat = lat.parse::<f64>().ok().filter(|v| v.is_finite() && v.abs() <= 90.0)?;
    let lon = lon.parse::<f64>().ok().filter(|v| v.is_finite() && v.abs() <= 180.0)?;
    Some((
        CaptureId::from_file_name(capture),
        (*label).to_owned(),
        Point2::new(lon, lat),
    ))
}

/// Group corner lines by capture. Unusable lines are returned separately.
pub fn parse_corners(text: &str) -> (CornerMap, Vec<MalformedDetectionRecord>) {
    let mut map = CornerMap::new();
    let mut parsed = ParsedRecords::default();
    for (i, line) in text.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        match parse_corner(&tokens) {
            Some(corner) => parsed.records.push(corner),
            None => parsed.malformed.push(MalformedDetectionRecord {
                line: i + 1,
                tokens: tokens.len(),
            }),
        }
    }
    for (id, label, point) in parsed.records {
        map.entry(id).or_default().push((label, point));
    }
    (map, parsed.malformed)
}

pub fn load_corners(path: impl AsRef<Path>) -> Result<CornerMap, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (map, malformed) = parse_corners(&text);
    for bad in &malformed {
        warn!("{}: {}", path.display(), bad);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_group_by_capture_stem() {
        let text = "DJI_0001.JPG TL 45.01 -93.0\n\
                    DJI_0001.JPG TR 45.01 -92.99\n\
                    DJI_0002.JPG TL 45.02 -93.0\n\
                    DJI_0001.JPG BR 45.0 -92.99\n\
                    DJI_0001.JPG BL 45.0\n\
                    DJI_0001.JPG BL 95.0 -93.0\n\
                    DJI_0001.JPG BL 45.0 -93.0\n";
        let (map, malformed) = parse_corners(text);
        assert_eq!(map.len(), 2);
        let first = &map[&CaptureId::new("DJI_0001")];
        assert_eq!(first.len(), 4);
        assert_eq!(first[0], ("TL".to_owned(), Point2::new(-93.0, 45.01)));
        assert_eq!(first[3].0, "BL");
        assert_eq!(malformed.iter().map(|m| m.line).collect::<Vec<_>>(), [5, 6]);
    }
}
