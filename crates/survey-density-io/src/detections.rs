//! Detector output, one text file per capture.
//!
//! Pixel records are `class x1 y1 x2 y2 x3 y3 x4 y4` with corners
//! normalized to the image size. Geodetic records are four `lat lon` pairs,
//! optionally preceded by the class index.

use crate::error::LoadError;
use log::warn;
use nalgebra::Point2;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use survey_density_core::{CaptureId, Detection};

/// Extension of detection files inside the detections directory.
pub const DETECTION_EXTENSION: &str = "txt";

/// A line that does not hold a usable record. The line is skipped.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: malformed detection record ({tokens} tokens)")]
pub struct MalformedDetectionRecord {
    /// 1-based line number.
    pub line: usize,
    pub tokens: usize,
}

/// Records of one file plus the lines that had to be skipped.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedRecords<T> {
    pub records: Vec<T>,
    pub malformed: Vec<MalformedDetectionRecord>,
}

impl<T> Default for ParsedRecords<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            malformed: Vec::new(),
        }
    }
}

fn parse_class(token: &str) -> Option<u32> {
    if let Ok(v) = token.parse::<u32>() {
        return Some(v);
    }
    // Some exporters write the class as a float.
    let v = token.parse::<f64>().ok()?;
    (v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64).then_some(v as u32)
}

fn parse_coords(tokens: &[&str]) -> Option<[f64; 8]> {
    let mut out = [0.0; 8];
    for (slot, tok) in out.iter_mut().zip(tokens) {
        let v = tok.parse::<f64>().ok()?;
        if !v.is_finite() {
            return None;
        }
        *slot = v;
    }
    Some(out)
}

fn parse_lines<T>(
    text: &str,
    mut parse: impl FnMut(&[&str]) -> Option<T>,
) -> ParsedRecords<T> {
    let mut parsed = ParsedRecords::default();
    for (i, line) in text.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        match parse(&tokens) {
            Some(record) => parsed.records.push(record),
            None => parsed.malformed.push(MalformedDetectionRecord {
                line: i + 1,
                tokens: tokens.len(),
            }),
        }
    }
    parsed
}

/// Parse oriented boxes in normalized image coordinates.
pub fn parse_pixel_detections(text: &str) -> ParsedRecords<Detection> {
    parse_lines(text, |tokens| {
        if tokens.len() != 9 {
            return None;
        }
        let class_index = parse_class(tokens[0])?;
        let c = parse_coords(&tokens[1..])?;
        Some(Detection {
            class_index,
            corners: [
                Point2::new(c[0], c[1]),
                Point2::new(c[2], c[3]),
                Point2::new(c[4], c[5]),
                Point2::new(c[6], c[7]),
            ],
        })
    })
}

/// Parse georeferenced boxes and return their centers as `(lon, lat)`.
pub fn parse_geodetic_detections(text: &str) -> ParsedRecords<Point2<f64>> {
    parse_lines(text, |tokens| {
        let coords = match tokens.len() {
            8 => tokens,
            9 => {
                parse_class(tokens[0])?;
                &tokens[1..]
            }
            _ => return None,
        };
        let c = parse_coords(coords)?;
        let lat = (c[0] + c[2] + c[4] + c[6]) / 4.0;
        let lon = (c[1] + c[3] + c[5] + c[7]) / 4.0;
        if lat.abs() > 90.0 || lon.abs() > 180.0 {
            return None;
        }
        Some(Point2::new(lon, lat))
    })
}

/// Detection files in `dir`, keyed by capture id.
///
/// Two files naming the same capture (say `DJI_0001.txt` and
/// `DJI_0001.TXT`) fail with [`LoadError::DuplicateCapture`].
pub fn detection_files(dir: impl AsRef<Path>) -> Result<BTreeMap<CaptureId, PathBuf>, LoadError> {
    let dir = dir.as_ref();
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_detection_file = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(DETECTION_EXTENSION));
        if !is_detection_file {
            continue;
        }
        let id = CaptureId::from_file_name(&path.to_string_lossy());
        if files.contains_key(&id) {
            return Err(LoadError::DuplicateCapture {
                path: dir.to_path_buf(),
                capture: id,
            });
        }
        files.insert(id, path);
    }
    Ok(files)
}

/// Read and parse one detection file, logging every skipped line.
pub fn load_records<T>(
    path: &Path,
    parse: impl Fn(&str) -> ParsedRecords<T>,
) -> Result<ParsedRecords<T>, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse(&text);
    for bad in &parsed.malformed {
        warn!("{}: {}", path.display(), bad);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pixel_records_and_malformed_lines() {
        let text = "0 0.1 0.1 0.2 0.1 0.2 0.2 0.1 0.2\n\
                    \n\
                    0 0.1 0.1 0.2\n\
                    1.0 0.5 0.5 0.6 0.5 0.6 0.6 0.5 0.6\n\
                    0 0.1 0.1 0.2 0.1 0.2 0.2 0.1 nan\n\
                    x 0.1 0.1 0.2 0.1 0.2 0.2 0.1 0.2\n";
        let parsed = parse_pixel_detections(text);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].class_index, 1);
        assert_eq!(
            parsed.malformed,
            vec![
                MalformedDetectionRecord { line: 3, tokens: 4 },
                MalformedDetectionRecord { line: 5, tokens: 9 },
                MalformedDetectionRecord { line: 6, tokens: 9 },
            ]
        );
        assert_eq!(parsed.malformed[0].to_string(), "line 3: malformed detection record (4 tokens)");
    }

    #[test]
    fn geodetic_records_yield_lon_lat_centers() {
        let text = "45.0 -93.0 45.0 -92.9 44.9 -92.9 44.9 -93.0\n\
                    3 45.0 -93.0 45.0 -92.9 44.9 -92.9 44.9 -93.0\n\
                    45.0 -93.0 45.0\n";
        let parsed = parse_geodetic_detections(text);
        assert_eq!(parsed.records.len(), 2);
        assert_relative_eq!(parsed.records[0].x, -92.95, epsilon = 1e-12);
        assert_relative_eq!(parsed.records[0].y, 44.95, epsilon = 1e-12);
        assert_eq!(parsed.records[0], parsed.records[1]);
        assert_eq!(parsed.malformed.len(), 1);
    }

    #[test]
    fn detection_files_are_keyed_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("DJI_0002.txt"), "").unwrap();
        fs::write(dir.path().join("DJI_0001.txt"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();
        fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let files = detection_files(dir.path()).unwrap();
        let ids: Vec<_> = files.keys().map(CaptureId::as_str).collect();
        assert_eq!(ids, ["DJI_0001", "DJI_0002"]);

        let parsed = load_records(&files[&CaptureId::new("DJI_0001")], parse_pixel_detections)
            .unwrap();
        assert!(parsed.records.is_empty());
        assert!(matches!(
            detection_files(dir.path().join("missing")),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn two_files_for_one_capture_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("DJI_0001.txt"), "0 0.1 0.1 0.2 0.1 0.2 0.2 0.1 0.2\n").unwrap();
        fs::write(dir.path().join("DJI_0001.TXT"), "").unwrap();
        // Case-insensitive filesystems fold both names into one file.
        if fs::read_dir(dir.path()).unwrap().count() < 2 {
            return;
        }

        match detection_files(dir.path()) {
            Err(LoadError::DuplicateCapture { capture, path }) => {
                assert_eq!(capture, CaptureId::new("DJI_0001"));
                assert_eq!(path, dir.path());
            }
            other => panic!("expected a duplicate capture error, got {other:?}"),
        }
    }
}
