use std::path::PathBuf;
use survey_density_core::CaptureId;

fn join_ids(ids: &[CaptureId]) -> String {
    if ids.is_empty() {
        return "none".to_owned();
    }
    ids.iter()
        .map(CaptureId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Capture inputs and detection files that do not pair up one to one.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "inputs do not pair: captures without detections [{}], detections without capture [{}]",
    join_ids(.missing_detections),
    join_ids(.orphan_detections)
)]
pub struct PairingMismatch {
    pub missing_detections: Vec<CaptureId>,
    pub orphan_detections: Vec<CaptureId>,
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("capture `{capture}` appears more than once in {}", .path.display())]
    DuplicateCapture { path: PathBuf, capture: CaptureId },
    #[error(transparent)]
    Pairing(#[from] PairingMismatch),
}

#[derive(thiserror::Error, Debug)]
pub enum EmitError {
    #[error("failed to encode {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("{owners} owning captures do not fit a 16-bit ownership raster")]
    TooManyOwners { owners: usize },
    #[error("failed to serialize {name}: {source}")]
    Serialize {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
