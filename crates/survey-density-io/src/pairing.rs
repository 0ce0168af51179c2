use crate::error::PairingMismatch;
use std::collections::BTreeMap;
use survey_density_core::CaptureId;

/// Join capture inputs with detection inputs by id.
///
/// Every capture needs exactly one detection source and vice versa; any
/// id present on one side only fails the whole pairing.
pub fn pair_by_capture<C, D>(
    captures: BTreeMap<CaptureId, C>,
    mut detections: BTreeMap<CaptureId, D>,
) -> Result<BTreeMap<CaptureId, (C, D)>, PairingMismatch> {
    let missing_detections: Vec<CaptureId> = captures
        .keys()
        .filter(|id| !detections.contains_key(*id))
        .cloned()
        .collect();
    let orphan_detections: Vec<CaptureId> = detections
        .keys()
        .filter(|id| !captures.contains_key(*id))
        .cloned()
        .collect();
    if !missing_detections.is_empty() || !orphan_detections.is_empty() {
        return Err(PairingMismatch {
            missing_detections,
            orphan_detections,
        });
    }

    Ok(captures
        .into_iter()
        .filter_map(|(id, c)| detections.remove(&id).map(|d| (id, (c, d))))
        .collect())
}
