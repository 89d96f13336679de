//! Snapshot wire format for the franchise index.
//!
//! A UTF-8 JSON array of `{"agencyId": <int>, "franchiseNumbers": [<string>...]}`
//! objects in ascending `agencyId` order.

use super::{AgencyFranchiseEntry, FranchiseIndex};
use crate::Error;

pub fn encode(index: &FranchiseIndex) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(index).map_err(|e| Error::InvalidSnapshot(format!("encode failed: {e}")))
}

/// Decode snapshot bytes.
///
/// Input that does not already satisfy the index shape is normalized, so a
/// hand-edited snapshot still produces a sorted index.
pub fn decode(bytes: &[u8]) -> Result<FranchiseIndex, Error> {
    let entries: Vec<AgencyFranchiseEntry> =
        serde_json::from_slice(bytes).map_err(|e| Error::InvalidSnapshot(format!("decode failed: {e}")))?;
    Ok(FranchiseIndex::from_entries(entries))
}
