use chrono::{DateTime, Utc};

use crate::Result;

/// Encodes slot start times as a JSON array of RFC 3339 strings.
pub fn encode_slots(slots: &[DateTime<Utc>]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(slots)?)
}

/// Decodes a value written by [`encode_slots`].
pub fn decode_slots(bytes: &[u8]) -> Result<Vec<DateTime<Utc>>> {
    Ok(serde_json::from_slice(bytes)?)
}
