use serde::{Deserialize, Serialize};

/// Consent flags attached to an event at ingest; immutable afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentFlags {
    pub cross_device_bridging: bool,
    pub targeting_segments: bool,
}

impl Default for ConsentFlags {
    fn default() -> Self {
        Self { cross_device_bridging: true, targeting_segments: true }
    }
}
