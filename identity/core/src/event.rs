use crate::{consent::ConsentFlags, partial_keys::PartialKeys};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Monotonic event row id assigned by the relational store
pub type EventId = u64;

pub type PartnerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Impression,
    Click,
    Conversion,
}

impl EventType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::Impression => "impression",
            EventType::Click => "click",
            EventType::Conversion => "conversion",
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone)]
#[error("unknown event type: {0}")]
pub struct EventTypeParseError(String);

impl FromStr for EventType {
    type Err = EventTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "impression" => Ok(EventType::Impression),
            "click" => Ok(EventType::Click),
            "conversion" => Ok(EventType::Conversion),
            other => Err(EventTypeParseError(other.to_string())),
        }
    }
}

/// A single partner observation. Created at ingest, never mutated, pruned by
/// the retention window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EphemeralEvent {
    pub id: EventId,
    /// Partner-supplied opaque device token
    pub ephem_id: String,
    pub partial_keys: PartialKeys,
    pub event_type: EventType,
    pub campaign_id: Option<String>,
    pub partner_id: PartnerId,
    pub consent: ConsentFlags,
    pub privacy_tcf: Option<String>,
    pub privacy_us: Option<String>,
    /// Column forms of the child flags; partial_keys is authoritative
    pub is_child: bool,
    pub device_child_flag: bool,
    /// Milliseconds since UNIX epoch
    pub timestamp: u64,
}

impl EphemeralEvent {
    /// True when either child flag is set. The partial-keys form decides, the
    /// persisted columns are honored for rows written by older schemas.
    pub fn child_flagged(&self) -> bool {
        self.partial_keys.is_child || self.partial_keys.device_child_flag || self.is_child || self.device_child_flag
    }

    pub fn hashed_email(&self) -> Option<&str> {
        self.partial_keys.hashed_email()
    }

    pub fn device_type(&self) -> Option<&str> {
        self.partial_keys.device_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_codec() {
        for (s, ty) in [("impression", EventType::Impression), ("click", EventType::Click), ("conversion", EventType::Conversion)] {
            assert_eq!(s.parse::<EventType>().unwrap(), ty);
            assert_eq!(ty.to_string(), s);
        }
        assert!("banner".parse::<EventType>().is_err());
    }

    #[test]
    fn test_child_flags_partial_keys_authoritative() {
        let mut ev = EphemeralEvent {
            id: 1,
            ephem_id: "e1".into(),
            partial_keys: PartialKeys::default(),
            event_type: EventType::Impression,
            campaign_id: None,
            partner_id: 1,
            consent: ConsentFlags::default(),
            privacy_tcf: None,
            privacy_us: None,
            is_child: false,
            device_child_flag: false,
            timestamp: 0,
        };
        assert!(!ev.child_flagged());
        ev.partial_keys.device_child_flag = true;
        assert!(ev.child_flagged());
        // legacy column form still suppresses bridging
        ev.partial_keys.device_child_flag = false;
        ev.is_child = true;
        assert!(ev.child_flagged());
    }
}
