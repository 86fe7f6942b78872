use serde::{Deserialize, Serialize};

/// The recognized weighted partial keys, in wire spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartialKey {
    HashedEmail,
    HashedIp,
    WifiSsid,
    DeviceType,
    ProfileId,
}

impl PartialKey {
    pub const ALL: [PartialKey; 5] =
        [PartialKey::HashedEmail, PartialKey::HashedIp, PartialKey::WifiSsid, PartialKey::DeviceType, PartialKey::ProfileId];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PartialKey::HashedEmail => "hashedEmail",
            PartialKey::HashedIp => "hashedIP",
            PartialKey::WifiSsid => "wifiSSID",
            PartialKey::DeviceType => "deviceType",
            PartialKey::ProfileId => "profileID",
        }
    }
}

/// Best-effort identifiers supplied by the partner alongside an event.
///
/// The child flags ride along in the same map since partners switched between
/// dedicated columns and partial keys across schema revisions; this form is
/// the authoritative one for bridging decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialKeys {
    #[serde(rename = "hashedEmail", skip_serializing_if = "Option::is_none")]
    pub hashed_email: Option<String>,
    #[serde(rename = "hashedIP", skip_serializing_if = "Option::is_none")]
    pub hashed_ip: Option<String>,
    #[serde(rename = "wifiSSID", skip_serializing_if = "Option::is_none")]
    pub wifi_ssid: Option<String>,
    #[serde(rename = "deviceType", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(rename = "profileID", skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    #[serde(rename = "isChild")]
    pub is_child: bool,
    #[serde(rename = "deviceChildFlag")]
    pub device_child_flag: bool,
}

impl PartialKeys {
    /// Returns the non-empty value of a recognized key by its wire name
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "hashedEmail" => self.hashed_email.as_deref(),
            "hashedIP" => self.hashed_ip.as_deref(),
            "wifiSSID" => self.wifi_ssid.as_deref(),
            "deviceType" => self.device_type.as_deref(),
            "profileID" => self.profile_id.as_deref(),
            _ => None,
        };
        value.filter(|v| !v.is_empty())
    }

    pub fn hashed_email(&self) -> Option<&str> {
        self.get(PartialKey::HashedEmail.as_str())
    }

    pub fn hashed_ip(&self) -> Option<&str> {
        self.get(PartialKey::HashedIp.as_str())
    }

    pub fn wifi_ssid(&self) -> Option<&str> {
        self.get(PartialKey::WifiSsid.as_str())
    }

    pub fn device_type(&self) -> Option<&str> {
        self.get(PartialKey::DeviceType.as_str())
    }

    pub fn profile_id(&self) -> Option<&str> {
        self.get(PartialKey::ProfileId.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        let keys = PartialKeys {
            hashed_email: Some("h1".into()),
            hashed_ip: Some("ip".into()),
            wifi_ssid: Some("ssid".into()),
            device_type: Some("mobile".into()),
            profile_id: None,
            is_child: true,
            device_child_flag: false,
        };
        let json = serde_json::to_value(&keys).unwrap();
        assert_eq!(json["hashedEmail"], "h1");
        assert_eq!(json["hashedIP"], "ip");
        assert_eq!(json["wifiSSID"], "ssid");
        assert_eq!(json["deviceType"], "mobile");
        assert_eq!(json["isChild"], true);
        assert_eq!(json["deviceChildFlag"], false);
        assert!(json.get("profileID").is_none());

        let back: PartialKeys = serde_json::from_value(json).unwrap();
        assert_eq!(back, keys);
    }

    #[test]
    fn test_get_skips_empty_values() {
        let keys = PartialKeys { hashed_email: Some(String::new()), ..Default::default() };
        assert_eq!(keys.get("hashedEmail"), None);
        assert_eq!(keys.get("unrecognized"), None);
    }
}
