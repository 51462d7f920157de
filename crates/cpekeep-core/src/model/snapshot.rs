// ── Configuration snapshot ──
//
// Canonical, dialect-neutral backup of one physical device. At most one
// snapshot per serial number is active; older ones are deactivated, never
// deleted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cpekeep_acs::{ParameterValue, WireType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::normalize::Dialect;

/// Wi-Fi frequency band.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum Band {
    #[serde(rename = "2.4GHz")]
    #[strum(to_string = "2.4GHz", serialize = "2.4")]
    Ghz24,
    #[serde(rename = "5GHz")]
    #[strum(to_string = "5GHz", serialize = "5")]
    Ghz5,
}

/// Per-band Wi-Fi settings. `hidden` is the negation of the device's
/// SSID-advertisement flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    /// 0 means automatic channel selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_mode: Option<String>,
}

impl WifiConfig {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// WAN PPPoE credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WanConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// LAN addressing and DHCP pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp_end: Option<String>,
    /// Lease time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_time: Option<u32>,
}

/// One `(path, value, type)` write ready for a `setParameterValues` task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteInstruction {
    pub path: String,
    pub value: String,
    pub wire_type: WireType,
}

impl From<WriteInstruction> for ParameterValue {
    fn from(w: WriteInstruction) -> Self {
        ParameterValue::new(w.path, w.value, w.wire_type)
    }
}

/// The hashed portion of a snapshot.
#[derive(Serialize)]
struct Canonical<'a> {
    wifi: &'a BTreeMap<Band, WifiConfig>,
    wan: &'a WanConfig,
    lan: &'a LanConfig,
}

/// SHA-256 (hex) of the canonical `{wifi, wan, lan}` JSON.
pub fn content_hash(
    wifi: &BTreeMap<Band, WifiConfig>,
    wan: &WanConfig,
    lan: &LanConfig,
) -> String {
    // Struct fields and BTreeMap keys serialize in a fixed order.
    let canonical = serde_json::to_vec(&Canonical { wifi, wan, lan }).unwrap_or_default();
    hex::encode(Sha256::digest(&canonical))
}

/// A point-in-time configuration backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub id: Uuid,
    pub serial_number: String,
    /// ACS device id the snapshot was read from.
    pub device_id: Option<String>,
    pub dialect: Dialect,
    pub wifi: BTreeMap<Band, WifiConfig>,
    pub wan: WanConfig,
    pub lan: LanConfig,
    pub instructions: Vec<WriteInstruction>,
    pub config_hash: String,
    pub active: bool,
    pub auto_restore_enabled: bool,
    pub restore_count: u32,
    pub last_restored_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConfigSnapshot {
    /// SSID of the primary band: 2.4 GHz when present, else 5 GHz.
    pub fn primary_ssid(&self) -> Option<&str> {
        [Band::Ghz24, Band::Ghz5]
            .iter()
            .find_map(|b| self.wifi.get(b).and_then(|w| w.ssid.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_ignores_construction_order() {
        let mut a = BTreeMap::new();
        a.insert(Band::Ghz5, WifiConfig {
            ssid: Some("Casa-5G".into()),
            ..WifiConfig::default()
        });
        a.insert(Band::Ghz24, WifiConfig {
            ssid: Some("Casa".into()),
            ..WifiConfig::default()
        });

        let mut b = BTreeMap::new();
        b.insert(Band::Ghz24, a[&Band::Ghz24].clone());
        b.insert(Band::Ghz5, a[&Band::Ghz5].clone());

        let wan = WanConfig::default();
        let lan = LanConfig::default();
        assert_eq!(content_hash(&a, &wan, &lan), content_hash(&b, &wan, &lan));
        assert_eq!(content_hash(&a, &wan, &lan).len(), 64);
    }

    #[test]
    fn hash_changes_with_content() {
        let wifi = BTreeMap::new();
        let lan = LanConfig::default();
        let one = content_hash(&wifi, &WanConfig {
            username: Some("user@isp".into()),
            password: None,
        }, &lan);
        let two = content_hash(&wifi, &WanConfig::default(), &lan);
        assert_ne!(one, two);
    }

    #[test]
    fn band_names() {
        assert_eq!(Band::Ghz24.to_string(), "2.4GHz");
        assert_eq!("5".parse::<Band>().ok(), Some(Band::Ghz5));
        assert_eq!(
            serde_json::to_string(&Band::Ghz5).ok().as_deref(),
            Some("\"5GHz\"")
        );
    }
}
