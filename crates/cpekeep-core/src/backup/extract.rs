// ── Snapshot extraction ──
//
// Pulls the backed-up settings out of a device tree into the canonical
// snapshot record, and derives the write instructions that would put them
// back.

use std::collections::BTreeMap;

use chrono::Utc;
use strum::IntoEnumIterator;
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{
    Band, ConfigSnapshot, DeviceTree, LanConfig, ParamValue, WanConfig, WifiConfig,
    WriteInstruction, content_hash,
};
use crate::normalize::{Accessor, IndexVars};

const PASSWORD: &[&str] = &["wifi.security.password", "wifi.security.password.alt"];
const SECURITY_MODE: &[&str] = &["wifi.security.mode", "wifi.security.mode.alt"];

/// Extract a snapshot from `tree`.
///
/// `None` when the device has no serial number, or when it reports
/// neither an SSID nor a PPPoE username (inventory not yet complete).
pub fn extract(tree: &DeviceTree) -> Option<ConfigSnapshot> {
    extract_with(&Accessor::new(tree))
}

/// Same as [`extract`], reusing an accessor the caller already built.
pub fn extract_with(acc: &Accessor<'_>) -> Option<ConfigSnapshot> {
    let tree = acc.tree();
    let Some(serial_number) = tree.serial_number() else {
        debug!("no serial number, nothing to back up");
        return None;
    };

    let wifi: BTreeMap<Band, WifiConfig> = Band::iter()
        .filter_map(|band| {
            let cfg = read_wifi(acc, band);
            (!cfg.is_empty()).then_some((band, cfg))
        })
        .collect();
    let wan = read_wan(acc);
    let lan = read_lan(acc);

    let has_ssid = wifi.values().any(|w| w.ssid.is_some());
    if !has_ssid && wan.username.is_none() {
        debug!(serial = %serial_number, "no SSID and no PPPoE username, skipping backup");
        return None;
    }

    let instructions = instructions(acc, &wifi, &wan, &lan);
    let config_hash = content_hash(&wifi, &wan, &lan);

    Some(ConfigSnapshot {
        id: Uuid::new_v4(),
        serial_number,
        device_id: tree.device_id(),
        dialect: acc.dialect(),
        wifi,
        wan,
        lan,
        instructions,
        config_hash,
        active: false,
        auto_restore_enabled: true,
        restore_count: 0,
        last_restored_at: None,
        created_at: Utc::now(),
    })
}

// ── Reads ────────────────────────────────────────────────────────────

fn text(value: Option<&ParamValue>) -> Option<String> {
    value.map(ParamValue::as_text)
}

fn read_wifi(acc: &Accessor<'_>, band: Band) -> WifiConfig {
    let auto = acc
        .get_band(&["wifi.radio.auto_channel"], band)
        .and_then(ParamValue::as_bool)
        .unwrap_or(false);
    let channel = if auto {
        Some(0)
    } else {
        acc.get_band(&["wifi.radio.channel"], band)
            .and_then(ParamValue::as_u64)
            .and_then(|c| u32::try_from(c).ok())
    };

    WifiConfig {
        ssid: text(acc.get_band(&["wifi.ssid"], band)),
        passphrase: text(acc.get_band(PASSWORD, band)),
        channel,
        enabled: acc
            .get_band(&["wifi.ssid.enable"], band)
            .and_then(ParamValue::as_bool),
        hidden: acc
            .get_band(&["wifi.ssid.hidden"], band)
            .and_then(ParamValue::as_bool)
            .map(|advertised| !advertised),
        security_mode: text(acc.get_band(SECURITY_MODE, band)),
    }
}

fn read_wan(acc: &Accessor<'_>) -> WanConfig {
    let none = IndexVars::new();
    WanConfig {
        username: text(acc.get("wan.ppp.username", &none)),
        password: text(acc.get("wan.ppp.password", &none)),
    }
}

fn read_lan(acc: &Accessor<'_>) -> LanConfig {
    let none = IndexVars::new();
    LanConfig {
        address: text(acc.get_first(&["lan.ip", "lan.ip.alt"], &none)),
        subnet_mask: text(acc.get_first(&["lan.mask", "lan.mask.alt"], &none)),
        dhcp_start: text(acc.get("lan.dhcp.start", &none)),
        dhcp_end: text(acc.get("lan.dhcp.end", &none)),
        lease_time: acc
            .get("lan.dhcp.lease", &none)
            .and_then(ParamValue::as_u64)
            .and_then(|l| u32::try_from(l).ok()),
    }
}

// ── Write instructions ───────────────────────────────────────────────

/// Collects instructions, skipping settings the device cannot take.
struct Instructions(Vec<WriteInstruction>);

impl Instructions {
    fn push(&mut self, logical: &str, result: Result<Option<WriteInstruction>, CoreError>) {
        match result {
            Ok(Some(write)) => self.0.push(write),
            Ok(None) => {}
            Err(e) => debug!(logical, error = %e, "setting not restorable on this device"),
        }
    }
}

fn instructions(
    acc: &Accessor<'_>,
    wifi: &BTreeMap<Band, WifiConfig>,
    wan: &WanConfig,
    lan: &LanConfig,
) -> Vec<WriteInstruction> {
    let mut out = Instructions(Vec::new());

    for (&band, cfg) in wifi {
        let mut band_write = |logical: &str, value: ParamValue| {
            out.push(logical, acc.set_band(logical, band, value));
        };
        if let Some(ssid) = &cfg.ssid {
            band_write("wifi.ssid", ssid.as_str().into());
        }
        if let Some(pass) = &cfg.passphrase {
            band_write("wifi.security.password", pass.as_str().into());
        }
        match cfg.channel {
            Some(0) => band_write("wifi.radio.auto_channel", true.into()),
            Some(ch) => band_write("wifi.radio.channel", ch.into()),
            None => {}
        }
        if let Some(enabled) = cfg.enabled {
            band_write("wifi.ssid.enable", enabled.into());
        }
        if let Some(hidden) = cfg.hidden {
            band_write("wifi.ssid.hidden", (!hidden).into());
        }
        if let Some(mode) = &cfg.security_mode {
            band_write("wifi.security.mode", mode.as_str().into());
        }
    }

    let none = IndexVars::new();
    let mut write = |logical: &str, value: ParamValue| {
        out.push(logical, acc.set(logical, value, &none).map(Some));
    };
    if let Some(user) = &wan.username {
        write("wan.ppp.username", user.as_str().into());
    }
    if let Some(pass) = &wan.password {
        write("wan.ppp.password", pass.as_str().into());
    }
    if let Some(addr) = &lan.address {
        write("lan.ip", addr.as_str().into());
    }
    if let Some(mask) = &lan.subnet_mask {
        write("lan.mask", mask.as_str().into());
    }
    if let Some(start) = &lan.dhcp_start {
        write("lan.dhcp.start", start.as_str().into());
    }
    if let Some(end) = &lan.dhcp_end {
        write("lan.dhcp.end", end.as_str().into());
    }
    if let Some(lease) = lan.lease_time {
        write("lan.dhcp.lease", lease.into());
    }

    out.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cpekeep_acs::WireType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::normalize::Dialect;

    const WLAN: &str = "InternetGatewayDevice.LANDevice.1.WLANConfiguration";

    fn tr098() -> DeviceTree {
        DeviceTree::from_json(&json!({
            "_id": "00259E-HG8245-SN42",
            "_deviceId": { "_SerialNumber": "SN42", "_Manufacturer": "Intelbras" },
            "InternetGatewayDevice": {
                "DeviceInfo": { "UpTime": { "_value": 86400 } },
                "LANDevice": { "1": {
                    "LANHostConfigManagement": {
                        "IPAddress": { "_value": "192.168.1.1" },
                        "SubnetMask": { "_value": "255.255.255.0" },
                        "MinAddress": { "_value": "192.168.1.100" },
                        "MaxAddress": { "_value": "192.168.1.200" },
                        "DHCPLeaseTime": { "_value": 86400, "_type": "xsd:unsignedInt" }
                    },
                    "WLANConfiguration": {
                        "1": {
                            "SSID": { "_value": "Casa" },
                            "KeyPassphrase": { "_value": "segredo123" },
                            "Channel": { "_value": 6 },
                            "AutoChannelEnable": { "_value": false },
                            "Enable": { "_value": true },
                            "SSIDAdvertisementEnabled": { "_value": false },
                            "BeaconType": { "_value": "11i" }
                        },
                        "5": {
                            "SSID": { "_value": "Casa-5G" },
                            "AutoChannelEnable": { "_value": true }
                        }
                    }
                } },
                "WANDevice": { "1": { "WANConnectionDevice": { "1": { "WANPPPConnection": { "1": {
                    "Username": { "_value": "user@isp" },
                    "Password": { "_value": "ppp-secret" }
                } } } } } }
            }
        }))
    }

    #[test]
    fn extracts_all_sections() {
        let snap = extract(&tr098()).unwrap();
        assert_eq!(snap.serial_number, "SN42");
        assert_eq!(snap.device_id.as_deref(), Some("00259E-HG8245-SN42"));
        assert_eq!(snap.dialect, Dialect::Tr098);
        assert!(snap.auto_restore_enabled);
        assert!(!snap.active);

        assert_eq!(
            snap.wifi[&Band::Ghz24],
            WifiConfig {
                ssid: Some("Casa".into()),
                passphrase: Some("segredo123".into()),
                channel: Some(6),
                enabled: Some(true),
                hidden: Some(true),
                security_mode: Some("11i".into()),
            }
        );
        assert_eq!(snap.wifi[&Band::Ghz5].ssid.as_deref(), Some("Casa-5G"));
        assert_eq!(snap.wifi[&Band::Ghz5].channel, Some(0));

        assert_eq!(snap.wan.username.as_deref(), Some("user@isp"));
        assert_eq!(snap.wan.password.as_deref(), Some("ppp-secret"));
        assert_eq!(
            snap.lan,
            LanConfig {
                address: Some("192.168.1.1".into()),
                subnet_mask: Some("255.255.255.0".into()),
                dhcp_start: Some("192.168.1.100".into()),
                dhcp_end: Some("192.168.1.200".into()),
                lease_time: Some(86400),
            }
        );
    }

    #[test]
    fn instructions_follow_field_order_and_types() {
        let snap = extract(&tr098()).unwrap();
        let paths: Vec<(&str, &str, WireType)> = snap
            .instructions
            .iter()
            .map(|w| (w.path.as_str(), w.value.as_str(), w.wire_type))
            .collect();

        let intelbras_pass = format!("{WLAN}.1.PreSharedKey.1.PreSharedKey");
        let expected = vec![
            (format!("{WLAN}.1.SSID"), "Casa", WireType::String),
            (intelbras_pass, "segredo123", WireType::String),
            (format!("{WLAN}.1.Channel"), "6", WireType::UnsignedInt),
            (format!("{WLAN}.1.Enable"), "true", WireType::Boolean),
            // hidden stored negated, written back as the advertisement flag
            (format!("{WLAN}.1.SSIDAdvertisementEnabled"), "false", WireType::Boolean),
            (format!("{WLAN}.1.BeaconType"), "11i", WireType::String),
            (format!("{WLAN}.5.SSID"), "Casa-5G", WireType::String),
            (format!("{WLAN}.5.AutoChannelEnable"), "true", WireType::Boolean),
        ];
        for (i, (path, value, ty)) in expected.iter().enumerate() {
            assert_eq!(paths[i], (path.as_str(), *value, *ty), "instruction {i}");
        }

        let tail: Vec<&str> = paths[expected.len()..].iter().map(|p| p.0).collect();
        assert_eq!(
            tail,
            vec![
                "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.Username",
                "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.Password",
                "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.IPInterface.1.IPInterfaceIPAddress",
                "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.IPInterface.1.IPInterfaceSubnetMask",
                "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.MinAddress",
                "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.MaxAddress",
                "InternetGatewayDevice.LANDevice.1.LANHostConfigManagement.DHCPLeaseTime",
            ]
        );
        assert_eq!(snap.instructions.last().unwrap().wire_type, WireType::UnsignedInt);
    }

    #[test]
    fn tr181_bands_follow_radio_references() {
        let tree = DeviceTree::from_params([
            ("_deviceId._SerialNumber", "HW1"),
            ("Device.DeviceInfo.UpTime", "100"),
            ("Device.WiFi.Radio.1.OperatingFrequencyBand", "5GHz"),
            ("Device.WiFi.Radio.2.OperatingFrequencyBand", "2.4GHz"),
            ("Device.WiFi.SSID.1.LowerLayers", "Device.WiFi.Radio.1"),
            ("Device.WiFi.SSID.1.SSID", "Net-5G"),
            ("Device.WiFi.SSID.2.LowerLayers", "Device.WiFi.Radio.2"),
            ("Device.WiFi.SSID.2.SSID", "Net"),
            ("Device.WiFi.Radio.2.Channel", "11"),
        ]);
        let snap = extract(&tree).unwrap();
        assert_eq!(snap.dialect, Dialect::Tr181);
        assert_eq!(snap.wifi[&Band::Ghz24].ssid.as_deref(), Some("Net"));
        assert_eq!(snap.wifi[&Band::Ghz24].channel, Some(11));
        assert_eq!(snap.wifi[&Band::Ghz5].ssid.as_deref(), Some("Net-5G"));
        assert_eq!(snap.primary_ssid(), Some("Net"));
        assert!(
            snap.instructions
                .iter()
                .any(|w| w.path == "Device.WiFi.Radio.2.Channel" && w.value == "11")
        );
    }

    #[test]
    fn nothing_to_back_up() {
        let bare = DeviceTree::from_params([
            ("_deviceId._SerialNumber", "SN1"),
            ("InternetGatewayDevice.DeviceInfo.UpTime", "100"),
        ]);
        assert!(extract(&bare).is_none());

        let no_serial = DeviceTree::from_params([(
            "InternetGatewayDevice.LANDevice.1.WLANConfiguration.1.SSID",
            "Casa",
        )]);
        assert!(extract(&no_serial).is_none());
    }

    #[test]
    fn pppoe_only_is_enough() {
        let tree = DeviceTree::from_params([
            ("_deviceId._SerialNumber", "SN1"),
            (
                "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANPPPConnection.1.Username",
                "user@isp",
            ),
        ]);
        let snap = extract(&tree).unwrap();
        assert!(snap.wifi.is_empty());
        assert_eq!(snap.instructions.len(), 1);
    }

    #[test]
    fn unchanged_tree_hashes_identically() {
        let tree = tr098();
        let a = extract(&tree).unwrap();
        let b = extract(&tree).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.config_hash, b.config_hash);
        assert_eq!(a.config_hash.len(), 64);
    }
}
