// ── Band layout ──
//
// Maps 2.4 GHz / 5 GHz onto object indices. TR-181 numbers radios and
// SSIDs independently of frequency, so the layout is read from each
// radio's OperatingFrequencyBand and each SSID's LowerLayers reference.
// TR-098 has no frequency metadata; its conventional layout is probed.

use serde::Serialize;
use tracing::trace;

use super::detect::Dialect;
use super::resolve::IndexVars;
use crate::model::{Band, DeviceTree};

const TR181_RADIO: &str = "Device.WiFi.Radio";
const TR181_SSID: &str = "Device.WiFi.SSID";
const TR098_WLAN: &str = "InternetGatewayDevice.LANDevice.1.WLANConfiguration";

/// 5 GHz WLAN indices probed on TR-098 devices, in order.
const TR098_5GHZ_PROBES: [u32; 2] = [2, 5];

/// Radio and SSID object indices serving one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BandIndex {
    pub radio: u32,
    pub ssid: u32,
}

impl BandIndex {
    pub fn vars(self) -> IndexVars {
        IndexVars::new()
            .with("radio", self.radio)
            .with("ssid", self.ssid)
    }
}

/// Primary SSID per band. An absent band means Wi-Fi reads and writes for
/// it are no-ops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BandLayout {
    pub ghz24: Option<BandIndex>,
    pub ghz5: Option<BandIndex>,
}

impl BandLayout {
    pub fn get(&self, band: Band) -> Option<BandIndex> {
        match band {
            Band::Ghz24 => self.ghz24,
            Band::Ghz5 => self.ghz5,
        }
    }

    fn slot(&mut self, band: Band) -> &mut Option<BandIndex> {
        match band {
            Band::Ghz24 => &mut self.ghz24,
            Band::Ghz5 => &mut self.ghz5,
        }
    }
}

/// Resolve the band layout of a tree in the given dialect. Pure.
pub fn resolve_bands(tree: &DeviceTree, dialect: Dialect) -> BandLayout {
    match dialect {
        Dialect::Tr181 => resolve_tr181(tree),
        Dialect::Tr098 => resolve_tr098(tree),
    }
}

fn classify(band: &str) -> Option<Band> {
    if band.contains("2.4") {
        Some(Band::Ghz24)
    } else if band.contains('5') {
        Some(Band::Ghz5)
    } else {
        None
    }
}

fn resolve_tr181(tree: &DeviceTree) -> BandLayout {
    // Lowest-numbered radio claiming a band is authoritative.
    let mut radios: [Option<u32>; 2] = [None, None];
    for radio in tree.instances(TR181_RADIO) {
        let Some(declared) = tree
            .value(&format!("{TR181_RADIO}.{radio}.OperatingFrequencyBand"))
            .map(ToString::to_string)
        else {
            continue;
        };
        if let Some(band) = classify(&declared) {
            let slot = &mut radios[band_slot(band)];
            if slot.is_none() {
                trace!(radio, %band, "radio band");
                *slot = Some(radio);
            }
        }
    }

    // First SSID layered on a band's radio is that band's primary SSID.
    let mut layout = BandLayout::default();
    for ssid in tree.instances(TR181_SSID) {
        let Some(lower) = tree
            .value(&format!("{TR181_SSID}.{ssid}.LowerLayers"))
            .map(ToString::to_string)
        else {
            continue;
        };
        for band in [Band::Ghz24, Band::Ghz5] {
            let Some(radio) = radios[band_slot(band)] else {
                continue;
            };
            let slot = layout.slot(band);
            if slot.is_none() && references_radio(&lower, radio) {
                *slot = Some(BandIndex { radio, ssid });
            }
        }
    }
    layout
}

fn band_slot(band: Band) -> usize {
    match band {
        Band::Ghz24 => 0,
        Band::Ghz5 => 1,
    }
}

/// Whether a comma-separated LowerLayers list names `Device.WiFi.Radio.{radio}`.
/// Some firmware drops the `Device.` prefix or adds a trailing dot.
fn references_radio(lower_layers: &str, radio: u32) -> bool {
    let full = format!("{TR181_RADIO}.{radio}");
    let short = &full["Device.".len()..];
    lower_layers
        .split(',')
        .map(|r| r.trim().trim_end_matches('.'))
        .any(|r| r == full || r == short)
}

fn resolve_tr098(tree: &DeviceTree) -> BandLayout {
    let ghz24 = tree
        .node(&format!("{TR098_WLAN}.1"))
        .map(|_| BandIndex { radio: 1, ssid: 1 });

    let ghz5 = TR098_5GHZ_PROBES.iter().copied().find_map(|idx| {
        tree.value(&format!("{TR098_WLAN}.{idx}.SSID"))
            .filter(|v| !v.is_empty())
            .map(|_| BandIndex {
                radio: idx,
                ssid: idx,
            })
    });

    BandLayout { ghz24, ghz5 }
}
