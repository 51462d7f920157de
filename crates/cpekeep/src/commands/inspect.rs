//! Offline analysis of a device document.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use cpekeep_core::backup::extract_with;
use cpekeep_core::normalize::{BandLayout, DetectionRule};
use cpekeep_core::{
    Accessor, Band, ConfigSnapshot, Detection, DeviceTree, IndexVars, Observation, ParamValue,
};

use crate::cli::{GlobalOpts, InspectArgs};
use crate::error::CliError;
use crate::output;

use super::paths;

/// Everything the engine derives from one tree.
#[derive(Debug, Serialize)]
pub struct Inspection {
    pub device_id: Option<String>,
    pub serial: Option<String>,
    pub manufacturer: Option<String>,
    pub product_class: Option<String>,
    pub detection: Detection,
    pub bands: BandLayout,
    pub observation: Observation,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ConfigSnapshot>,
}

impl Inspection {
    pub fn of(tree: &DeviceTree) -> Self {
        let acc = Accessor::new(tree);
        Self {
            device_id: tree.device_id(),
            serial: tree.serial_number(),
            manufacturer: tree.manufacturer(),
            product_class: tree.product_class(),
            detection: acc.detection(),
            bands: acc.bands(),
            observation: Observation::from_accessor(&acc),
            values: BTreeMap::new(),
            snapshot: extract_with(&acc),
        }
    }
}

pub fn handle(args: &InspectArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let raw = std::fs::read_to_string(&args.file)?;
    let doc = single_document(serde_json::from_str(&raw)?)?;
    let tree = DeviceTree::from_json(&doc);

    let mut inspection = Inspection::of(&tree);
    let acc = Accessor::new(&tree);
    let none = IndexVars::new();
    for logical in &args.get {
        paths::ensure_known(logical)?;
        let value = if logical.starts_with("wifi.") {
            acc.get_band(&[logical.as_str()], args.band)
        } else {
            acc.get(logical, &none)
        };
        inspection
            .values
            .insert(logical.clone(), value.map(ParamValue::as_text));
    }

    let out = output::render_single(&global.output, &inspection, detail, |i| {
        i.detection.dialect.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// The NBI answers queries with arrays; accept either shape.
fn single_document(doc: Value) -> Result<Value, CliError> {
    match doc {
        Value::Array(mut items) if !items.is_empty() => Ok(items.swap_remove(0)),
        Value::Object(_) => Ok(doc),
        _ => Err(CliError::Validation {
            field: "file".into(),
            reason: "expected a device document or a non-empty array of them".into(),
        }),
    }
}

pub fn rule(rule: DetectionRule) -> String {
    match rule {
        DetectionRule::Structural => "tree structure".into(),
        DetectionRule::VendorName(f) => format!("manufacturer matches '{f}'"),
        DetectionRule::ProductClass(f) => format!("product class matches '{f}'"),
        DetectionRule::Default => "default".into(),
    }
}

pub fn band_line(bands: &BandLayout, band: Band) -> String {
    bands.get(band).map_or_else(
        || "-".into(),
        |b| format!("radio {} / ssid {}", b.radio, b.ssid),
    )
}

fn detail(i: &Inspection) -> String {
    let mut lines = vec![
        format!("Device:        {}", output::or_dash(i.device_id.as_deref())),
        format!("Serial:        {}", output::or_dash(i.serial.as_deref())),
        format!("Manufacturer:  {}", output::or_dash(i.manufacturer.as_deref())),
        format!("Product class: {}", output::or_dash(i.product_class.as_deref())),
        format!(
            "Dialect:       {} ({})",
            i.detection.dialect,
            rule(i.detection.rule)
        ),
        format!("2.4GHz:        {}", band_line(&i.bands, Band::Ghz24)),
        format!("5GHz:          {}", band_line(&i.bands, Band::Ghz5)),
        format!(
            "Uptime:        {}",
            i.observation
                .uptime
                .map_or_else(|| "-".into(), |u| format!("{u}s"))
        ),
        format!("SSID:          {}", output::or_dash(i.observation.ssid.as_deref())),
        format!(
            "PPPoE user:    {}",
            output::or_dash(i.observation.pppoe_username.as_deref())
        ),
    ];
    for (logical, value) in &i.values {
        lines.push(format!("{logical} = {}", output::or_dash(value.as_deref())));
    }
    match &i.snapshot {
        Some(s) => {
            lines.push(format!(
                "Backup:        {} instructions, hash {}",
                s.instructions.len(),
                s.config_hash.get(..12).unwrap_or(&s.config_hash)
            ));
            for ins in &s.instructions {
                lines.push(format!("  {} = {} ({})", ins.path, ins.value, ins.wire_type));
            }
        }
        None => lines.push("Backup:        nothing to back up".into()),
    }
    lines.join("\n")
}
