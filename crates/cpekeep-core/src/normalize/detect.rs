// ── Dialect detection ──
//
// Ordered rule list, first match wins:
//   1. structural markers in the tree
//   2. manufacturer name fragment
//   3. product class fragment
//   4. default (TR-098)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::model::{DeviceTree, Node};

/// Maximum nesting depth searched for structural markers.
const STRUCTURAL_DEPTH: usize = 4;

/// The two TR-069 object-tree shapes a CPE may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Dialect {
    /// Rooted `InternetGatewayDevice.` tree.
    #[serde(rename = "TR-098")]
    #[strum(to_string = "TR-098", serialize = "tr098", serialize = "a")]
    Tr098,
    /// Flat `Device.` tree.
    #[serde(rename = "TR-181")]
    #[strum(to_string = "TR-181", serialize = "tr181", serialize = "b")]
    Tr181,
}

impl Dialect {
    pub fn other(self) -> Self {
        match self {
            Self::Tr098 => Self::Tr181,
            Self::Tr181 => Self::Tr098,
        }
    }
}

/// Which rule decided the dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "fragment", rename_all = "kebab-case")]
pub enum DetectionRule {
    Structural,
    VendorName(&'static str),
    ProductClass(&'static str),
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub dialect: Dialect,
    pub rule: DetectionRule,
}

/// Manufacturer fragments, matched case-insensitively in table order.
pub const VENDOR_DIALECTS: &[(&str, Dialect)] = &[
    ("tp-link", Dialect::Tr098),
    ("tplink", Dialect::Tr098),
    ("tp link", Dialect::Tr098),
    ("intelbras", Dialect::Tr098),
    ("multilaser", Dialect::Tr098),
    ("dlink", Dialect::Tr098),
    ("d-link", Dialect::Tr098),
    ("tenda", Dialect::Tr098),
    ("mercusys", Dialect::Tr098),
    ("zyxel", Dialect::Tr098),
    ("netgear", Dialect::Tr098),
    ("linksys", Dialect::Tr098),
    ("asus", Dialect::Tr098),
    ("huawei", Dialect::Tr181),
    ("hua wei", Dialect::Tr181),
    ("fiberhome", Dialect::Tr181),
    ("fiber home", Dialect::Tr181),
    ("zte", Dialect::Tr181),
    ("nokia", Dialect::Tr181),
    ("alcatel", Dialect::Tr181),
    ("alcatel-lucent", Dialect::Tr181),
    ("calix", Dialect::Tr181),
    ("sagemcom", Dialect::Tr181),
    ("technicolor", Dialect::Tr181),
    ("zhone", Dialect::Tr181),
    ("adtran", Dialect::Tr181),
];

/// Product-class fragments: older ZTE units speak TR-098, Huawei HG/EG
/// series speak TR-181.
const PRODUCT_CLASS_DIALECTS: &[(&str, Dialect)] = &[
    ("h196", Dialect::Tr098),
    ("f660", Dialect::Tr098),
    ("hg", Dialect::Tr181),
    ("eg", Dialect::Tr181),
];

/// Classify a device tree. Never fails; no evidence yields TR-098.
pub fn detect(tree: &DeviceTree) -> Detection {
    let (flat, rooted) = structural_markers(tree.root(), STRUCTURAL_DEPTH);
    if flat {
        return Detection {
            dialect: Dialect::Tr181,
            rule: DetectionRule::Structural,
        };
    }
    if rooted {
        return Detection {
            dialect: Dialect::Tr098,
            rule: DetectionRule::Structural,
        };
    }

    if let Some(manufacturer) = tree.manufacturer() {
        if let Some((fragment, dialect)) = match_fragment(VENDOR_DIALECTS, &manufacturer) {
            return Detection {
                dialect,
                rule: DetectionRule::VendorName(fragment),
            };
        }
    }

    if let Some(class) = tree.product_class() {
        if let Some((fragment, dialect)) = match_fragment(PRODUCT_CLASS_DIALECTS, &class) {
            return Detection {
                dialect,
                rule: DetectionRule::ProductClass(fragment),
            };
        }
    }

    Detection {
        dialect: Dialect::Tr098,
        rule: DetectionRule::Default,
    }
}

/// Dialect only, for callers that do not care which rule fired.
pub fn detect_dialect(tree: &DeviceTree) -> Dialect {
    detect(tree).dialect
}

fn match_fragment(
    table: &'static [(&'static str, Dialect)],
    haystack: &str,
) -> Option<(&'static str, Dialect)> {
    let haystack = haystack.trim().to_lowercase();
    table
        .iter()
        .find(|(fragment, _)| haystack.contains(fragment))
        .copied()
}

/// `(flat, rooted)`: whether a `Device` node with a `DeviceInfo` child and
/// an `InternetGatewayDevice` key appear within `depth` levels.
fn structural_markers(map: &BTreeMap<String, Node>, depth: usize) -> (bool, bool) {
    if depth == 0 {
        return (false, false);
    }
    let mut flat = false;
    let mut rooted = false;
    for (key, node) in map {
        let children = node.children();
        if key == "InternetGatewayDevice" {
            rooted = true;
        }
        if key == "Device" && children.is_some_and(|c| c.contains_key("DeviceInfo")) {
            flat = true;
        }
        if flat {
            break;
        }
        if let Some(children) = children {
            let (f, r) = structural_markers(children, depth - 1);
            flat |= f;
            rooted |= r;
        }
    }
    (flat, rooted)
}
