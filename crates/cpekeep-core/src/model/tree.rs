// ── Device parameter tree ──
//
// Read-only view of one device document as reported by the ACS. Every
// walk pattern-matches on `Node`; a leaf or missing key met mid-path is
// simply "absent".

use std::collections::BTreeMap;

use serde_json::Value;

use super::value::ParamValue;

/// GenieACS attribute keys that describe a node rather than name a child.
const META_KEYS: &[&str] = &["_object", "_writable", "_timestamp", "_type", "_value"];

/// One node of the parameter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Inner(BTreeMap<String, Node>),
    Leaf(Leaf),
}

/// Terminal parameter: its value (if reported) and declared XSD type.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub value: Option<ParamValue>,
    pub declared_type: Option<String>,
}

impl Node {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) if map.contains_key("_value") => Some(Self::Leaf(Leaf {
                value: map.get("_value").and_then(ParamValue::from_json),
                declared_type: map.get("_type").and_then(Value::as_str).map(String::from),
            })),
            Value::Object(map) => {
                let children = map
                    .iter()
                    .filter(|(k, _)| !META_KEYS.contains(&k.as_str()))
                    .filter_map(|(k, v)| Node::from_json(v).map(|n| (k.clone(), n)))
                    .collect();
                Some(Self::Inner(children))
            }
            Value::Array(_) => None,
            scalar => Some(Self::Leaf(Leaf {
                value: ParamValue::from_json(scalar),
                declared_type: None,
            })),
        }
    }

    /// Children of an inner node; empty for a leaf.
    pub fn children(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Self::Inner(map) => Some(map),
            Self::Leaf(_) => None,
        }
    }
}

/// A device's full parameter tree plus its ACS identity.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTree {
    root: BTreeMap<String, Node>,
}

impl DeviceTree {
    /// Build from an ACS device document.
    ///
    /// Objects carrying `_value` become leaves, other objects become inner
    /// nodes, bare scalars become leaves. Non-object documents yield an
    /// empty tree.
    pub fn from_json(doc: &Value) -> Self {
        let root = match Node::from_json(doc) {
            Some(Node::Inner(map)) => map,
            _ => BTreeMap::new(),
        };
        Self { root }
    }

    /// Build from `(dotted.path, value)` pairs.
    pub fn from_params<I, P, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (P, V)>,
        P: AsRef<str>,
        V: Into<ParamValue>,
    {
        let mut root = BTreeMap::new();
        for (path, value) in params {
            insert(&mut root, path.as_ref(), value.into());
        }
        Self { root }
    }

    pub fn root(&self) -> &BTreeMap<String, Node> {
        &self.root
    }

    /// Walk dot-separated segments to a node.
    pub fn node(&self, path: &str) -> Option<&Node> {
        let mut segments = path.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = current.children()?.get(segment)?;
        }
        Some(current)
    }

    /// Leaf at `path`, if the path ends on one.
    pub fn lookup(&self, path: &str) -> Option<&Leaf> {
        match self.node(path)? {
            Node::Leaf(leaf) => Some(leaf),
            Node::Inner(_) => None,
        }
    }

    /// Reported value at `path`. `null` and missing values are `None`.
    pub fn value(&self, path: &str) -> Option<&ParamValue> {
        self.lookup(path)?.value.as_ref()
    }

    /// Numeric instance keys directly under `path`, ascending.
    pub fn instances(&self, path: &str) -> Vec<u32> {
        let Some(children) = self.node(path).and_then(Node::children) else {
            return Vec::new();
        };
        let mut indices: Vec<u32> = children.keys().filter_map(|k| k.parse().ok()).collect();
        indices.sort_unstable();
        indices
    }

    // ── Identity ─────────────────────────────────────────────────────

    /// ACS device id (`_id`).
    pub fn device_id(&self) -> Option<String> {
        self.text("_id")
    }

    /// Serial number from the ACS identity block, else the device's own
    /// `DeviceInfo.SerialNumber`.
    pub fn serial_number(&self) -> Option<String> {
        self.text("_deviceId._SerialNumber").or_else(|| {
            self.text("InternetGatewayDevice.DeviceInfo.SerialNumber")
                .or_else(|| self.text("Device.DeviceInfo.SerialNumber"))
        })
    }

    pub fn manufacturer(&self) -> Option<String> {
        self.text("_deviceId._Manufacturer").or_else(|| {
            self.text("InternetGatewayDevice.DeviceInfo.Manufacturer")
                .or_else(|| self.text("Device.DeviceInfo.Manufacturer"))
        })
    }

    pub fn product_class(&self) -> Option<String> {
        self.text("_deviceId._ProductClass")
    }

    fn text(&self, path: &str) -> Option<String> {
        self.value(path)
            .filter(|v| !v.is_empty())
            .map(ParamValue::as_text)
    }
}

fn insert(map: &mut BTreeMap<String, Node>, path: &str, value: ParamValue) {
    match path.split_once('.') {
        None => {
            map.insert(
                path.to_owned(),
                Node::Leaf(Leaf {
                    value: Some(value),
                    declared_type: None,
                }),
            );
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_owned())
                .or_insert_with(|| Node::Inner(BTreeMap::new()));
            if let Node::Leaf(_) = entry {
                *entry = Node::Inner(BTreeMap::new());
            }
            if let Node::Inner(children) = entry {
                insert(children, rest, value);
            }
        }
    }
}
