// ── Northbound wire types ──
//
// Shapes exchanged with the ACS northbound interface. Device documents
// are passed through as raw `serde_json::Value`; interpretation belongs
// to `cpekeep-core`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// XSD type tag attached to every written parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum WireType {
    #[serde(rename = "xsd:boolean")]
    #[strum(serialize = "xsd:boolean")]
    Boolean,
    #[serde(rename = "xsd:unsignedInt")]
    #[strum(serialize = "xsd:unsignedInt")]
    UnsignedInt,
    #[serde(rename = "xsd:string")]
    #[strum(serialize = "xsd:string")]
    String,
}

/// One `(path, value, type)` triple of a `setParameterValues` task.
///
/// Serialized as a three-element JSON array, which is what the NBI expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "(String, String, WireType)",
    into = "(String, String, WireType)"
)]
pub struct ParameterValue {
    pub path: String,
    pub value: String,
    pub wire_type: WireType,
}

impl ParameterValue {
    pub fn new(path: impl Into<String>, value: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
            wire_type,
        }
    }
}

impl From<(String, String, WireType)> for ParameterValue {
    fn from((path, value, wire_type): (String, String, WireType)) -> Self {
        Self {
            path,
            value,
            wire_type,
        }
    }
}

impl From<ParameterValue> for (String, String, WireType) {
    fn from(p: ParameterValue) -> Self {
        (p.path, p.value, p.wire_type)
    }
}

/// A device task submitted through `POST /devices/{id}/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum Task {
    #[serde(rename = "setParameterValues")]
    SetParameterValues {
        #[serde(rename = "parameterValues")]
        parameter_values: Vec<ParameterValue>,
    },
    #[serde(rename = "refreshObject")]
    RefreshObject {
        #[serde(rename = "objectName")]
        object_name: String,
    },
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetParameterValues { .. } => "setParameterValues",
            Self::RefreshObject { .. } => "refreshObject",
        }
    }
}

/// ACS acknowledgement of an accepted task.
///
/// `queued` is `true` when the ACS stored the task but the device did not
/// pick it up during the connection request (HTTP 202). Either way the
/// write is confirmed asynchronously by the device's next session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAck {
    pub task_id: Option<String>,
    pub queued: bool,
}

/// Body echoed back by the NBI on task creation.
#[derive(Debug, Deserialize)]
pub(crate) struct TaskEcho {
    #[serde(rename = "_id")]
    pub id: Option<String>,
}

/// Projection row returned by `GET /devices/?projection=_id`.
#[derive(Debug, Deserialize)]
pub(crate) struct DeviceIdRow {
    #[serde(rename = "_id")]
    pub id: String,
}
