//! Nodes and values exposed by controllers.
//!
//! A controller owns zero or more [`Node`]s; each node owns zero or more
//! [`Value`]s tagged with a [`ValueType`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Dimmer,
    BinarySwitch,
    SensorBinary,
    SensorMultilevel,
    Meter,
    Color,
    SceneActivation,
    GeneralCommand,
    Event,
    TimePeriod,
    SendNotification,
    Wait,
    Battery,
    Alarm,
    Thermostat,
    Unknown,
}

impl ValueType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dimmer => "dimmer",
            Self::BinarySwitch => "binary_switch",
            Self::SensorBinary => "sensor_binary",
            Self::SensorMultilevel => "sensor_multilevel",
            Self::Meter => "meter",
            Self::Color => "color",
            Self::SceneActivation => "scene_activation",
            Self::GeneralCommand => "general_command",
            Self::Event => "event",
            Self::TimePeriod => "time_period",
            Self::SendNotification => "send_notification",
            Self::Wait => "wait",
            Self::Battery => "battery",
            Self::Alarm => "alarm",
            Self::Thermostat => "thermostat",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One controllable or observable point on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub id: String,
    pub name: String,
    pub value_type: ValueType,
    /// Synthesized from other values of the same controller.
    #[serde(default)]
    pub is_virtual: bool,
}

impl Value {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value_type,
            is_virtual: false,
        }
    }

    #[must_use]
    pub fn virtual_value(
        id: impl Into<String>,
        name: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            is_virtual: true,
            ..Self::new(id, name, value_type)
        }
    }
}

/// Manufacturer / product signature of a physical node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeSignature {
    pub manufacturer_id: u16,
    pub product_type: u16,
    pub product_id: u16,
}

impl NodeSignature {
    #[must_use]
    pub const fn new(manufacturer_id: u16, product_type: u16, product_id: u16) -> Self {
        Self {
            manufacturer_id,
            product_type,
            product_id,
        }
    }
}

impl fmt::Display for NodeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#06x}/{:#06x}/{:#06x}",
            self.manufacturer_id, self.product_type, self.product_id
        )
    }
}

/// Logical grouping of values under one controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    /// Free-form device class ("Lights", "Scenes", "Binary Switch", …).
    pub kind: String,
    pub values: Vec<Value>,
}

impl Node {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: String::new(),
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.values.push(value);
        self
    }

    #[must_use]
    pub fn with_values(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.values.extend(values);
        self
    }

    #[must_use]
    pub fn value(&self, id: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.id == id)
    }
}
