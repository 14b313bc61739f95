use homelink_app::ports::{BackendNode, BackendValue};
use homelink_domain::node::{NodeSignature, ValueType};

use crate::SimulatedBackend;

/// Signature of the RGBW dimmer in the demo network.
pub const RGBW_SIGNATURE: NodeSignature = NodeSignature::new(0x010f, 0x0900, 0x1000);

/// A small mesh: a wall plug, a multisensor and an RGBW dimmer.
#[must_use]
pub fn mesh_demo() -> SimulatedBackend {
    SimulatedBackend::builder()
        .node(
            BackendNode::new("2", "Wall plug")
                .with_kind("Binary Switch")
                .with_value(BackendValue::new("37.1", "Switch", ValueType::BinarySwitch))
                .with_value(BackendValue::new("50.1", "Power", ValueType::Meter).with_unit("W")),
        )
        .value("2", "37.1", "off")
        .value("2", "50.1", "0")
        .node(
            BackendNode::new("3", "Multisensor")
                .with_kind("Sensor")
                .with_value(
                    BackendValue::new("49.1", "Temperature", ValueType::SensorMultilevel)
                        .with_unit("°C"),
                )
                .with_value(BackendValue::new("48.1", "Motion", ValueType::SensorBinary))
                .with_value(BackendValue::new("128.1", "Battery", ValueType::Battery).with_unit("%")),
        )
        .value("3", "49.1", "21.5")
        .value("3", "48.1", "false")
        .value("3", "128.1", "100")
        .node(
            BackendNode::new("4", "RGBW dimmer")
                .with_kind("Multilevel Switch")
                .with_signature(RGBW_SIGNATURE)
                .with_value(BackendValue::new("38.1", "Level", ValueType::Dimmer))
                .with_value(BackendValue::new("38.3", "Red", ValueType::Dimmer))
                .with_value(BackendValue::new("38.4", "Green", ValueType::Dimmer))
                .with_value(BackendValue::new("38.5", "Blue", ValueType::Dimmer))
                .with_value(BackendValue::new("38.6", "White", ValueType::Dimmer)),
        )
        .value("4", "38.1", "0")
        .value("4", "38.3", "0")
        .value("4", "38.4", "0")
        .value("4", "38.5", "0")
        .value("4", "38.6", "0")
        .scenes(1..=4)
        .build()
}
