use homelink_app::ports::{BackendNode, BackendValue};
use homelink_domain::node::ValueType;

use crate::SimulatedBackend;

/// Value id of a light's power switch.
pub const POWER: &str = "power";
/// Value id of a light's colour, `#rrggbb`.
pub const COLOR: &str = "color";
/// Value id of a light's brightness, `0..=254`.
pub const BRIGHTNESS: &str = "brightness";

fn light(id: &str, name: &str) -> BackendNode {
    BackendNode::new(id, name)
        .with_kind("Extended color light")
        .with_value(BackendValue::new(POWER, "Power", ValueType::BinarySwitch))
        .with_value(BackendValue::new(COLOR, "Colour", ValueType::Color))
        .with_value(BackendValue::new(BRIGHTNESS, "Brightness", ValueType::Dimmer))
}

/// A bridge with two colour lights, one of them lit.
#[must_use]
pub fn bridge_demo() -> SimulatedBackend {
    SimulatedBackend::builder()
        .username("homelink-demo")
        .node(light("1", "Living room"))
        .value("1", POWER, "on")
        .value("1", COLOR, "#ffd27f")
        .value("1", BRIGHTNESS, "254")
        .node(light("2", "Hallway"))
        .value("2", POWER, "off")
        .value("2", COLOR, "#ffffff")
        .value("2", BRIGHTNESS, "0")
        .build()
}
