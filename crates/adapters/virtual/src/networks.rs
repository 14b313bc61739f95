//! Ready-made simulated networks for the daemon demo.

mod bridge;
mod mesh;

pub use bridge::{BRIGHTNESS, COLOR, POWER, bridge_demo};
pub use mesh::{RGBW_SIGNATURE, mesh_demo};
