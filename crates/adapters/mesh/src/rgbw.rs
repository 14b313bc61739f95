//! RGBW dimmer colour, synthesized from the dimmer's channel levels.

use std::collections::BTreeMap;

use homelink_app::synthesizer::VirtualRecipe;
use homelink_domain::color::{Rgb, scale_channel};
use homelink_domain::error::HubError;
use homelink_domain::node::{NodeSignature, ValueType};

/// Value id of the synthesized colour.
pub const VALUE_ID: &str = "virt_rgbw_color";

/// Default top of the dimmer's channel range.
pub const DEFAULT_SCALE: u8 = 99;

const SIGNATURE: NodeSignature = NodeSignature::new(0x010f, 0x0900, 0x1000);

const LEVEL: &str = "38.1";
const RED: &str = "38.3";
const GREEN: &str = "38.4";
const BLUE: &str = "38.5";
const WHITE: &str = "38.6";

const INPUTS: [&str; 5] = [LEVEL, RED, GREEN, BLUE, WHITE];

/// Colour of an RGBW dimmer whose channels run on `0..=scale`.
///
/// Reads rebuild the colour from red, green and blue. Writes set the three
/// channels, then the master level to the strongest channel.
#[derive(Debug, Clone, Copy)]
pub struct RgbwRecipe {
    scale: u8,
}

impl Default for RgbwRecipe {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE)
    }
}

impl RgbwRecipe {
    #[must_use]
    pub const fn new(scale: u8) -> Self {
        Self { scale }
    }

    #[must_use]
    pub const fn scale(&self) -> u8 {
        self.scale
    }
}

fn channel(inputs: &BTreeMap<String, String>, id: &str) -> Option<u8> {
    inputs.get(id)?.trim().parse().ok()
}

impl VirtualRecipe for RgbwRecipe {
    fn value_id(&self) -> &str {
        VALUE_ID
    }

    fn name(&self) -> &str {
        "Colour"
    }

    fn value_type(&self) -> ValueType {
        ValueType::Color
    }

    fn applies_to(&self, signature: &NodeSignature) -> bool {
        *signature == SIGNATURE
    }

    fn inputs(&self) -> &[&str] {
        &INPUTS
    }

    fn derive(&self, inputs: &BTreeMap<String, String>) -> Option<String> {
        let channels = [
            channel(inputs, RED)?,
            channel(inputs, GREEN)?,
            channel(inputs, BLUE)?,
        ];
        Some(Rgb::from_scaled(channels, self.scale).to_hex())
    }

    fn decompose(&self, raw: &str) -> Result<Vec<(String, String)>, HubError> {
        let color: Rgb = raw.parse()?;
        let [r, g, b] = color.scaled(self.scale);
        let level = scale_channel(color.r.max(color.g).max(color.b), self.scale);
        Ok(vec![
            (RED.to_string(), r.to_string()),
            (GREEN.to_string(), g.to_string()),
            (BLUE.to_string(), b.to_string()),
            (LEVEL.to_string(), level.to_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writes(recipe: &RgbwRecipe, raw: &str) -> Vec<(String, String)> {
        recipe.decompose(raw).unwrap()
    }

    fn pair(id: &str, value: &str) -> (String, String) {
        (id.to_string(), value.to_string())
    }

    #[test]
    fn should_scale_channels_then_set_level_to_strongest() {
        let recipe = RgbwRecipe::default();
        assert_eq!(
            writes(&recipe, "#FF8000"),
            vec![
                pair(RED, "99"),
                pair(GREEN, "50"),
                pair(BLUE, "0"),
                pair(LEVEL, "99"),
            ]
        );
    }

    #[test]
    fn should_accept_hex_and_decimal_forms() {
        let recipe = RgbwRecipe::default();
        assert_eq!(writes(&recipe, "0x000080"), writes(&recipe, "128"));
        assert_eq!(writes(&recipe, "128")[3], pair(LEVEL, "50"));
    }

    #[test]
    fn should_switch_level_off_for_black() {
        let recipe = RgbwRecipe::default();
        assert_eq!(writes(&recipe, "#000000")[3], pair(LEVEL, "0"));
    }

    #[test]
    fn should_use_configured_scale() {
        let recipe = RgbwRecipe::new(255);
        assert_eq!(writes(&recipe, "#102030")[0], pair(RED, "16"));
    }

    #[test]
    fn should_reject_unparsable_colour() {
        let recipe = RgbwRecipe::default();
        assert!(matches!(
            recipe.decompose("teal"),
            Err(HubError::InvalidValue { .. })
        ));
    }

    #[test]
    fn should_rebuild_colour_from_red_green_blue() {
        let recipe = RgbwRecipe::default();
        let inputs: BTreeMap<String, String> = [
            (LEVEL, "99"),
            (RED, "99"),
            (GREEN, "50"),
            (BLUE, "0"),
            (WHITE, "12"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(recipe.derive(&inputs).as_deref(), Some("#ff8100"));
    }

    #[test]
    fn should_not_derive_without_every_colour_channel() {
        let recipe = RgbwRecipe::default();
        let inputs = BTreeMap::from([(RED.to_string(), "10".to_string())]);
        assert!(recipe.derive(&inputs).is_none());
    }

    #[test]
    fn should_apply_only_to_rgbw_dimmer() {
        let recipe = RgbwRecipe::default();
        assert!(recipe.applies_to(&NodeSignature::new(0x010f, 0x0900, 0x1000)));
        assert!(!recipe.applies_to(&NodeSignature::new(0x010f, 0x0600, 0x1000)));
    }
}
