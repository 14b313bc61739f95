//! RGB colour values and the channel math used by lighting backends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// An 8-bit-per-channel colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[must_use]
    pub fn from_u32(packed: u32) -> Self {
        let [_, r, g, b] = packed.to_be_bytes();
        Self { r, g, b }
    }

    #[must_use]
    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes([0, self.r, self.g, self.b])
    }

    /// `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    #[must_use]
    pub fn is_black(self) -> bool {
        self == Self::BLACK
    }

    /// Brightness in `0.0..=1.0`: the strongest channel.
    #[must_use]
    pub fn brightness(self) -> f64 {
        f64::from(self.r.max(self.g).max(self.b)) / 255.0
    }

    /// Each channel scaled from `0..=255` onto `0..=scale`.
    #[must_use]
    pub fn scaled(self, scale: u8) -> [u8; 3] {
        [
            scale_channel(self.r, scale),
            scale_channel(self.g, scale),
            scale_channel(self.b, scale),
        ]
    }

    /// Rebuild a colour from channels expressed on `0..=scale`.
    #[must_use]
    pub fn from_scaled(channels: [u8; 3], scale: u8) -> Self {
        let [r, g, b] = channels.map(|c| unscale_channel(c, scale));
        Self { r, g, b }
    }
}

/// `round(channel / 255 * scale)`.
#[must_use]
pub fn scale_channel(channel: u8, scale: u8) -> u8 {
    let scaled = (f64::from(channel) / 255.0 * f64::from(scale)).round();
    clamp_u8(scaled)
}

/// Inverse of [`scale_channel`]; levels above `scale` saturate.
#[must_use]
pub fn unscale_channel(level: u8, scale: u8) -> u8 {
    if scale == 0 {
        return 0;
    }
    let unscaled = (f64::from(level.min(scale)) / f64::from(scale) * 255.0).round();
    clamp_u8(unscaled)
}

/// Brightness `0.0..=1.0` mapped onto `0..=max`.
#[must_use]
pub fn brightness_level(brightness: f64, max: u8) -> u8 {
    clamp_u8((brightness.clamp(0.0, 1.0) * f64::from(max)).round())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_u8(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = HubError;

    /// Accepts `#RRGGBB`, `0xRRGGBB` and a decimal packed integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let packed = if let Some(hex) = trimmed.strip_prefix('#') {
            if hex.len() != 6 {
                return Err(HubError::invalid_value(s, "expected #RRGGBB"));
            }
            u32::from_str_radix(hex, 16)
                .map_err(|_| HubError::invalid_value(s, "invalid hex colour"))?
        } else if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            u32::from_str_radix(hex, 16)
                .map_err(|_| HubError::invalid_value(s, "invalid hex colour"))?
        } else {
            trimmed
                .parse::<u32>()
                .map_err(|_| HubError::invalid_value(s, "not a colour"))?
        };
        if packed > 0x00FF_FFFF {
            return Err(HubError::invalid_value(s, "colour out of range"));
        }
        Ok(Self::from_u32(packed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_all_supported_notations() {
        let expected = Rgb::new(0x12, 0x34, 0x56);
        assert_eq!("#123456".parse::<Rgb>().unwrap(), expected);
        assert_eq!("0x123456".parse::<Rgb>().unwrap(), expected);
        assert_eq!("1193046".parse::<Rgb>().unwrap(), expected);
    }

    #[test]
    fn should_reject_out_of_range_and_garbage() {
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("0x1000000".parse::<Rgb>().is_err());
        assert!("purple".parse::<Rgb>().is_err());
    }

    #[test]
    fn should_format_as_lowercase_hex() {
        assert_eq!(Rgb::new(255, 0, 171).to_hex(), "#ff00ab");
    }

    #[test]
    fn should_use_strongest_channel_as_brightness() {
        assert!((Rgb::new(0, 0, 255).brightness() - 1.0).abs() < f64::EPSILON);
        assert!((Rgb::new(51, 102, 0).brightness() - 0.4).abs() < 1e-9);
        assert!(Rgb::BLACK.brightness().abs() < f64::EPSILON);
    }

    #[test]
    fn should_scale_channels_onto_device_range() {
        assert_eq!(Rgb::new(255, 128, 0).scaled(99), [99, 50, 0]);
    }

    #[test]
    fn should_recover_full_channels_from_scaled_values() {
        let rebuilt = Rgb::from_scaled([99, 0, 99], 99);
        assert_eq!(rebuilt, Rgb::new(255, 0, 255));
    }

    #[test]
    fn should_map_brightness_to_bridge_range() {
        assert_eq!(brightness_level(1.0, 254), 254);
        assert_eq!(brightness_level(0.5, 254), 127);
        assert_eq!(brightness_level(2.0, 254), 254);
    }
}
