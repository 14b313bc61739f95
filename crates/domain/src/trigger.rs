//! Trigger events forwarded to the automation collaborator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// Category of time-based triggers.
pub const CATEGORY_TIME: &str = "Time";
/// Category of music playback triggers.
pub const CATEGORY_MUSIC: &str = "Music";
/// Category of scene activation triggers.
pub const CATEGORY_SCENES: &str = "Scenes";
/// Category of physical value changes.
pub const CATEGORY_VALUE_CHANGED: &str = "ValueChanged";

/// A normalized `{category, key}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub category: String,
    pub key: String,
}

impl TriggerEvent {
    /// Build an event, trimming both parts.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidValue`] if either part is blank.
    pub fn new(category: impl AsRef<str>, key: impl AsRef<str>) -> Result<Self, HubError> {
        let category = category.as_ref().trim();
        let key = key.as_ref().trim();
        if category.is_empty() {
            return Err(HubError::invalid_value(category, "trigger category is blank"));
        }
        if key.is_empty() {
            return Err(HubError::invalid_value(key, "trigger key is blank"));
        }
        Ok(Self {
            category: category.to_string(),
            key: key.to_string(),
        })
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.key)
    }
}

/// The two astronomical events driving the time trigger cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolarEvent {
    Sunrise,
    Sunset,
}

impl SolarEvent {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Sunrise => Self::Sunset,
            Self::Sunset => Self::Sunrise,
        }
    }

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Sunrise => "Sunrise",
            Self::Sunset => "Sunset",
        }
    }

    /// The trigger published when this event fires.
    #[must_use]
    pub fn trigger(self) -> TriggerEvent {
        TriggerEvent {
            category: CATEGORY_TIME.to_string(),
            key: self.key().to_string(),
        }
    }
}

impl fmt::Display for SolarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
