//! Controller lifecycle state and setting descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a controller: `Uninitialized → Initializing → Ready → Destroyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Uninitialized,
    Initializing,
    Ready,
    Destroyed,
}

impl ControllerState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A setting a controller declares, with its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub label: String,
    pub default: String,
}

impl Setting {
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            default: default.into(),
        }
    }
}
