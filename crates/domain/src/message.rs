//! Addressed messages exchanged between clients, the hub and controllers.
//!
//! Every message carries a [`ControlAddress`], a `broadcast` flag and a
//! kind-specific [`Payload`]. On the wire the kind is the `type` tag:
//!
//! ```json
//! {"address": {"controller": "mesh", "node": "7", "value": "38.3"},
//!  "broadcast": false, "type": "set_value", "value": "on"}
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::ControlAddress;
use crate::error::HubError;
use crate::history::{Aggregate, HistoryPoint, Period};
use crate::node::ValueType;

/// Severity of a [`Payload::ClientNotice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Information,
    Warning,
    Error,
}

/// Kind-specific content of an [`AddressedMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// A client device announces itself.
    Register { device_id: String, name: String },
    /// Write a raw value to the addressed point.
    SetValue { value: String },
    /// Trigger the addressed action (scene, command, …).
    Activate {
        #[serde(default)]
        parameters: BTreeMap<String, String>,
    },
    /// The addressed point now holds `value`.
    ValueChanged {
        value: String,
        #[serde(default)]
        unit: String,
        value_type: ValueType,
    },
    /// Ask for recorded values of the addressed point.
    HistoryRequest {
        period: Period,
        #[serde(default)]
        aggregate: Aggregate,
        #[serde(default)]
        offset: u32,
        amount: u32,
    },
    /// Answer to a [`Payload::HistoryRequest`].
    HistoryResult {
        title: String,
        unit: String,
        offset: u32,
        points: Vec<HistoryPoint>,
    },
    /// Human-readable information for the user.
    ClientNotice { level: NoticeLevel, content: String },
}

/// Discriminant of a [`Payload`], handy for logging and routing tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Register,
    SetValue,
    Activate,
    ValueChanged,
    HistoryRequest,
    HistoryResult,
    ClientNotice,
}

impl MessageKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::SetValue => "set_value",
            Self::Activate => "activate",
            Self::ValueChanged => "value_changed",
            Self::HistoryRequest => "history_request",
            Self::HistoryResult => "history_result",
            Self::ClientNotice => "client_notice",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Payload {
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Register { .. } => MessageKind::Register,
            Self::SetValue { .. } => MessageKind::SetValue,
            Self::Activate { .. } => MessageKind::Activate,
            Self::ValueChanged { .. } => MessageKind::ValueChanged,
            Self::HistoryRequest { .. } => MessageKind::HistoryRequest,
            Self::HistoryResult { .. } => MessageKind::HistoryResult,
            Self::ClientNotice { .. } => MessageKind::ClientNotice,
        }
    }
}

/// The wire-neutral envelope routed by the hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressedMessage {
    pub address: ControlAddress,
    /// Fan the message out to every connected client instead of replying.
    #[serde(default)]
    pub broadcast: bool,
    #[serde(flatten)]
    pub payload: Payload,
}

impl AddressedMessage {
    #[must_use]
    pub fn new(address: ControlAddress, payload: Payload) -> Self {
        Self {
            address,
            broadcast: false,
            payload,
        }
    }

    #[must_use]
    pub fn set_value(address: ControlAddress, value: impl Into<String>) -> Self {
        Self::new(
            address,
            Payload::SetValue {
                value: value.into(),
            },
        )
    }

    #[must_use]
    pub fn activate(address: ControlAddress) -> Self {
        Self::new(
            address,
            Payload::Activate {
                parameters: BTreeMap::new(),
            },
        )
    }

    #[must_use]
    pub fn value_changed(
        address: ControlAddress,
        value: impl Into<String>,
        unit: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self::new(
            address,
            Payload::ValueChanged {
                value: value.into(),
                unit: unit.into(),
                value_type,
            },
        )
    }

    #[must_use]
    pub fn notice(address: ControlAddress, level: NoticeLevel, content: impl Into<String>) -> Self {
        Self::new(
            address,
            Payload::ClientNotice {
                level,
                content: content.into(),
            },
        )
    }

    /// Set the broadcast flag.
    #[must_use]
    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Add an activation parameter. No-op for non-`Activate` payloads.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Payload::Activate { parameters } = &mut self.payload {
            parameters.insert(key.into(), value.into());
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    /// Serialize to the self-describing JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Malformed`] if serialization fails.
    pub fn to_json(&self) -> Result<String, HubError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode one message from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Malformed`] if `raw` is not a valid message.
    pub fn from_json(raw: &str) -> Result<Self, HubError> {
        Ok(serde_json::from_str(raw)?)
    }
}
