//! Protocol backend port — typed access to one physical device network.
//!
//! Backends only know nodes and values; the owning controller adds its own
//! identifier to build full [`ControlAddress`]es.

use std::future::Future;

use tokio::sync::broadcast;

use homelink_domain::address::ControlAddress;
use homelink_domain::error::HubError;
use homelink_domain::node::{NodeSignature, ValueType};

/// Connection parameters handed to [`ProtocolBackend::connect`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectParams {
    /// Network address, serial port, … (backend specific, may be empty).
    pub endpoint: String,
    /// Credentials from a previous handshake, empty on first contact.
    pub username: String,
}

/// Outcome of a successful handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Username negotiated with the device, to be stored for next time.
    pub username: String,
}

/// One value exposed by a backend node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendValue {
    pub id: String,
    pub name: String,
    pub value_type: ValueType,
    pub unit: String,
}

impl BackendValue {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value_type,
            unit: String::new(),
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }
}

/// One physical node as reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendNode {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub signature: Option<NodeSignature>,
    pub values: Vec<BackendValue>,
}

impl BackendNode {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: String::new(),
            signature: None,
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    #[must_use]
    pub fn with_signature(mut self, signature: NodeSignature) -> Self {
        self.signature = Some(signature);
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: BackendValue) -> Self {
        self.values.push(value);
        self
    }

    #[must_use]
    pub fn value(&self, id: &str) -> Option<&BackendValue> {
        self.values.iter().find(|v| v.id == id)
    }
}

/// Pushed by a backend whenever physical state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChange {
    pub node_id: String,
    pub value_id: String,
    pub value: String,
    pub unit: String,
    pub value_type: ValueType,
}

impl ValueChange {
    /// Full address of the changed value under `controller`.
    #[must_use]
    pub fn address(&self, controller: &str) -> ControlAddress {
        ControlAddress::new(controller, &self.node_id, &self.value_id)
    }
}

/// Network-wide commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCommand {
    AllOn,
    AllOff,
    ActivateScene(u8),
}

/// A device network driven by one controller.
///
/// `get_value` and `nodes` read the backend's local snapshot and never block
/// on device IO; writes and commands are async.
pub trait ProtocolBackend: Send + Sync + 'static {
    /// Perform the handshake.
    fn connect(
        &self,
        params: ConnectParams,
    ) -> impl Future<Output = Result<Session, HubError>> + Send;

    /// Whether the handshake completed and the link is up.
    fn is_connected(&self) -> bool;

    /// Snapshot of every known node.
    fn nodes(&self) -> Vec<BackendNode>;

    /// Last known raw value. Only `node_id` and `value_id` are read.
    fn get_value(&self, address: &ControlAddress) -> Option<String>;

    /// Write a raw value. Returns `false` when the device rejected it.
    fn set_value(&self, address: &ControlAddress, value: &str)
    -> impl Future<Output = bool> + Send;

    /// Subscribe to physical value changes.
    fn subscribe(&self) -> broadcast::Receiver<ValueChange>;

    /// Run a network-wide command.
    fn execute(
        &self,
        command: BackendCommand,
    ) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Close the link.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;
}

impl<T: ProtocolBackend> ProtocolBackend for std::sync::Arc<T> {
    fn connect(
        &self,
        params: ConnectParams,
    ) -> impl Future<Output = Result<Session, HubError>> + Send {
        (**self).connect(params)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn nodes(&self) -> Vec<BackendNode> {
        (**self).nodes()
    }

    fn get_value(&self, address: &ControlAddress) -> Option<String> {
        (**self).get_value(address)
    }

    fn set_value(
        &self,
        address: &ControlAddress,
        value: &str,
    ) -> impl Future<Output = bool> + Send {
        (**self).set_value(address, value)
    }

    fn subscribe(&self) -> broadcast::Receiver<ValueChange> {
        (**self).subscribe()
    }

    fn execute(
        &self,
        command: BackendCommand,
    ) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).execute(command)
    }

    fn disconnect(&self) -> impl Future<Output = ()> + Send {
        (**self).disconnect()
    }
}
