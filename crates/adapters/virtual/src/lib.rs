//! # homelink-adapter-virtual
//!
//! Simulated protocol backends for demos and tests.
//!
//! [`SimulatedBackend`] implements the `ProtocolBackend` port entirely in
//! memory: writes are stored and echoed as value-change events, commands
//! switch every binary switch, and [`SimulatedBackend::push`] injects a
//! "physical" change as if someone flipped a switch on the wall.
//!
//! ## Provided networks
//!
//! | Network | Constructor | Contents |
//! |---------|-------------|----------|
//! | Mesh | [`networks::mesh_demo`] | wall plug, temperature sensor, RGBW controller |
//! | Bridge | [`networks::bridge_demo`] | two colour lights |
//!
//! ## Dependency rule
//!
//! Depends on `homelink-app` (port traits) and `homelink-domain` only.

pub mod networks;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;

use homelink_app::ports::{
    BackendCommand, BackendNode, ConnectParams, ProtocolBackend, Session, ValueChange,
};
use homelink_domain::address::ControlAddress;
use homelink_domain::error::HubError;
use homelink_domain::node::ValueType;

type PointKey = (String, String);

fn point(node_id: &str, value_id: &str) -> PointKey {
    (node_id.to_string(), value_id.to_string())
}

/// One write seen by the backend, accepted or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub node_id: String,
    pub value_id: String,
    pub value: String,
}

/// In-memory device network.
pub struct SimulatedBackend {
    nodes: Vec<BackendNode>,
    values: Mutex<HashMap<PointKey, String>>,
    scenes: BTreeSet<u8>,
    rejected: HashSet<PointKey>,
    handshake_delay: Duration,
    handshake_fails: bool,
    username: String,
    connected: AtomicBool,
    writes: Mutex<Vec<RecordedWrite>>,
    activated_scenes: Mutex<Vec<u8>>,
    sender: broadcast::Sender<ValueChange>,
}

impl SimulatedBackend {
    #[must_use]
    pub fn builder() -> SimulatedBackendBuilder {
        SimulatedBackendBuilder::default()
    }

    /// Inject a physical change: store it and notify subscribers.
    ///
    /// Returns `false` for an unknown point.
    pub fn push(&self, node_id: &str, value_id: &str, value: &str) -> bool {
        self.store(node_id, value_id, value)
    }

    /// Every write received so far, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scenes activated so far, in order.
    #[must_use]
    pub fn activated_scenes(&self) -> Vec<u8> {
        self.activated_scenes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, node_id: &str, value_id: &str, value: &str) -> bool {
        let Some(descriptor) = self
            .nodes
            .iter()
            .find(|n| n.id == node_id)
            .and_then(|n| n.value(value_id))
        else {
            return false;
        };
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(point(node_id, value_id), value.to_string());
        // No subscribers is fine.
        let _ = self.sender.send(ValueChange {
            node_id: node_id.to_string(),
            value_id: value_id.to_string(),
            value: value.to_string(),
            unit: descriptor.unit.clone(),
            value_type: descriptor.value_type,
        });
        true
    }

    fn switch_all(&self, on: bool) {
        let target = if on { "on" } else { "off" };
        for node in &self.nodes {
            for value in &node.values {
                if value.value_type == ValueType::BinarySwitch {
                    self.store(&node.id, &value.id, target);
                }
            }
        }
    }
}

impl ProtocolBackend for SimulatedBackend {
    async fn connect(&self, params: ConnectParams) -> Result<Session, HubError> {
        if !self.handshake_delay.is_zero() {
            tokio::time::sleep(self.handshake_delay).await;
        }
        if self.handshake_fails {
            tracing::warn!(endpoint = %params.endpoint, "simulated handshake refused");
            return Err(HubError::Backend(format!(
                "no device answered at `{}`",
                params.endpoint
            )));
        }
        self.connected.store(true, Ordering::Release);
        let username = if params.username.is_empty() {
            self.username.clone()
        } else {
            params.username
        };
        tracing::debug!(endpoint = %params.endpoint, "simulated backend connected");
        Ok(Session { username })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn nodes(&self) -> Vec<BackendNode> {
        self.nodes.clone()
    }

    fn get_value(&self, address: &ControlAddress) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&point(&address.node_id, &address.value_id))
            .cloned()
    }

    async fn set_value(&self, address: &ControlAddress, value: &str) -> bool {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedWrite {
                node_id: address.node_id.clone(),
                value_id: address.value_id.clone(),
                value: value.to_string(),
            });
        if !self.is_connected() {
            return false;
        }
        if self
            .rejected
            .contains(&point(&address.node_id, &address.value_id))
        {
            return false;
        }
        self.store(&address.node_id, &address.value_id, value)
    }

    fn subscribe(&self) -> broadcast::Receiver<ValueChange> {
        self.sender.subscribe()
    }

    async fn execute(&self, command: BackendCommand) -> Result<(), HubError> {
        if !self.is_connected() {
            return Err(HubError::Backend("not connected".to_string()));
        }
        match command {
            BackendCommand::AllOn => self.switch_all(true),
            BackendCommand::AllOff => self.switch_all(false),
            BackendCommand::ActivateScene(scene) => {
                if !self.scenes.contains(&scene) {
                    return Err(HubError::Backend(format!("scene {scene} is not programmed")));
                }
                self.activated_scenes
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(scene);
            }
        }
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }
}

/// Builder for [`SimulatedBackend`].
#[derive(Default)]
pub struct SimulatedBackendBuilder {
    nodes: Vec<BackendNode>,
    values: HashMap<PointKey, String>,
    scenes: BTreeSet<u8>,
    rejected: HashSet<PointKey>,
    handshake_delay: Duration,
    handshake_fails: bool,
    username: Option<String>,
}

impl SimulatedBackendBuilder {
    #[must_use]
    pub fn node(mut self, node: BackendNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Initial raw value of one point.
    #[must_use]
    pub fn value(mut self, node_id: &str, value_id: &str, value: &str) -> Self {
        self.values
            .insert(point(node_id, value_id), value.to_string());
        self
    }

    /// Scene numbers the network knows.
    #[must_use]
    pub fn scenes(mut self, scenes: impl IntoIterator<Item = u8>) -> Self {
        self.scenes.extend(scenes);
        self
    }

    /// Make writes to one point fail.
    #[must_use]
    pub fn reject_writes(mut self, node_id: &str, value_id: &str) -> Self {
        self.rejected.insert(point(node_id, value_id));
        self
    }

    #[must_use]
    pub fn handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }

    #[must_use]
    pub fn failing_handshake(mut self) -> Self {
        self.handshake_fails = true;
        self
    }

    /// Username handed out on first handshake.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn build(self) -> SimulatedBackend {
        let (sender, _) = broadcast::channel(256);
        SimulatedBackend {
            nodes: self.nodes,
            values: Mutex::new(self.values),
            scenes: self.scenes,
            rejected: self.rejected,
            handshake_delay: self.handshake_delay,
            handshake_fails: self.handshake_fails,
            username: self
                .username
                .unwrap_or_else(|| "homelink-simulated".to_string()),
            connected: AtomicBool::new(false),
            writes: Mutex::new(Vec::new()),
            activated_scenes: Mutex::new(Vec::new()),
            sender,
        }
    }
}
