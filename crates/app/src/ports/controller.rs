//! Controller port — the capability set every protocol adapter implements.
//!
//! A controller bridges one device backend (mesh network, lighting bridge,
//! the hub's own commands, …) into the addressed-message world. The hub
//! only ever talks to controllers through this trait.

use async_trait::async_trait;

use homelink_domain::address::ControlAddress;
use homelink_domain::controller::{ControllerState, Setting};
use homelink_domain::error::HubError;
use homelink_domain::message::AddressedMessage;
use homelink_domain::node::Node;

use crate::context::ControllerContext;

/// A long-lived protocol adapter, one per identifier.
///
/// The registry drives the lifecycle:
///
/// 1. the settings returned by [`settings`](Self::settings) are seeded in the
///    settings store
/// 2. [`init`](Self::init) runs on its own task; a slow or failing controller
///    never blocks the others
/// 3. the hub routes messages through [`parse`](Self::parse) while
///    [`enabled`](Self::enabled) holds
/// 4. [`destroy`](Self::destroy) on shutdown
///
/// The trait is object safe; the registry stores `Arc<dyn Controller>`.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Unique identifier, the `controller` part of every address it owns.
    fn identifier(&self) -> &str;

    /// Human-readable name.
    fn display_name(&self) -> &str;

    /// Whether the backend is reachable. A disabled controller is treated
    /// as absent by the hub.
    fn enabled(&self) -> bool;

    /// Current lifecycle state.
    fn state(&self) -> ControllerState;

    /// `true` once [`init`](Self::init) completed successfully.
    fn initialized(&self) -> bool {
        self.state() == ControllerState::Ready
    }

    /// Connect the backend and start background work.
    ///
    /// The context gives access to broadcast, triggers, history, settings
    /// and automation for the rest of the controller's life.
    async fn init(&self, ctx: ControllerContext) -> Result<(), HubError>;

    /// Stop background work and release the backend. Idempotent.
    async fn destroy(&self);

    /// Handle one inbound message addressed to this controller.
    ///
    /// Returns at most one message. A result with `broadcast = true` is fanned
    /// out to every client by the hub and not returned to the caller.
    async fn parse(&self, message: AddressedMessage) -> Result<Option<AddressedMessage>, HubError>;

    /// Controllable nodes.
    fn nodes(&self) -> Vec<Node>;

    /// Nodes whose values can be used as automation triggers.
    fn triggers(&self) -> Vec<Node>;

    /// Settings this controller reads, with their defaults.
    fn settings(&self) -> Vec<Setting>;

    /// Display name of the addressed value.
    fn value_name(&self, address: &ControlAddress) -> String;

    /// Last known raw value at `address`, empty when unknown.
    fn value(&self, address: &ControlAddress) -> String;

    /// Messages that bring a freshly connected client up to date.
    async fn initial_client_state(&self) -> Vec<AddressedMessage>;
}

/// Look a value name up in a list of nodes, falling back to the value id.
#[must_use]
pub fn find_value_name(nodes: &[Node], address: &ControlAddress) -> String {
    nodes
        .iter()
        .filter(|node| node.id == address.node_id)
        .find_map(|node| node.value(&address.value_id))
        .map_or_else(|| address.value_id.clone(), |value| value.name.clone())
}
