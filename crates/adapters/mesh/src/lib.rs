//! # homelink-adapter-mesh
//!
//! The `mesh` controller: a wireless device mesh driven through a
//! [`ProtocolBackend`].
//!
//! ## Addresses
//!
//! | Node | Value | Message | Effect |
//! |------|-------|---------|--------|
//! | `General` | `all_on` / `all_off` | `activate`, `set_value` | switch every node |
//! | `Scene` | `1`..`255` | `activate` | run a scene stored in the network |
//! | `<node id>` | `<value id>` | `set_value` | write the value on the device |
//! | `<node id>` | `virt_*` | `set_value` | write through the synthesizer |
//!
//! Physical changes pushed by the backend are broadcast, recorded, published
//! as `ValueChanged` triggers and fed to the synthesizer.

pub mod rgbw;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use homelink_app::context::ControllerContext;
use homelink_app::history;
use homelink_app::lifecycle::Lifecycle;
use homelink_app::ports::controller::find_value_name;
use homelink_app::ports::{
    BackendCommand, BackendNode, ConnectParams, Controller, ProtocolBackend, ValueChange,
};
use homelink_app::synthesizer::{ValueWriter, VirtualRecipe, VirtualValueCache};
use homelink_domain::address::ControlAddress;
use homelink_domain::controller::{ControllerState, Setting};
use homelink_domain::error::HubError;
use homelink_domain::history::ValueChangeRecord;
use homelink_domain::message::{AddressedMessage, NoticeLevel, Payload};
use homelink_domain::node::{Node, Value, ValueType};
use homelink_domain::time;
use homelink_domain::trigger::{CATEGORY_SCENES, CATEGORY_VALUE_CHANGED};

pub use rgbw::RgbwRecipe;

pub const IDENTIFIER: &str = "mesh";

/// Serial port or address of the network's stick.
pub const SETTING_PORT: &str = "MESH_PORT";
const DEFAULT_PORT: &str = "/dev/ttyACM0";

const NODE_GENERAL: &str = "General";
const NODE_SCENE: &str = "Scene";
const VALUE_ALL_ON: &str = "all_on";
const VALUE_ALL_OFF: &str = "all_off";
const VIRTUAL_PREFIX: &str = "virt_";

/// Tunables of the mesh controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshConfig {
    /// Top of the RGBW dimmer channel range.
    pub rgbw_scale: u8,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            rgbw_scale: rgbw::DEFAULT_SCALE,
        }
    }
}

/// State shared with the change listener.
struct Shared<B> {
    backend: B,
    cache: VirtualValueCache,
    context: OnceLock<ControllerContext>,
}

impl<B: ProtocolBackend> Shared<B> {
    fn read(&self) -> impl Fn(&ControlAddress) -> Option<String> + '_ {
        move |address: &ControlAddress| self.backend.get_value(address)
    }

    fn node(&self, node_id: &str) -> Option<BackendNode> {
        self.backend.nodes().into_iter().find(|n| n.id == node_id)
    }

    /// Synthesize whatever virtual values the current nodes allow.
    fn synthesize_all(&self) {
        for node in self.backend.nodes() {
            self.cache.resolve(IDENTIFIER, &node, self.read());
        }
    }

    async fn on_change(&self, change: ValueChange) {
        let Some(ctx) = self.context.get() else {
            return;
        };
        let address = change.address(IDENTIFIER);
        tracing::debug!(address = %address, value = %change.value, "mesh value changed");

        ctx.broadcast(
            &AddressedMessage::value_changed(
                address.clone(),
                change.value.clone(),
                change.unit.clone(),
                change.value_type,
            )
            .with_broadcast(true),
        );

        let record =
            ValueChangeRecord::new(address.clone(), change.unit, change.value, time::now());
        if let Err(err) = ctx.history().insert_value_change(record).await {
            tracing::error!(address = %address, error = %err, "failed to record value change");
        }

        ctx.triggers()
            .publish(CATEGORY_VALUE_CHANGED, &address.key());

        if let Some(node) = self.node(&change.node_id) {
            self.cache.resolve(IDENTIFIER, &node, self.read());
        }
        for (value, state) in self.cache.on_input_changed(&address, self.read()) {
            ctx.broadcast(
                &AddressedMessage::value_changed(
                    value.address().clone(),
                    state,
                    "",
                    value.value_type(),
                )
                .with_broadcast(true),
            );
        }
    }
}

impl<B: ProtocolBackend> ValueWriter for Shared<B> {
    async fn write_value(&self, address: &ControlAddress, value: &str) -> bool {
        self.backend.set_value(address, value).await
    }
}

async fn listen<B: ProtocolBackend>(
    shared: Arc<Shared<B>>,
    mut changes: broadcast::Receiver<ValueChange>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            received = changes.recv() => match received {
                Ok(change) => shared.on_change(change).await,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(controller = IDENTIFIER, missed, "mesh listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    tracing::debug!(controller = IDENTIFIER, "mesh listener stopped");
}

/// Controller for one wireless device mesh.
pub struct MeshController<B> {
    shared: Arc<Shared<B>>,
    lifecycle: Lifecycle,
    listener: CancellationToken,
}

impl<B: ProtocolBackend> MeshController<B> {
    #[must_use]
    pub fn new(backend: B, config: MeshConfig) -> Self {
        let recipes: Vec<Arc<dyn VirtualRecipe>> =
            vec![Arc::new(RgbwRecipe::new(config.rgbw_scale))];
        Self {
            shared: Arc::new(Shared {
                backend,
                cache: VirtualValueCache::new(recipes),
                context: OnceLock::new(),
            }),
            lifecycle: Lifecycle::new(),
            listener: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.shared.backend
    }

    async fn run_command(&self, message: &AddressedMessage) -> AddressedMessage {
        let (command, label) = match message.address.value_id.as_str() {
            VALUE_ALL_ON => (BackendCommand::AllOn, "All devices switched on"),
            VALUE_ALL_OFF => (BackendCommand::AllOff, "All devices switched off"),
            _ => return unsupported(message),
        };
        match self.shared.backend.execute(command).await {
            Ok(()) => AddressedMessage::notice(
                message.address.clone(),
                NoticeLevel::Information,
                label,
            )
            .with_broadcast(true),
            Err(err) => {
                tracing::warn!(controller = IDENTIFIER, ?command, error = %err, "mesh command failed");
                error_notice(message, &format!("Command failed: {err}"))
            }
        }
    }

    async fn activate_scene(&self, message: &AddressedMessage) -> AddressedMessage {
        let Some(scene) = message
            .address
            .value_id
            .parse::<u8>()
            .ok()
            .filter(|n| *n > 0)
        else {
            return error_notice(
                message,
                &format!("Invalid scene number {}", message.address.value_id),
            );
        };
        match self
            .shared
            .backend
            .execute(BackendCommand::ActivateScene(scene))
            .await
        {
            Ok(()) => {
                if let Some(ctx) = self.shared.context.get() {
                    ctx.triggers()
                        .publish(CATEGORY_SCENES, &message.address.key());
                }
                AddressedMessage::notice(
                    message.address.clone(),
                    NoticeLevel::Information,
                    format!("Scene {scene} activated"),
                )
                .with_broadcast(true)
            }
            Err(err) => {
                tracing::warn!(controller = IDENTIFIER, scene, error = %err, "scene activation failed");
                error_notice(message, &format!("Scene {scene} failed: {err}"))
            }
        }
    }

    async fn write_virtual(&self, message: &AddressedMessage, raw: &str) -> Option<AddressedMessage> {
        let address = &message.address;
        if self.shared.cache.get(address).is_none() {
            if let Some(node) = self.shared.node(&address.node_id) {
                self.shared
                    .cache
                    .resolve(IDENTIFIER, &node, self.shared.read());
            }
        }
        match self.shared.cache.write(address, raw, self.shared.as_ref()).await {
            Ok(report) if report.is_complete() => None,
            Ok(report) => Some(error_notice(
                message,
                &format!(
                    "{} of {} writes failed for {}",
                    report.failed.len(),
                    report.attempted,
                    self.value_name(address)
                ),
            )),
            Err(err) => Some(error_notice(message, &err.to_string())),
        }
    }

    async fn write_physical(&self, message: &AddressedMessage, raw: &str) -> Option<AddressedMessage> {
        let address = &message.address;
        let known = self
            .shared
            .node(&address.node_id)
            .is_some_and(|node| node.value(&address.value_id).is_some());
        if !known {
            return Some(error_notice(message, &format!("Unknown value {address}")));
        }
        if self.shared.backend.set_value(address, raw).await {
            // The backend echoes the change; the listener broadcasts it.
            None
        } else {
            tracing::warn!(address = %address, value = raw, "mesh write rejected");
            Some(error_notice(
                message,
                &format!("{} rejected value {raw}", self.value_name(address)),
            ))
        }
    }

    fn backend_nodes(&self) -> Vec<Node> {
        let virtual_values = self.shared.cache.all();
        self.shared
            .backend
            .nodes()
            .into_iter()
            .map(|node| {
                let values = node
                    .values
                    .iter()
                    .map(|v| Value::new(&v.id, &v.name, v.value_type))
                    .chain(
                        virtual_values
                            .iter()
                            .filter(|v| v.address().node_id == node.id)
                            .map(|v| v.descriptor()),
                    );
                Node::new(node.id.clone(), node.name.clone())
                    .with_kind(node.kind.clone())
                    .with_values(values)
            })
            .collect()
    }
}

fn error_notice(message: &AddressedMessage, content: &str) -> AddressedMessage {
    AddressedMessage::notice(message.address.clone(), NoticeLevel::Error, content)
}

fn unsupported(message: &AddressedMessage) -> AddressedMessage {
    error_notice(
        message,
        &format!("Unsupported {} on {}", message.kind(), message.address),
    )
}

#[async_trait]
impl<B: ProtocolBackend> Controller for MeshController<B> {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn display_name(&self) -> &str {
        "Mesh network"
    }

    fn enabled(&self) -> bool {
        self.shared.backend.is_connected()
    }

    fn state(&self) -> ControllerState {
        self.lifecycle.state()
    }

    async fn init(&self, ctx: ControllerContext) -> Result<(), HubError> {
        if !self.lifecycle.begin_init() {
            return Err(HubError::adapter(IDENTIFIER, "already initialised"));
        }

        let endpoint = ctx
            .settings()
            .get_string(IDENTIFIER, SETTING_PORT, DEFAULT_PORT);
        let params = ConnectParams {
            endpoint,
            username: String::new(),
        };
        if let Err(err) = self.shared.backend.connect(params).await {
            self.lifecycle.abort_init();
            return Err(HubError::adapter(IDENTIFIER, err.to_string()));
        }

        let _ = self.shared.context.set(ctx);
        self.shared.synthesize_all();
        tokio::spawn(listen(
            Arc::clone(&self.shared),
            self.shared.backend.subscribe(),
            self.listener.clone(),
        ));

        if self.lifecycle.mark_ready() {
            tracing::info!(
                controller = IDENTIFIER,
                nodes = self.shared.backend.nodes().len(),
                virtual_values = self.shared.cache.len(),
                "mesh network ready"
            );
            Ok(())
        } else {
            // destroy() ran before the handshake finished, so the backend it
            // disconnected was not connected yet.
            self.listener.cancel();
            self.shared.backend.disconnect().await;
            Err(HubError::adapter(IDENTIFIER, "destroyed during init"))
        }
    }

    async fn destroy(&self) {
        if self.lifecycle.destroy() {
            self.listener.cancel();
            self.shared.backend.disconnect().await;
        }
    }

    async fn parse(&self, message: AddressedMessage) -> Result<Option<AddressedMessage>, HubError> {
        if matches!(message.payload, Payload::HistoryRequest { .. }) {
            let Some(ctx) = self.shared.context.get() else {
                return Ok(None);
            };
            let title = self.value_name(&message.address);
            return Ok(history::answer(ctx.history().as_ref(), &message, title).await);
        }

        let reply = match (&message.payload, message.address.node_id.as_str()) {
            (Payload::Activate { .. } | Payload::SetValue { .. }, NODE_GENERAL) => {
                Some(self.run_command(&message).await)
            }
            (Payload::Activate { .. }, NODE_SCENE) => Some(self.activate_scene(&message).await),
            (Payload::SetValue { value }, _)
                if message.address.value_id.starts_with(VIRTUAL_PREFIX) =>
            {
                self.write_virtual(&message, value).await
            }
            (Payload::SetValue { value }, _) => self.write_physical(&message, value).await,
            _ => Some(unsupported(&message)),
        };
        Ok(reply)
    }

    fn nodes(&self) -> Vec<Node> {
        let mut nodes = vec![
            Node::new(NODE_GENERAL, "General")
                .with_kind("Commands")
                .with_value(Value::new(VALUE_ALL_ON, "All on", ValueType::GeneralCommand))
                .with_value(Value::new(VALUE_ALL_OFF, "All off", ValueType::GeneralCommand)),
        ];
        nodes.extend(self.backend_nodes());
        nodes
    }

    fn triggers(&self) -> Vec<Node> {
        let scenes = (1..=u8::MAX).map(|n| {
            Value::new(n.to_string(), format!("Scene {n}"), ValueType::SceneActivation)
        });
        let mut triggers = self.backend_nodes();
        triggers.push(Node::new(NODE_SCENE, "Scenes").with_values(scenes));
        triggers
    }

    fn settings(&self) -> Vec<Setting> {
        vec![Setting::new(SETTING_PORT, "Mesh stick port", DEFAULT_PORT)]
    }

    fn value_name(&self, address: &ControlAddress) -> String {
        let mut nodes = self.nodes();
        nodes.extend(self.triggers());
        find_value_name(&nodes, address)
    }

    fn value(&self, address: &ControlAddress) -> String {
        if address.value_id.starts_with(VIRTUAL_PREFIX) {
            return self
                .shared
                .cache
                .get(address)
                .and_then(|value| value.current())
                .unwrap_or_default();
        }
        self.shared.backend.get_value(address).unwrap_or_default()
    }

    async fn initial_client_state(&self) -> Vec<AddressedMessage> {
        let physical = self.shared.backend.nodes().into_iter().flat_map(|node| {
            node.values
                .into_iter()
                .filter_map(|value| {
                    let address = ControlAddress::new(IDENTIFIER, &node.id, value.id);
                    let raw = self.shared.backend.get_value(&address)?;
                    Some(AddressedMessage::value_changed(
                        address,
                        raw,
                        value.unit,
                        value.value_type,
                    ))
                })
                .collect::<Vec<_>>()
        });
        let synthesized = self.shared.cache.all().into_iter().filter_map(|value| {
            Some(AddressedMessage::value_changed(
                value.address().clone(),
                value.current()?,
                "",
                value.value_type(),
            ))
        });
        physical.chain(synthesized).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use homelink_adapter_virtual::networks::mesh_demo;
    use homelink_adapter_virtual::{RecordedWrite, SimulatedBackend};
    use homelink_app::automation_bus::InProcessAutomation;
    use homelink_app::clients::ConnectedClients;
    use homelink_app::history::MemoryHistory;
    use homelink_app::settings::MemorySettings;
    use homelink_domain::trigger::TriggerEvent;
    use tokio::sync::mpsc;

    use super::*;

    // ── Fixture ──

    struct Fixture {
        controller: MeshController<Arc<SimulatedBackend>>,
        backend: Arc<SimulatedBackend>,
        history: Arc<MemoryHistory>,
        triggers: broadcast::Receiver<TriggerEvent>,
        client: mpsc::UnboundedReceiver<String>,
    }

    async fn ready() -> Fixture {
        let backend = Arc::new(mesh_demo());
        let controller = MeshController::new(Arc::clone(&backend), MeshConfig::default());
        let automation = Arc::new(InProcessAutomation::new(64, Vec::new()));
        let triggers = automation.subscribe();
        let history = Arc::new(MemoryHistory::new());
        let clients = Arc::new(ConnectedClients::new());
        let (tx, client) = mpsc::unbounded_channel();
        clients.add(tx);
        let ctx = ControllerContext::new(
            clients,
            automation,
            history.clone(),
            Arc::new(MemorySettings::new()),
        );
        controller.init(ctx).await.unwrap();
        Fixture {
            controller,
            backend,
            history,
            triggers,
            client,
        }
    }

    fn at(node: &str, value: &str) -> ControlAddress {
        ControlAddress::new(IDENTIFIER, node, value)
    }

    async fn next_frame(client: &mut mpsc::UnboundedReceiver<String>) -> AddressedMessage {
        let raw = tokio::time::timeout(Duration::from_secs(1), client.recv())
            .await
            .expect("frame in time")
            .expect("channel open");
        AddressedMessage::from_json(&raw).unwrap()
    }

    fn notice_of(message: &AddressedMessage) -> (NoticeLevel, &str) {
        match &message.payload {
            Payload::ClientNotice { level, content } => (*level, content.as_str()),
            other => panic!("expected notice, got {other:?}"),
        }
    }

    // ── Lifecycle ──

    #[tokio::test]
    async fn should_be_disabled_until_connected() {
        let controller = MeshController::new(mesh_demo(), MeshConfig::default());
        assert!(!controller.enabled());
        assert_eq!(controller.state(), ControllerState::Uninitialized);
    }

    fn bare_context() -> ControllerContext {
        ControllerContext::new(
            Arc::new(ConnectedClients::new()),
            Arc::new(InProcessAutomation::new(4, Vec::new())),
            Arc::new(MemoryHistory::new()),
            Arc::new(MemorySettings::new()),
        )
    }

    #[tokio::test]
    async fn should_fail_init_when_handshake_fails() {
        let controller = MeshController::new(
            SimulatedBackend::builder().failing_handshake().build(),
            MeshConfig::default(),
        );

        let result = controller.init(bare_context()).await;

        assert!(matches!(result, Err(HubError::Adapter { .. })));
        assert!(!controller.enabled());
        assert!(!controller.initialized());
    }

    #[tokio::test]
    async fn should_stay_disconnected_when_destroyed_during_handshake() {
        let backend = SimulatedBackend::builder()
            .handshake_delay(Duration::from_millis(200))
            .build();
        let controller = Arc::new(MeshController::new(backend, MeshConfig::default()));
        let init = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.init(bare_context()).await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.destroy().await;
        let result = init.await.unwrap();

        assert!(matches!(result, Err(HubError::Adapter { .. })));
        assert_eq!(controller.state(), ControllerState::Destroyed);
        assert!(!controller.enabled());
    }

    #[tokio::test]
    async fn should_synthesize_rgbw_colour_at_init() {
        let fixture = ready().await;

        let node = fixture
            .controller
            .nodes()
            .into_iter()
            .find(|n| n.id == "4")
            .unwrap();
        let colour = node.value(rgbw::VALUE_ID).unwrap();
        assert!(colour.is_virtual);
        assert_eq!(colour.value_type, ValueType::Color);
        assert_eq!(fixture.controller.value(&at("4", rgbw::VALUE_ID)), "#000000");
    }

    #[tokio::test]
    async fn should_disconnect_on_destroy() {
        let fixture = ready().await;
        fixture.controller.destroy().await;
        fixture.controller.destroy().await;
        assert!(!fixture.controller.enabled());
        assert_eq!(fixture.controller.state(), ControllerState::Destroyed);
    }

    // ── Physical changes ──

    #[tokio::test]
    async fn should_broadcast_record_and_publish_pushed_change() {
        let mut fixture = ready().await;

        fixture.backend.push("2", "50.1", "42.5");

        let frame = next_frame(&mut fixture.client).await;
        assert_eq!(frame.address, at("2", "50.1"));
        assert!(matches!(
            frame.payload,
            Payload::ValueChanged { ref value, ref unit, .. } if value == "42.5" && unit == "W"
        ));
        let trigger = fixture.triggers.recv().await.unwrap();
        assert_eq!(trigger.category, CATEGORY_VALUE_CHANGED);
        assert_eq!(trigger.key, "mesh/2/50.1");
        let records = fixture.history.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].numeric_value, Some(42.5));
    }

    #[tokio::test]
    async fn should_rebroadcast_virtual_colour_when_input_moves() {
        let mut fixture = ready().await;

        fixture.backend.push("4", "38.3", "99");

        let physical = next_frame(&mut fixture.client).await;
        assert_eq!(physical.address, at("4", "38.3"));
        let derived = next_frame(&mut fixture.client).await;
        assert_eq!(derived.address, at("4", rgbw::VALUE_ID));
        assert!(matches!(
            derived.payload,
            Payload::ValueChanged { ref value, value_type: ValueType::Color, .. } if value == "#ff0000"
        ));
    }

    // ── Writes ──

    #[tokio::test]
    async fn should_write_physical_value_and_echo_through_listener() {
        let mut fixture = ready().await;

        let reply = fixture
            .controller
            .parse(AddressedMessage::set_value(at("2", "37.1"), "on"))
            .await
            .unwrap();

        assert!(reply.is_none());
        let frame = next_frame(&mut fixture.client).await;
        assert_eq!(frame.address, at("2", "37.1"));
        assert_eq!(fixture.controller.value(&at("2", "37.1")), "on");
    }

    #[tokio::test]
    async fn should_reply_with_error_for_unknown_value() {
        let fixture = ready().await;

        let reply = fixture
            .controller
            .parse(AddressedMessage::set_value(at("2", "99.9"), "1"))
            .await
            .unwrap()
            .unwrap();

        assert!(!reply.broadcast);
        assert_eq!(notice_of(&reply).0, NoticeLevel::Error);
        assert!(fixture.backend.writes().is_empty());
    }

    #[tokio::test]
    async fn should_split_colour_write_onto_channels_in_order() {
        let fixture = ready().await;

        let reply = fixture
            .controller
            .parse(AddressedMessage::set_value(at("4", rgbw::VALUE_ID), "#FF8000"))
            .await
            .unwrap();

        assert!(reply.is_none());
        let write = |value_id: &str, value: &str| RecordedWrite {
            node_id: "4".to_string(),
            value_id: value_id.to_string(),
            value: value.to_string(),
        };
        assert_eq!(
            fixture.backend.writes(),
            vec![
                write("38.3", "99"),
                write("38.4", "50"),
                write("38.5", "0"),
                write("38.1", "99"),
            ]
        );
    }

    #[tokio::test]
    async fn should_reply_with_error_for_invalid_colour() {
        let fixture = ready().await;

        let reply = fixture
            .controller
            .parse(AddressedMessage::set_value(at("4", rgbw::VALUE_ID), "#FF80"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(notice_of(&reply).0, NoticeLevel::Error);
        assert!(fixture.backend.writes().is_empty());
    }

    // ── Commands & scenes ──

    #[tokio::test]
    async fn should_switch_everything_on() {
        let fixture = ready().await;

        let reply = fixture
            .controller
            .parse(AddressedMessage::activate(at(NODE_GENERAL, VALUE_ALL_ON)))
            .await
            .unwrap()
            .unwrap();

        assert!(reply.broadcast);
        assert_eq!(fixture.controller.value(&at("2", "37.1")), "on");
    }

    #[tokio::test]
    async fn should_activate_stored_scene_and_publish_trigger() {
        let mut fixture = ready().await;

        let reply = fixture
            .controller
            .parse(AddressedMessage::activate(at(NODE_SCENE, "3")))
            .await
            .unwrap()
            .unwrap();

        assert!(reply.broadcast);
        assert_eq!(
            notice_of(&reply),
            (NoticeLevel::Information, "Scene 3 activated")
        );
        assert_eq!(fixture.backend.activated_scenes(), vec![3]);
        let trigger = fixture.triggers.recv().await.unwrap();
        assert_eq!(trigger.category, CATEGORY_SCENES);
        assert_eq!(trigger.key, "mesh/Scene/3");
    }

    #[tokio::test]
    async fn should_reply_directly_when_scene_is_unknown() {
        let fixture = ready().await;

        let reply = fixture
            .controller
            .parse(AddressedMessage::activate(at(NODE_SCENE, "200")))
            .await
            .unwrap()
            .unwrap();

        assert!(!reply.broadcast);
        assert_eq!(notice_of(&reply).0, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn should_reject_scene_zero() {
        let fixture = ready().await;

        let reply = fixture
            .controller
            .parse(AddressedMessage::activate(at(NODE_SCENE, "0")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(notice_of(&reply).0, NoticeLevel::Error);
        assert!(fixture.backend.activated_scenes().is_empty());
    }

    // ── Introspection ──

    #[tokio::test]
    async fn should_list_scene_triggers_one_to_255() {
        let fixture = ready().await;

        let triggers = fixture.controller.triggers();
        let scenes = triggers.iter().find(|n| n.id == NODE_SCENE).unwrap();

        assert_eq!(scenes.values.len(), 255);
        assert_eq!(scenes.values[0].id, "1");
        assert_eq!(scenes.values[254].id, "255");
    }

    #[tokio::test]
    async fn should_include_virtual_value_in_initial_state() {
        let fixture = ready().await;

        let state = fixture.controller.initial_client_state().await;

        assert!(state.iter().any(|m| m.address == at("4", rgbw::VALUE_ID)));
        assert!(state.iter().any(|m| m.address == at("3", "49.1")));
        assert_eq!(
            fixture.controller.value_name(&at("3", "49.1")),
            "Temperature"
        );
    }
}
