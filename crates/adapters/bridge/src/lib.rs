//! # homelink-adapter-bridge
//!
//! The `bridge` controller: colour lights behind a lighting bridge.
//!
//! Each light is exposed as one colour value under the `Lights` node. Black
//! means off. The controller keeps the last colour shown to clients per light
//! and only reports a backend change when that colour actually moves.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use homelink_app::context::ControllerContext;
use homelink_app::history;
use homelink_app::lifecycle::Lifecycle;
use homelink_app::ports::controller::find_value_name;
use homelink_app::ports::{BackendCommand, ConnectParams, Controller, ProtocolBackend, ValueChange};
use homelink_domain::address::ControlAddress;
use homelink_domain::color::{Rgb, brightness_level};
use homelink_domain::controller::{ControllerState, Setting};
use homelink_domain::error::HubError;
use homelink_domain::history::ValueChangeRecord;
use homelink_domain::message::{AddressedMessage, NoticeLevel, Payload};
use homelink_domain::node::{Node, Value, ValueType};
use homelink_domain::time;
use homelink_domain::trigger::CATEGORY_VALUE_CHANGED;

pub const IDENTIFIER: &str = "bridge";

pub const SETTING_ADDRESS: &str = "BRIDGE_ADDRESS";
pub const SETTING_USERNAME: &str = "BRIDGE_USERNAME";

/// Value ids the bridge exposes on every light.
pub const POWER: &str = "power";
pub const COLOR: &str = "color";
pub const BRIGHTNESS: &str = "brightness";

/// Top of the bridge's brightness range.
const MAX_BRIGHTNESS: u8 = 254;

const NODE_LIGHTS: &str = "Lights";
const NODE_GENERAL: &str = "General";
const VALUE_ALL_ON: &str = "all_on";
const VALUE_ALL_OFF: &str = "all_off";

struct Shared<B> {
    backend: B,
    context: OnceLock<ControllerContext>,
    /// Colour last shown to clients, by light id.
    lights: Mutex<BTreeMap<String, String>>,
    /// Lights whose write plan is still running.
    writing: Mutex<HashSet<String>>,
}

/// Holds a light in [`Shared::writing`] until dropped.
struct WriteInFlight<'a> {
    writing: &'a Mutex<HashSet<String>>,
    light: String,
}

impl Drop for WriteInFlight<'_> {
    fn drop(&mut self) {
        self.writing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.light);
    }
}

impl<B: ProtocolBackend> Shared<B> {
    /// Colour a light currently shows according to the backend.
    fn shown(&self, light: &str) -> Option<String> {
        let at = |value: &str| ControlAddress::new(IDENTIFIER, light, value);
        let color = self.backend.get_value(&at(COLOR))?;
        let on = self
            .backend
            .get_value(&at(POWER))
            .is_some_and(|power| power == "on");
        Some(if on { color } else { Rgb::BLACK.to_hex() })
    }

    fn seed(&self) {
        let seeded: BTreeMap<String, String> = self
            .backend
            .nodes()
            .into_iter()
            .filter(|node| node.value(COLOR).is_some())
            .map(|node| {
                let shown = self.shown(&node.id).unwrap_or_else(|| Rgb::BLACK.to_hex());
                (node.id, shown)
            })
            .collect();
        *self.lights.lock().unwrap_or_else(PoisonError::into_inner) = seeded;
    }

    fn begin_write(&self, light: &str) -> WriteInFlight<'_> {
        self.writing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(light.to_string());
        WriteInFlight {
            writing: &self.writing,
            light: light.to_string(),
        }
    }

    fn is_writing(&self, light: &str) -> bool {
        self.writing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(light)
    }

    fn cached(&self, light: &str) -> Option<String> {
        self.lights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(light)
            .cloned()
    }

    /// Store `shown` for `light`. When it differs from the cache the change
    /// is recorded and published, and `true` is returned.
    async fn note(&self, light: &str, shown: &str) -> bool {
        {
            let mut lights = self.lights.lock().unwrap_or_else(PoisonError::into_inner);
            match lights.get_mut(light) {
                Some(current) if current == shown => return false,
                Some(current) => shown.clone_into(current),
                None => return false,
            }
        }

        let Some(ctx) = self.context.get() else {
            return true;
        };
        let address = light_address(light);
        let record = ValueChangeRecord::new(address.clone(), "", shown, time::now());
        if let Err(err) = ctx.history().insert_value_change(record).await {
            tracing::error!(address = %address, error = %err, "failed to record light change");
        }
        ctx.triggers()
            .publish(CATEGORY_VALUE_CHANGED, &address.key());
        true
    }

    async fn on_change(&self, change: ValueChange) {
        // Mid-plan echoes show a half-applied colour; set_colour reports the
        // outcome itself and later echoes match the cache.
        if self.is_writing(&change.node_id) {
            return;
        }
        let Some(shown) = self.shown(&change.node_id) else {
            return;
        };
        if self.note(&change.node_id, &shown).await {
            tracing::debug!(light = %change.node_id, colour = %shown, "light changed");
            if let Some(ctx) = self.context.get() {
                ctx.broadcast(&colour_changed(&change.node_id, shown));
            }
        }
    }
}

fn light_address(light: &str) -> ControlAddress {
    ControlAddress::new(IDENTIFIER, NODE_LIGHTS, light)
}

fn colour_changed(light: &str, colour: String) -> AddressedMessage {
    AddressedMessage::value_changed(light_address(light), colour, "", ValueType::Color)
        .with_broadcast(true)
}

fn error_notice(message: &AddressedMessage, content: &str) -> AddressedMessage {
    AddressedMessage::notice(message.address.clone(), NoticeLevel::Error, content)
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
                    tracing::warn!(controller = IDENTIFIER, missed, "bridge listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

/// Controller for the lights of one bridge.
pub struct BridgeLightsController<B> {
    shared: Arc<Shared<B>>,
    lifecycle: Lifecycle,
    listener: CancellationToken,
}

impl<B: ProtocolBackend> BridgeLightsController<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                context: OnceLock::new(),
                lights: Mutex::new(BTreeMap::new()),
                writing: Mutex::new(HashSet::new()),
            }),
            lifecycle: Lifecycle::new(),
            listener: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.shared.backend
    }

    /// Writes realizing `colour` on `light`: power, then colour and brightness.
    fn writes(light: &str, colour: Rgb) -> Vec<(ControlAddress, String)> {
        let at = |value: &str| ControlAddress::new(IDENTIFIER, light, value);
        if colour.is_black() {
            return vec![(at(POWER), "off".to_string())];
        }
        vec![
            (at(POWER), "on".to_string()),
            (at(COLOR), colour.to_hex()),
            (
                at(BRIGHTNESS),
                brightness_level(colour.brightness(), MAX_BRIGHTNESS).to_string(),
            ),
        ]
    }

    async fn set_colour(&self, message: &AddressedMessage, raw: &str) -> AddressedMessage {
        let light = message.address.value_id.as_str();
        if self.shared.cached(light).is_none() {
            return error_notice(message, &format!("Unknown light {light}"));
        }
        let colour: Rgb = match raw.parse() {
            Ok(colour) => colour,
            Err(err) => return error_notice(message, &err.to_string()),
        };

        let target = colour.to_hex();
        let _writing = self.shared.begin_write(light);
        self.shared.note(light, &target).await;
        for (address, value) in Self::writes(light, colour) {
            if !self.shared.backend.set_value(&address, &value).await {
                tracing::warn!(address = %address, value = %value, "bridge rejected light write");
                if let Some(actual) = self.shared.shown(light) {
                    self.shared.note(light, &actual).await;
                }
                return error_notice(
                    message,
                    &format!("{} rejected {value}", self.value_name(&message.address)),
                );
            }
        }
        colour_changed(light, target)
    }

    async fn run_command(&self, message: &AddressedMessage) -> AddressedMessage {
        let (command, label) = match message.address.value_id.as_str() {
            VALUE_ALL_ON => (BackendCommand::AllOn, "All lights on"),
            VALUE_ALL_OFF => (BackendCommand::AllOff, "All lights off"),
            other => return error_notice(message, &format!("Unknown command {other}")),
        };
        match self.shared.backend.execute(command).await {
            Ok(()) => AddressedMessage::notice(
                message.address.clone(),
                NoticeLevel::Information,
                label,
            )
            .with_broadcast(true),
            Err(err) => error_notice(message, &format!("Command failed: {err}")),
        }
    }

    fn lights_node(&self) -> Node {
        let lights = self
            .shared
            .backend
            .nodes()
            .into_iter()
            .filter(|node| node.value(COLOR).is_some())
            .map(|node| Value::new(node.id, node.name, ValueType::Color));
        Node::new(NODE_LIGHTS, "Lights")
            .with_kind("Lights")
            .with_values(lights)
    }
}

#[async_trait]
impl<B: ProtocolBackend> Controller for BridgeLightsController<B> {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn display_name(&self) -> &str {
        "Lighting bridge"
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

        let settings = ctx.settings();
        let username = settings.get_string(IDENTIFIER, SETTING_USERNAME, "");
        let params = ConnectParams {
            endpoint: settings.get_string(IDENTIFIER, SETTING_ADDRESS, ""),
            username: username.clone(),
        };
        let session = match self.shared.backend.connect(params).await {
            Ok(session) => session,
            Err(err) => {
                self.lifecycle.abort_init();
                return Err(HubError::adapter(IDENTIFIER, err.to_string()));
            }
        };
        if session.username != username {
            let stored = settings
                .set_string(IDENTIFIER, SETTING_USERNAME, &session.username)
                .and_then(|()| settings.persist());
            if let Err(err) = stored {
                tracing::error!(controller = IDENTIFIER, error = %err, "failed to store bridge username");
            }
        }

        self.shared.seed();
        let _ = self.shared.context.set(ctx);
        tokio::spawn(listen(
            Arc::clone(&self.shared),
            self.shared.backend.subscribe(),
            self.listener.clone(),
        ));

        if self.lifecycle.mark_ready() {
            tracing::info!(controller = IDENTIFIER, lights = self.lights_node().values.len(), "bridge ready");
            Ok(())
        } else {
            // The earlier destroy() found no connection to close.
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
        let reply = match (&message.payload, message.address.node_id.as_str()) {
            (Payload::HistoryRequest { .. }, _) => {
                let Some(ctx) = self.shared.context.get() else {
                    return Ok(None);
                };
                let title = self.value_name(&message.address);
                return Ok(history::answer(ctx.history().as_ref(), &message, title).await);
            }
            (Payload::SetValue { value }, NODE_LIGHTS) => self.set_colour(&message, value).await,
            (Payload::SetValue { .. } | Payload::Activate { .. }, NODE_GENERAL) => {
                self.run_command(&message).await
            }
            _ => error_notice(
                &message,
                &format!("Unsupported {} on {}", message.kind(), message.address),
            ),
        };
        Ok(Some(reply))
    }

    fn nodes(&self) -> Vec<Node> {
        vec![
            self.lights_node(),
            Node::new(NODE_GENERAL, "General")
                .with_kind("Commands")
                .with_value(Value::new(VALUE_ALL_ON, "All on", ValueType::GeneralCommand))
                .with_value(Value::new(VALUE_ALL_OFF, "All off", ValueType::GeneralCommand)),
        ]
    }

    fn triggers(&self) -> Vec<Node> {
        vec![self.lights_node()]
    }

    fn settings(&self) -> Vec<Setting> {
        vec![
            Setting::new(SETTING_ADDRESS, "Bridge address", ""),
            Setting::new(SETTING_USERNAME, "Bridge username", ""),
        ]
    }

    fn value_name(&self, address: &ControlAddress) -> String {
        find_value_name(&self.nodes(), address)
    }

    fn value(&self, address: &ControlAddress) -> String {
        if address.node_id != NODE_LIGHTS {
            return String::new();
        }
        self.shared.cached(&address.value_id).unwrap_or_default()
    }

    async fn initial_client_state(&self) -> Vec<AddressedMessage> {
        self.shared
            .lights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(light, colour)| {
                AddressedMessage::value_changed(
                    light_address(light),
                    colour.clone(),
                    "",
                    ValueType::Color,
                )
            })
            .collect()
    }
}
