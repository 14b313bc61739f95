//! The `general` controller: scenes, hub commands and time triggers.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use homelink_domain::address::ControlAddress;
use homelink_domain::controller::{ControllerState, Setting};
use homelink_domain::error::HubError;
use homelink_domain::message::{AddressedMessage, NoticeLevel, Payload};
use homelink_domain::node::{Node, Value, ValueType};
use homelink_domain::sun::{Coordinate, SunCalculator};
use homelink_domain::trigger::{CATEGORY_MUSIC, CATEGORY_SCENES, CATEGORY_TIME, SolarEvent};

use crate::context::ControllerContext;
use crate::history;
use crate::lifecycle::Lifecycle;
use crate::ports::controller::find_value_name;
use crate::ports::{Controller, SceneOutcome, SceneRef};
use crate::trigger::SunSchedule;

pub const IDENTIFIER: &str = "general";

pub const SETTING_SERVER_NAME: &str = "SERVER_NAME";
pub const SETTING_LATITUDE: &str = "SUNSET_LAT";
pub const SETTING_LONGITUDE: &str = "SUNSET_LONG";

const DEFAULT_SERVER_NAME: &str = "homelink";
const DEFAULT_LATITUDE: &str = "50.8503";
const DEFAULT_LONGITUDE: &str = "4.3517";

const NODE_COMMANDS: &str = "Commands";
const NODE_SCENES: &str = "Scenes";
const NODE_NAVIGATION: &str = "Navigation";

const VALUE_NOTIFICATION: &str = "send_notification";
const VALUE_WAIT: &str = "wait";
const VALUE_PIN: &str = "pin";

const PARAM_SCENE_NAME: &str = "scene_name";
const PARAM_SECONDS: &str = "seconds";
const PARAM_MESSAGE: &str = "message";

/// Longest accepted `wait` command.
const MAX_WAIT: Duration = Duration::from_secs(3600);

/// Built-in controller exposing scenes, hub commands and time triggers.
pub struct GeneralController {
    lifecycle: Lifecycle,
    context: OnceLock<ControllerContext>,
    schedule: Mutex<Option<SunSchedule>>,
    devices: Mutex<BTreeMap<String, String>>,
}

impl Default for GeneralController {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneralController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            context: OnceLock::new(),
            schedule: Mutex::new(None),
            devices: Mutex::new(BTreeMap::new()),
        }
    }

    /// Publish `Music / MusicStarted`.
    pub fn music_started(&self) {
        self.publish(CATEGORY_MUSIC, "MusicStarted");
    }

    /// Publish `Music / MusicStopped`.
    pub fn music_stopped(&self) {
        self.publish(CATEGORY_MUSIC, "MusicStopped");
    }

    /// Client devices that registered, by device id.
    #[must_use]
    pub fn registered_devices(&self) -> BTreeMap<String, String> {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Server name as configured.
    #[must_use]
    pub fn server_name(&self) -> String {
        self.context.get().map_or_else(
            || DEFAULT_SERVER_NAME.to_string(),
            |ctx| {
                ctx.settings()
                    .get_string(IDENTIFIER, SETTING_SERVER_NAME, DEFAULT_SERVER_NAME)
            },
        )
    }

    fn publish(&self, category: &str, key: &str) {
        match self.context.get() {
            Some(ctx) => {
                ctx.triggers().publish(category, key);
            }
            None => tracing::warn!(category, key, "trigger before init dropped"),
        }
    }

    fn coordinate(ctx: &ControllerContext) -> Result<Coordinate, HubError> {
        let settings = ctx.settings();
        Coordinate::parse(
            &settings.get_string(IDENTIFIER, SETTING_LATITUDE, DEFAULT_LATITUDE),
            &settings.get_string(IDENTIFIER, SETTING_LONGITUDE, DEFAULT_LONGITUDE),
        )
    }

    fn scene_values(&self) -> Vec<Value> {
        self.context
            .get()
            .map(|ctx| {
                ctx.automation()
                    .scenes()
                    .into_iter()
                    .map(|scene| Value::new(scene.id, scene.name, ValueType::SceneActivation))
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn activate_scene(&self, message: &AddressedMessage) -> AddressedMessage {
        let scene = match &message.payload {
            Payload::Activate { parameters } => parameters
                .get(PARAM_SCENE_NAME)
                .map_or_else(
                    || SceneRef::Id(message.address.value_id.clone()),
                    |name| SceneRef::Name(name.clone()),
                ),
            _ => SceneRef::Id(message.address.value_id.clone()),
        };

        let Some(ctx) = self.context.get() else {
            return error_notice(message, "Scenes are not available yet");
        };
        match ctx.automation().activate_scene(&scene).await {
            SceneOutcome::Activated { name } => AddressedMessage::notice(
                message.address.clone(),
                NoticeLevel::Information,
                format!("Scene {name} activated"),
            )
            .with_broadcast(true),
            SceneOutcome::NotFound => error_notice(message, &format!("Unknown {scene}")),
            SceneOutcome::Ambiguous { matches } => error_notice(
                message,
                &format!("{scene} matches {matches} scenes, expected exactly one"),
            ),
        }
    }

    async fn wait(&self, message: &AddressedMessage) -> Option<AddressedMessage> {
        let raw = match &message.payload {
            Payload::SetValue { value } => Some(value.as_str()),
            Payload::Activate { parameters } => parameters.get(PARAM_SECONDS).map(String::as_str),
            _ => None,
        };
        let seconds = raw.and_then(|s| s.trim().parse::<f64>().ok());
        let Some(delay) = seconds
            .filter(|s| (0.0..=MAX_WAIT.as_secs_f64()).contains(s))
            .map(Duration::from_secs_f64)
        else {
            return Some(error_notice(
                message,
                &format!("Invalid wait duration {}", raw.unwrap_or("(none)")),
            ));
        };
        tracing::debug!(?delay, "waiting");
        tokio::time::sleep(delay).await;
        None
    }

    fn notification(message: &AddressedMessage) -> AddressedMessage {
        let content = match &message.payload {
            Payload::SetValue { value } => value.clone(),
            Payload::Activate { parameters } => {
                parameters.get(PARAM_MESSAGE).cloned().unwrap_or_default()
            }
            _ => String::new(),
        };
        AddressedMessage::notice(message.address.clone(), NoticeLevel::Information, content)
            .with_broadcast(true)
    }

    fn register_device(&self, device_id: &str, name: &str) -> AddressedMessage {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(device_id.to_string(), name.to_string());
        tracing::info!(device = device_id, name, "client device registered");
        AddressedMessage::notice(
            ControlAddress::new(IDENTIFIER, NODE_COMMANDS, "register"),
            NoticeLevel::Information,
            format!("Welcome to {}, {name}", self.server_name()),
        )
    }
}

fn error_notice(message: &AddressedMessage, content: &str) -> AddressedMessage {
    AddressedMessage::notice(message.address.clone(), NoticeLevel::Error, content)
}

#[async_trait]
impl Controller for GeneralController {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn display_name(&self) -> &str {
        "General"
    }

    fn enabled(&self) -> bool {
        true
    }

    fn state(&self) -> ControllerState {
        self.lifecycle.state()
    }

    async fn init(&self, ctx: ControllerContext) -> Result<(), HubError> {
        if !self.lifecycle.begin_init() {
            return Err(HubError::adapter(IDENTIFIER, "already initialised"));
        }

        let coordinate = match Self::coordinate(&ctx) {
            Ok(coordinate) => coordinate,
            Err(err) => {
                self.lifecycle.abort_init();
                return Err(HubError::adapter(IDENTIFIER, err.to_string()));
            }
        };

        let schedule = SunSchedule::start(
            Arc::new(SunCalculator::new(coordinate)),
            ctx.triggers().clone(),
        );
        *self.schedule.lock().unwrap_or_else(PoisonError::into_inner) = Some(schedule);
        let _ = self.context.set(ctx);

        if self.lifecycle.mark_ready() {
            Ok(())
        } else {
            // Destroyed while initialising.
            self.destroy().await;
            Err(HubError::adapter(IDENTIFIER, "destroyed during init"))
        }
    }

    async fn destroy(&self) {
        self.lifecycle.destroy();
        let schedule = self
            .schedule
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(schedule) = schedule {
            schedule.cancel();
        }
    }

    async fn parse(&self, message: AddressedMessage) -> Result<Option<AddressedMessage>, HubError> {
        if let Payload::Register { device_id, name } = &message.payload {
            return Ok(Some(self.register_device(device_id, name)));
        }
        if matches!(message.payload, Payload::HistoryRequest { .. }) {
            let Some(ctx) = self.context.get() else {
                return Ok(None);
            };
            let title = self.value_name(&message.address);
            return Ok(history::answer(ctx.history().as_ref(), &message, title).await);
        }

        let actionable = matches!(
            message.payload,
            Payload::SetValue { .. } | Payload::Activate { .. }
        );
        let reply = match (message.address.node_id.as_str(), message.address.value_id.as_str()) {
            (NODE_NAVIGATION, _) => Some(AddressedMessage::notice(
                message.address.clone(),
                NoticeLevel::Information,
                "Correct PIN Entered",
            )),
            (NODE_SCENES, _) if actionable => Some(self.activate_scene(&message).await),
            (NODE_COMMANDS, VALUE_WAIT) if actionable => self.wait(&message).await,
            (NODE_COMMANDS, VALUE_NOTIFICATION) if actionable => Some(Self::notification(&message)),
            _ => {
                tracing::debug!(address = %message.address, kind = %message.kind(), "unsupported general message");
                Some(error_notice(
                    &message,
                    &format!("Unsupported {} on {}", message.kind(), message.address),
                ))
            }
        };
        Ok(reply)
    }

    fn nodes(&self) -> Vec<Node> {
        vec![
            Node::new(NODE_COMMANDS, "Commands")
                .with_kind("Commands")
                .with_value(Value::new(
                    VALUE_NOTIFICATION,
                    "Send notification",
                    ValueType::SendNotification,
                ))
                .with_value(Value::new(VALUE_WAIT, "Wait", ValueType::Wait)),
            Node::new(NODE_SCENES, "Scenes")
                .with_kind("Scenes")
                .with_values(self.scene_values()),
            Node::new(NODE_NAVIGATION, "Navigation")
                .with_kind("Navigation")
                .with_value(Value::new(VALUE_PIN, "PIN", ValueType::GeneralCommand)),
        ]
    }

    fn triggers(&self) -> Vec<Node> {
        let scenes = self
            .scene_values()
            .into_iter()
            .map(|value| Value::new(value.id, value.name, ValueType::Event));
        vec![
            Node::new(CATEGORY_TIME, "Time")
                .with_value(Value::new("Periodic", "Periodic", ValueType::TimePeriod))
                .with_value(Value::new(
                    SolarEvent::Sunrise.key(),
                    "Sunrise",
                    ValueType::Event,
                ))
                .with_value(Value::new(SolarEvent::Sunset.key(), "Sunset", ValueType::Event)),
            Node::new(CATEGORY_MUSIC, "Music")
                .with_value(Value::new("MusicStarted", "Music started", ValueType::Event))
                .with_value(Value::new("MusicStopped", "Music stopped", ValueType::Event)),
            Node::new(CATEGORY_SCENES, "Scenes").with_values(scenes),
        ]
    }

    fn settings(&self) -> Vec<Setting> {
        vec![
            Setting::new(SETTING_SERVER_NAME, "Server name", DEFAULT_SERVER_NAME),
            Setting::new(SETTING_LATITUDE, "Latitude for sunrise/sunset", DEFAULT_LATITUDE),
            Setting::new(SETTING_LONGITUDE, "Longitude for sunrise/sunset", DEFAULT_LONGITUDE),
        ]
    }

    fn value_name(&self, address: &ControlAddress) -> String {
        let mut nodes = self.nodes();
        nodes.extend(self.triggers());
        find_value_name(&nodes, address)
    }

    fn value(&self, address: &ControlAddress) -> String {
        if address.node_id != CATEGORY_TIME {
            return String::new();
        }
        self.schedule
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(SunSchedule::next)
            .filter(|next| next.event.key() == address.value_id)
            .map(|next| next.at.to_rfc3339())
            .unwrap_or_default()
    }

    async fn initial_client_state(&self) -> Vec<AddressedMessage> {
        [SolarEvent::Sunrise, SolarEvent::Sunset]
            .into_iter()
            .filter_map(|event| {
                let address = ControlAddress::new(IDENTIFIER, CATEGORY_TIME, event.key());
                let value = self.value(&address);
                (!value.is_empty()).then(|| {
                    AddressedMessage::value_changed(address, value, "", ValueType::Event)
                })
            })
            .collect()
    }
}
