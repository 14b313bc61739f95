//! Stub controller and hub shared by the handler tests.

use std::sync::Arc;

use async_trait::async_trait;

use homelink_app::clients::ConnectedClients;
use homelink_app::context::ControllerContext;
use homelink_app::hub::Hub;
use homelink_app::ports::Controller;
use homelink_app::registry::ControllerRegistry;
use homelink_domain::address::ControlAddress;
use homelink_domain::controller::{ControllerState, Setting};
use homelink_domain::error::HubError;
use homelink_domain::message::{AddressedMessage, NoticeLevel, Payload};
use homelink_domain::node::{Node, Value, ValueType};

/// Replies to `set_value` directly and to `activate` with a broadcast.
pub struct Echo;

#[async_trait]
impl Controller for Echo {
    fn identifier(&self) -> &str {
        "echo"
    }
    fn display_name(&self) -> &str {
        "Echo"
    }
    fn enabled(&self) -> bool {
        true
    }
    fn state(&self) -> ControllerState {
        ControllerState::Ready
    }
    async fn init(&self, _ctx: ControllerContext) -> Result<(), HubError> {
        Ok(())
    }
    async fn destroy(&self) {}
    async fn parse(&self, message: AddressedMessage) -> Result<Option<AddressedMessage>, HubError> {
        match message.payload {
            Payload::SetValue { value } => Ok(Some(AddressedMessage::value_changed(
                message.address,
                value,
                "",
                ValueType::Dimmer,
            ))),
            Payload::Activate { .. } => Ok(Some(
                AddressedMessage::notice(message.address, NoticeLevel::Information, "toggled")
                    .with_broadcast(true),
            )),
            _ => Err(HubError::adapter("echo", "unsupported")),
        }
    }
    fn nodes(&self) -> Vec<Node> {
        vec![Node::new("lamp", "Lamp").with_value(Value::new("level", "Level", ValueType::Dimmer))]
    }
    fn triggers(&self) -> Vec<Node> {
        Vec::new()
    }
    fn settings(&self) -> Vec<Setting> {
        vec![Setting::new("ECHO_DELAY", "Delay", "0")]
    }
    fn value_name(&self, address: &ControlAddress) -> String {
        address.value_id.clone()
    }
    fn value(&self, _address: &ControlAddress) -> String {
        String::new()
    }
    async fn initial_client_state(&self) -> Vec<AddressedMessage> {
        vec![AddressedMessage::value_changed(
            ControlAddress::new("echo", "status", "ready"),
            "true",
            "",
            ValueType::SensorBinary,
        )]
    }
}

pub fn hub() -> Arc<Hub> {
    let registry = ControllerRegistry::new();
    registry.register(Arc::new(Echo));
    Arc::new(Hub::new(
        Arc::new(registry),
        Arc::new(ConnectedClients::new()),
    ))
}
