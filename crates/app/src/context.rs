//! Collaborators handed to every controller on `init`.

use std::sync::Arc;

use homelink_domain::message::AddressedMessage;

use crate::clients::ConnectedClients;
use crate::ports::{Automation, HistoryStore, SettingsStore};
use crate::trigger::TriggerPublisher;

/// Everything a controller may call back into.
///
/// Cheap to clone: every field is reference counted.
#[derive(Clone)]
pub struct ControllerContext {
    clients: Arc<ConnectedClients>,
    triggers: TriggerPublisher,
    history: Arc<dyn HistoryStore>,
    settings: Arc<dyn SettingsStore>,
    automation: Arc<dyn Automation>,
}

impl ControllerContext {
    pub fn new(
        clients: Arc<ConnectedClients>,
        automation: Arc<dyn Automation>,
        history: Arc<dyn HistoryStore>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            clients,
            triggers: TriggerPublisher::new(Arc::clone(&automation)),
            history,
            settings,
            automation,
        }
    }

    /// Fan `message` out to every connected client.
    pub fn broadcast(&self, message: &AddressedMessage) -> usize {
        self.clients.broadcast(message)
    }

    #[must_use]
    pub fn triggers(&self) -> &TriggerPublisher {
        &self.triggers
    }

    #[must_use]
    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    #[must_use]
    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }

    #[must_use]
    pub fn automation(&self) -> &Arc<dyn Automation> {
        &self.automation
    }

    #[must_use]
    pub fn clients(&self) -> &Arc<ConnectedClients> {
        &self.clients
    }
}
