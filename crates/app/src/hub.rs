//! Hub — routes client messages to controllers and fans results out.
//!
//! The hub owns the controller registry and the connected-client set. Both
//! are concurrent maps; the hub clones what it needs out of them and never
//! awaits a controller while holding one of their locks.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;

use homelink_domain::error::HubError;
use homelink_domain::id::ClientId;
use homelink_domain::message::AddressedMessage;

use crate::clients::{ClientSender, ConnectedClients};
use crate::registry::ControllerRegistry;

/// Process-wide coordinator. Built once the registry has booted.
pub struct Hub {
    registry: Arc<ControllerRegistry>,
    clients: Arc<ConnectedClients>,
    routing_failures: AtomicU64,
}

impl Hub {
    pub fn new(registry: Arc<ControllerRegistry>, clients: Arc<ConnectedClients>) -> Self {
        Self {
            registry,
            clients,
            routing_failures: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ControllerRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn clients(&self) -> &Arc<ConnectedClients> {
        &self.clients
    }

    /// Decode and dispatch one raw inbound message.
    ///
    /// Returns the direct reply, if any. Undecodable input and routing
    /// failures are logged and yield `None`.
    pub async fn process_incoming_message(&self, raw: &str) -> Option<AddressedMessage> {
        let message = match AddressedMessage::from_json(raw) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed message");
                return None;
            }
        };
        self.dispatch(message).await.ok().flatten()
    }

    /// Route `message` to the controller named in its address.
    ///
    /// A result flagged `broadcast` goes to every client and the caller
    /// gets `None`; anything else is returned as the direct reply. A
    /// controller error or panic is logged and treated as no reply.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Routing`] when no enabled controller owns the
    /// address.
    pub async fn dispatch(
        &self,
        message: AddressedMessage,
    ) -> Result<Option<AddressedMessage>, HubError> {
        let controller_id = message.address.controller_id.clone();
        let Some(controller) = self
            .registry
            .get(&controller_id)
            .filter(|controller| controller.enabled())
        else {
            self.routing_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                controller = %controller_id,
                address = %message.address,
                kind = %message.kind(),
                "no enabled controller for message"
            );
            return Err(HubError::Routing {
                controller: controller_id,
            });
        };

        tracing::debug!(address = %message.address, kind = %message.kind(), "dispatch");
        let outcome = AssertUnwindSafe(controller.parse(message))
            .catch_unwind()
            .await;
        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                tracing::error!(controller = %controller_id, error = %err, "controller failed to handle message");
                return Ok(None);
            }
            Err(_) => {
                tracing::error!(controller = %controller_id, "controller panicked while handling message");
                return Ok(None);
            }
        };

        match reply {
            Some(reply) if reply.broadcast => {
                self.broadcast(&reply);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Fan `message` out to every connected client.
    pub fn broadcast(&self, message: &AddressedMessage) -> usize {
        self.clients.broadcast(message)
    }

    /// Direct message to one client.
    pub fn send_to(&self, client: ClientId, message: &AddressedMessage) -> bool {
        self.clients.send_to(client, message)
    }

    pub fn add_client(&self, sender: ClientSender) -> ClientId {
        self.clients.add(sender)
    }

    pub fn remove_client(&self, client: ClientId) -> bool {
        self.clients.remove(client)
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Number of messages that named no enabled controller.
    #[must_use]
    pub fn routing_failures(&self) -> u64 {
        self.routing_failures.load(Ordering::Relaxed)
    }

    /// Send the current state of every ready controller to one client.
    ///
    /// Broadcasts raised meanwhile are held back and follow the snapshot,
    /// so the client never ends on a value older than what it was sent.
    /// Returns the number of snapshot messages queued.
    pub async fn bootstrap_client(&self, client: ClientId) -> usize {
        if !self.clients.hold(client) {
            return 0;
        }
        let mut sent = 0;
        'controllers: for controller in self.registry.all() {
            if !(controller.enabled() && controller.initialized()) {
                continue;
            }
            for message in controller.initial_client_state().await {
                if !self.clients.send_to(client, &message) {
                    tracing::debug!(client = %client, "client left during bootstrap");
                    break 'controllers;
                }
                sent += 1;
            }
        }
        let caught_up = self.clients.release(client);
        tracing::debug!(client = %client, messages = sent, caught_up, "client bootstrapped");
        sent
    }

    /// Destroy every controller.
    pub async fn shutdown(&self) {
        tracing::info!("shutting down controllers");
        self.registry.destroy_all().await;
    }
}
