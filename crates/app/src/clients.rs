//! The set of connected clients and their outbound channels.

use dashmap::DashMap;
use tokio::sync::mpsc;

use homelink_domain::id::ClientId;
use homelink_domain::message::AddressedMessage;

/// Outbound half of one client connection. The transport drains the
/// receiving end and writes each string to the wire.
pub type ClientSender = mpsc::UnboundedSender<String>;

struct Client {
    sender: ClientSender,
    /// Broadcasts parked while the client is being bootstrapped.
    held: Option<Vec<String>>,
}

/// Concurrent set of connected clients.
///
/// Sends never block: each client has an unbounded queue drained by its
/// own writer task, so a slow client cannot hold up the others.
#[derive(Default)]
pub struct ConnectedClients {
    clients: DashMap<ClientId, Client>,
}

impl ConnectedClients {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client and return its id.
    pub fn add(&self, sender: ClientSender) -> ClientId {
        let id = ClientId::new();
        self.clients.insert(id, Client { sender, held: None });
        tracing::debug!(client = %id, "client connected");
        id
    }

    /// Forget a client. Returns `false` if it was already gone.
    pub fn remove(&self, id: ClientId) -> bool {
        let removed = self.clients.remove(&id).is_some();
        if removed {
            tracing::debug!(client = %id, "client disconnected");
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    /// Queue raw text for one client. A closed channel removes the client.
    pub fn send_text(&self, id: ClientId, text: String) -> bool {
        let delivered = match self.clients.get(&id) {
            Some(client) => client.sender.send(text).is_ok(),
            None => return false,
        };
        if !delivered {
            self.remove(id);
        }
        delivered
    }

    /// Serialize `message` and queue it for one client.
    pub fn send_to(&self, id: ClientId, message: &AddressedMessage) -> bool {
        match message.to_json() {
            Ok(text) => self.send_text(id, text),
            Err(err) => {
                tracing::error!(error = %err, kind = %message.kind(), "failed to serialize message");
                false
            }
        }
    }

    /// Serialize `message` once and queue it for every client.
    ///
    /// Returns the number of clients it was queued for. Clients whose
    /// channel is closed are removed after the pass.
    pub fn broadcast(&self, message: &AddressedMessage) -> usize {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(error = %err, kind = %message.kind(), "failed to serialize broadcast");
                return 0;
            }
        };
        tracing::debug!(address = %message.address, kind = %message.kind(), "broadcast");

        let mut delivered = 0;
        let mut dead = Vec::new();
        for mut entry in self.clients.iter_mut() {
            let client = entry.value_mut();
            if let Some(held) = client.held.as_mut() {
                held.push(text.clone());
                delivered += 1;
            } else if client.sender.send(text.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*entry.key());
            }
        }
        for id in dead {
            self.remove(id);
        }
        delivered
    }

    /// Park broadcasts for `id` until [`release`](Self::release). Direct
    /// sends still go straight through.
    pub fn hold(&self, id: ClientId) -> bool {
        match self.clients.get_mut(&id) {
            Some(mut client) => {
                client.held.get_or_insert_with(Vec::new);
                true
            }
            None => false,
        }
    }

    /// Queue the broadcasts parked by [`hold`](Self::hold), in arrival
    /// order, and deliver later ones directly again.
    pub fn release(&self, id: ClientId) -> usize {
        let delivered = {
            let Some(mut client) = self.clients.get_mut(&id) else {
                return 0;
            };
            let held = client.held.take().unwrap_or_default();
            let count = held.len();
            held.into_iter()
                .all(|text| client.sender.send(text).is_ok())
                .then_some(count)
        };
        delivered.unwrap_or_else(|| {
            self.remove(id);
            0
        })
    }
}

#[cfg(test)]
mod tests {
    use homelink_domain::address::ControlAddress;
    use homelink_domain::message::NoticeLevel;

    use super::*;

    fn notice() -> AddressedMessage {
        AddressedMessage::notice(
            ControlAddress::new("general", "Commands", "send_notification"),
            NoticeLevel::Information,
            "hello",
        )
    }

    #[test]
    fn should_deliver_broadcast_to_every_client() {
        let clients = ConnectedClients::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        clients.add(tx_a);
        clients.add(tx_b);

        assert_eq!(clients.broadcast(&notice()), 2);
        let a = rx_a.try_recv().unwrap();
        let b = rx_b.try_recv().unwrap();
        assert_eq!(a, b);
        assert!(a.contains("\"client_notice\""));
    }

    #[test]
    fn should_drop_closed_clients_during_broadcast() {
        let clients = ConnectedClients::new();
        let (tx_open, mut rx_open) = mpsc::unbounded_channel();
        let (tx_closed, rx_closed) = mpsc::unbounded_channel();
        clients.add(tx_open);
        clients.add(tx_closed);
        drop(rx_closed);

        assert_eq!(clients.broadcast(&notice()), 1);
        assert_eq!(clients.len(), 1);
        assert!(rx_open.try_recv().is_ok());
    }

    #[test]
    fn should_not_deliver_to_removed_client() {
        let clients = ConnectedClients::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = clients.add(tx);

        assert!(clients.remove(id));
        assert!(!clients.remove(id));
        assert_eq!(clients.broadcast(&notice()), 0);
        assert!(!clients.send_to(id, &notice()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn should_send_direct_message_to_one_client_only() {
        let clients = ConnectedClients::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = clients.add(tx_a);
        clients.add(tx_b);

        assert!(clients.send_to(a, &notice()));
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn should_queue_held_broadcasts_after_direct_sends() {
        let clients = ConnectedClients::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = clients.add(tx);
        let direct = AddressedMessage::notice(
            ControlAddress::new("general", "Commands", "snapshot"),
            NoticeLevel::Information,
            "snapshot",
        );

        assert!(clients.hold(id));
        assert_eq!(clients.broadcast(&notice()), 1);
        assert!(clients.send_to(id, &direct));
        assert_eq!(clients.release(id), 1);
        assert_eq!(clients.broadcast(&notice()), 1);

        let order: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(order.len(), 3);
        assert!(order[0].contains("\"snapshot\""));
        assert!(order[1].contains("\"hello\""));
        assert!(order[2].contains("\"hello\""));
    }

    #[test]
    fn should_drop_client_whose_channel_closed_while_held() {
        let clients = ConnectedClients::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = clients.add(tx);

        assert!(clients.hold(id));
        clients.broadcast(&notice());
        drop(rx);

        assert_eq!(clients.release(id), 0);
        assert!(!clients.contains(id));
    }
}
