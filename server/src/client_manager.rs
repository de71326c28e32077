//! Registry of connected participants.
//!
//! Maps a joined name to the [`ClientHandle`] of its connection, keeping join
//! order so that USER_LIST and broadcast order are stable. Bots never appear
//! here; they have a seat in the game state but no connection.
//!
//! Delivery never blocks: handles only enqueue. Every operation that sends
//! reports which recipients refused the envelope so the caller can remove
//! them once the whole fan-out is done.

use crate::connection::ClientHandle;
use log::{debug, info};
use shared::Message;

/// Result of a unicast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Nobody with that name is connected.
    Missing,
    /// The recipient's queue refused the envelope.
    Failed,
}

#[derive(Debug, Default)]
pub struct ClientManager {
    clients: Vec<ClientHandle>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
        }
    }

    /// Registers `handle` under its name.
    ///
    /// A name that is already registered keeps its place in join order and the
    /// previous handle is returned so the caller can close it.
    pub fn add_client(&mut self, handle: ClientHandle) -> Option<ClientHandle> {
        info!(
            "Registered connection {} for {}",
            handle.id(),
            handle.name()
        );
        match self.clients.iter_mut().find(|c| c.name() == handle.name()) {
            Some(slot) => Some(std::mem::replace(slot, handle)),
            None => {
                self.clients.push(handle);
                None
            }
        }
    }

    /// Removes the entry for `name`.
    ///
    /// With `connection_id` set, the entry is only removed if it still belongs
    /// to that connection, so a late disconnect from a replaced connection
    /// cannot evict its successor.
    pub fn remove_client(&mut self, name: &str, connection_id: Option<u64>) -> Option<ClientHandle> {
        let index = self.clients.iter().position(|c| {
            c.name() == name && connection_id.map_or(true, |id| c.id() == id)
        })?;
        let removed = self.clients.remove(index);
        info!("Unregistered connection {} for {}", removed.id(), name);
        Some(removed)
    }

    pub fn get(&self, name: &str) -> Option<&ClientHandle> {
        self.clients.iter().find(|c| c.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in join order.
    pub fn names(&self) -> Vec<String> {
        self.clients.iter().map(|c| c.name().to_string()).collect()
    }

    /// Sends `message` to every registered connection and returns the names
    /// whose queue refused it. One refusal does not stop the fan-out.
    pub fn broadcast(&self, message: &Message) -> Vec<String> {
        let mut failed = Vec::new();
        for client in &self.clients {
            if let Err(e) = client.send(message.clone()) {
                debug!("Broadcast of {} to {} failed: {:?}", message.kind, client.name(), e);
                failed.push(client.name().to_string());
            }
        }
        failed
    }

    pub fn send_to(&self, name: &str, message: Message) -> Delivery {
        match self.get(name) {
            Some(client) => match client.send(message) {
                Ok(()) => Delivery::Sent,
                Err(_) => Delivery::Failed,
            },
            None => Delivery::Missing,
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Outbound;
    use shared::MessageType;

    fn client(id: u64, name: &str) -> (ClientHandle, Outbound) {
        ClientHandle::new(id, name, 8)
    }

    fn received(outbound: &mut Outbound) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(message) = outbound.messages.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new();
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
        assert!(manager.names().is_empty());
    }

    #[test]
    fn test_names_keep_join_order() {
        let mut manager = ClientManager::new();
        let (carol, _c) = client(3, "Carol");
        let (alice, _a) = client(1, "Alice");
        let (bob, _b) = client(2, "Bob");

        manager.add_client(carol);
        manager.add_client(alice);
        manager.add_client(bob);

        assert_eq!(manager.names(), vec!["Carol", "Alice", "Bob"]);
        assert!(manager.contains("Alice"));
        assert!(!manager.contains("Dave"));
    }

    #[test]
    fn test_add_existing_name_replaces_in_place() {
        let mut manager = ClientManager::new();
        let (first, _f) = client(1, "Alice");
        let (bob, _b) = client(2, "Bob");
        let (second, _s) = client(3, "Alice");

        assert!(manager.add_client(first).is_none());
        manager.add_client(bob);
        let previous = manager.add_client(second).unwrap();

        assert_eq!(previous.id(), 1);
        assert_eq!(manager.get("Alice").unwrap().id(), 3);
        assert_eq!(manager.names(), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_remove_client() {
        let mut manager = ClientManager::new();
        let (alice, _a) = client(1, "Alice");
        manager.add_client(alice);

        assert!(manager.remove_client("Alice", None).is_some());
        assert!(manager.is_empty());
        assert!(manager.remove_client("Alice", None).is_none());
    }

    #[test]
    fn test_remove_checks_connection_id() {
        let mut manager = ClientManager::new();
        let (old, _o) = client(1, "Alice");
        let (new, _n) = client(2, "Alice");
        manager.add_client(old);
        manager.add_client(new);

        assert!(manager.remove_client("Alice", Some(1)).is_none());
        assert_eq!(manager.get("Alice").unwrap().id(), 2);
        assert!(manager.remove_client("Alice", Some(2)).is_some());
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let mut manager = ClientManager::new();
        let (alice, mut alice_rx) = client(1, "Alice");
        let (bob, mut bob_rx) = client(2, "Bob");
        manager.add_client(alice);
        manager.add_client(bob);

        let failed = manager.broadcast(&Message::info("hello"));

        assert!(failed.is_empty());
        assert_eq!(received(&mut alice_rx)[0].content, "hello");
        assert_eq!(received(&mut bob_rx)[0].content, "hello");
    }

    #[test]
    fn test_broadcast_continues_past_failures() {
        let mut manager = ClientManager::new();
        let (alice, alice_rx) = client(1, "Alice");
        let (bob, mut bob_rx) = client(2, "Bob");
        manager.add_client(alice);
        manager.add_client(bob);
        drop(alice_rx);

        let failed = manager.broadcast(&Message::state("Alice=0,Bob=0,"));

        assert_eq!(failed, vec!["Alice"]);
        let bob_messages = received(&mut bob_rx);
        assert_eq!(bob_messages.len(), 1);
        assert_eq!(bob_messages[0].kind, MessageType::State);
    }

    #[test]
    fn test_send_to() {
        let mut manager = ClientManager::new();
        let (alice, mut alice_rx) = client(1, "Alice");
        let (bob, bob_rx) = client(2, "Bob");
        manager.add_client(alice);
        manager.add_client(bob);
        drop(bob_rx);

        assert_eq!(manager.send_to("Alice", Message::your_turn()), Delivery::Sent);
        assert_eq!(manager.send_to("Bob", Message::your_turn()), Delivery::Failed);
        assert_eq!(manager.send_to("Carol", Message::your_turn()), Delivery::Missing);
        assert_eq!(received(&mut alice_rx)[0].kind, MessageType::YourTurn);
    }
}
