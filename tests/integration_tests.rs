//! Integration tests for the dice game server and client
//!
//! These tests run a real server on a loopback port and talk to it over TCP.

use server::config::ServerConfig;
use server::dice::ScriptedDice;
use server::network::{Server, SessionHandle};
use shared::{read_message, write_message, Message, MessageType};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

const WAIT: Duration = Duration::from_secs(5);

fn local_config(players: usize) -> ServerConfig {
    ServerConfig {
        port: 0,
        bots: false,
        join_grace: Duration::from_millis(50),
        ..ServerConfig::default().with_players(players)
    }
}

async fn start_server(
    config: ServerConfig,
    draws: &[u32],
) -> (SocketAddr, JoinHandle<SessionHandle>) {
    let server = Server::bind_with_dice(config, Box::new(ScriptedDice::new(draws.to_vec())))
        .await
        .expect("Failed to bind server");
    let addr = server.local_addr().unwrap();
    let session = tokio::spawn(async move { server.run().await.expect("Session failed") });
    (addr, session)
}

/// A raw protocol peer.
struct Peer {
    name: String,
    stream: TcpStream,
}

impl Peer {
    async fn join(addr: SocketAddr, name: &str) -> Self {
        let mut stream = TcpStream::connect(addr).await.expect("Failed to connect");
        write_message(&mut stream, &Message::join(name)).await.unwrap();
        let mut peer = Peer {
            name: name.to_string(),
            stream,
        };
        let joined = format!("{} joined!", name);
        peer.expect(|m| m.kind == MessageType::Info && m.content == joined)
            .await;
        peer
    }

    async fn send(&mut self, message: Message) {
        write_message(&mut self.stream, &message).await.unwrap();
    }

    async fn recv(&mut self) -> Option<Message> {
        tokio::time::timeout(WAIT, read_message(&mut self.stream))
            .await
            .expect("Timed out waiting for a message")
            .ok()
            .flatten()
    }

    /// Reads until a message matches, returning it and everything before it.
    async fn expect<F>(&mut self, matches: F) -> (Message, Vec<Message>)
    where
        F: Fn(&Message) -> bool,
    {
        let mut skipped = Vec::new();
        loop {
            let message = self
                .recv()
                .await
                .unwrap_or_else(|| panic!("{} was disconnected", self.name));
            if matches(&message) {
                return (message, skipped);
            }
            skipped.push(message);
        }
    }

    async fn expect_kind(&mut self, kind: MessageType) -> Message {
        self.expect(|m| m.kind == kind).await.0
    }
}

/// SESSION FLOW TESTS
mod session_tests {
    use super::*;

    /// Two humans, no bots, scripted dice: the full start, roll and rotate cycle
    #[tokio::test]
    async fn two_player_session() {
        let (addr, session) = start_server(local_config(2), &[4, 2]).await;

        let mut alice = Peer::join(addr, "Alice").await;
        let mut bob = Peer::join(addr, "Bob").await;
        let session = session.await.unwrap();

        let (_, before) = alice
            .expect(|m| m.content == "Game Started with 2 players!")
            .await;
        assert!(before.iter().any(|m| m.content == "Bob joined!"));
        let users = alice.expect_kind(MessageType::UserList).await;
        assert_eq!(
            users.user_list,
            Some(vec!["Alice".to_string(), "Bob".to_string()])
        );
        assert_eq!(
            alice.expect_kind(MessageType::State).await.content,
            "Alice=0,Bob=0,"
        );
        assert_eq!(
            alice.expect_kind(MessageType::Info).await.content,
            "It's Alice's turn!"
        );
        alice.expect_kind(MessageType::YourTurn).await;

        // Out of turn: ignored. The chat after it proves it was processed.
        bob.send(Message::roll("Bob")).await;
        bob.send(Message::public_chat("Bob", "sorry")).await;
        bob.expect(|m| m.kind == MessageType::PublicChat && m.content == "sorry")
            .await;

        alice.send(Message::roll("Alice")).await;
        let (moved, before) = bob.expect(|m| m.kind == MessageType::Move).await;
        assert_eq!(moved.content, "Alice rolled 4 (pos: 4)");
        assert!(before.iter().all(|m| m.kind != MessageType::Move));
        assert_eq!(
            bob.expect_kind(MessageType::State).await.content,
            "Alice=4,Bob=0,"
        );
        assert_eq!(
            bob.expect_kind(MessageType::Info).await.content,
            "It's Bob's turn!"
        );
        bob.expect_kind(MessageType::YourTurn).await;

        // Alice's own MOVE is still queued ahead of Bob's.
        bob.send(Message::roll("Bob")).await;
        let (moved, before) = alice
            .expect(|m| m.kind == MessageType::Move && m.content.starts_with("Bob "))
            .await;
        assert_eq!(moved.content, "Bob rolled 2 (pos: 2)");
        assert!(before
            .iter()
            .any(|m| m.kind == MessageType::Move && m.content == "Alice rolled 4 (pos: 4)"));
        assert_eq!(
            alice.expect_kind(MessageType::State).await.content,
            "Alice=4,Bob=2,"
        );
        alice.expect_kind(MessageType::YourTurn).await;

        let manager = session.manager();
        assert_eq!(manager.current_turn().await.as_deref(), Some("Alice"));
        session.shutdown().await;
    }

    /// A single human is joined by three bots that take their turns
    #[tokio::test]
    async fn bots_fill_empty_seats() {
        let config = ServerConfig {
            bots: true,
            bot_interval: Duration::from_millis(10),
            ..local_config(1)
        };
        let (addr, session) = start_server(config, &[1]).await;

        let mut solo = Peer::join(addr, "Solo").await;
        let session = session.await.unwrap();

        solo.expect(|m| m.kind == MessageType::Info && m.content == "Game Started with 4 players!")
            .await;

        // Bots are seated as soon as the last connection is accepted, so a
        // human whose JOIN is still in flight sits after them.
        let state = solo.expect_kind(MessageType::State).await;
        let seats: Vec<String> = shared::parse_state(&state.content)
            .unwrap()
            .into_iter()
            .map(|(name, position)| {
                assert_eq!(position, 0);
                name
            })
            .collect();
        let mut sorted = seats.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["BOT-1", "BOT-2", "BOT-3", "Solo"]);

        // One full round, driven by whoever holds the turn.
        let mut moves = Vec::new();
        while moves.len() < 4 {
            let message = solo.recv().await.expect("Solo was disconnected");
            match message.kind {
                MessageType::YourTurn => solo.send(Message::roll("Solo")).await,
                MessageType::Move => moves.push(message.content),
                _ => {}
            }
        }

        let movers: Vec<&str> = moves
            .iter()
            .map(|line| line.split(" rolled ").next().unwrap_or_default())
            .collect();
        assert_eq!(movers, seats);
        assert!(moves.contains(&"Solo rolled 1 (pos: 1)".to_string()));

        session.shutdown().await;
    }
}

/// ROUTING AND DISCONNECT TESTS
mod routing_tests {
    use super::*;

    #[tokio::test]
    async fn private_chat_and_departure() {
        let (addr, session) = start_server(local_config(3), &[1]).await;

        let mut alice = Peer::join(addr, "Alice").await;
        let mut bob = Peer::join(addr, "Bob").await;
        let mut carol = Peer::join(addr, "Carol").await;
        let session = session.await.unwrap();

        alice
            .send(Message::private_chat("Alice", "Carol", "meet at 12"))
            .await;
        alice.send(Message::public_chat("Alice", "hello all")).await;

        let whisper = carol.expect_kind(MessageType::PrivateChat).await;
        assert_eq!(whisper.sender, "Alice");
        assert_eq!(whisper.content, "meet at 12");
        let echo = alice.expect_kind(MessageType::PrivateChat).await;
        assert_eq!(echo.recipient.as_deref(), Some("Carol"));

        let (public, skipped) = bob
            .expect(|m| m.kind == MessageType::PublicChat)
            .await;
        assert_eq!(public.content, "hello all");
        assert!(skipped.iter().all(|m| m.kind != MessageType::PrivateChat));

        drop(bob);

        let (notice, before) = alice
            .expect(|m| m.kind == MessageType::Info && m.content == "Bob has left the game.")
            .await;
        assert_eq!(notice.content, "Bob has left the game.");
        let last_list = before
            .iter()
            .rev()
            .find(|m| m.kind == MessageType::UserList)
            .expect("user list before the departure notice");
        assert_eq!(
            last_list.user_list,
            Some(vec!["Alice".to_string(), "Carol".to_string()])
        );

        let manager = session.manager();
        assert_eq!(manager.connected_names().await, vec!["Alice", "Carol"]);
        assert_eq!(manager.snapshot().await, "Alice=0,Carol=0,");
        session.shutdown().await;
    }

    /// A connection that does not open with JOIN is dropped without a seat
    #[tokio::test]
    async fn first_message_must_be_join() {
        let (addr, session) = start_server(local_config(1), &[1]).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        write_message(&mut stream, &Message::public_chat("Mallory", "hi"))
            .await
            .unwrap();

        let result = tokio::time::timeout(WAIT, read_message(&mut stream))
            .await
            .expect("server should close the connection");
        assert!(!matches!(result, Ok(Some(_))));

        let session = session.await.unwrap();
        assert_eq!(session.manager().participant_count().await, 0);
        session.shutdown().await;
    }

    /// Garbage after a valid JOIN is treated as a disconnect
    #[tokio::test]
    async fn undecodable_frame_disconnects() {
        let (addr, session) = start_server(local_config(2), &[1]).await;

        let mut alice = Peer::join(addr, "Alice").await;
        let mut mallory = Peer::join(addr, "Mallory").await;
        let session = session.await.unwrap();

        let garbage = [0u8, 0, 0, 3, 0xff, 0xff, 0xff];
        tokio::io::AsyncWriteExt::write_all(&mut mallory.stream, &garbage)
            .await
            .unwrap();

        alice
            .expect(|m| m.content == "Mallory has left the game.")
            .await;
        assert_eq!(session.manager().connected_names().await, vec!["Alice"]);
        session.shutdown().await;
    }
}

/// CLIENT LIBRARY TESTS
mod client_tests {
    use super::*;
    use client::network::Client;

    #[tokio::test]
    async fn auto_rolling_client_plays_alone() {
        let (addr, session) = start_server(local_config(1), &[3]).await;

        let mut client = Client::connect(&addr.to_string(), "Solo", true)
            .await
            .unwrap();
        let session = session.await.unwrap();

        tokio::time::timeout(WAIT, async {
            while client.view().position_of("Solo") != Some(9) {
                client
                    .next_event()
                    .await
                    .unwrap()
                    .expect("server closed the connection");
            }
        })
        .await
        .expect("client should keep rolling");

        assert!(client.view().users().contains(&"Solo".to_string()));
        session.shutdown().await;
    }
}
