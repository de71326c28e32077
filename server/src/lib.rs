//! # Board Game Session Server
//!
//! This library provides the authoritative server for a small turn-based dice
//! game played over TCP. Up to four participants share a table; humans connect
//! as clients, and seats left empty are taken by bots that play by exactly the
//! same rules.
//!
//! ## Core Responsibilities
//!
//! ### Turn Arbitration
//! Exactly one participant holds the turn at any time. A roll from anyone else
//! is ignored. After a valid roll the mover's position advances by the dice
//! value and the turn passes to the next seat in join order.
//!
//! ### Message Routing
//! Public chat goes to every connection, private chat to the recipient and the
//! sender only. Game events (moves, position snapshots, turn notices, the user
//! list) are pushed by the server; clients never compute state themselves.
//!
//! ### Connection Lifecycle
//! Each connection has to open with a JOIN. Disconnects are detected from
//! either direction, processed once, and announced to everyone left.
//!
//! ## Architecture Design
//!
//! ### Tasks Around One Lock
//! Every connection runs a reader task and a writer task, every bot runs its
//! own task, and all of them call into a single [`game_manager::GameManager`].
//! Its mutex serializes every state change, so two rolls can never interleave.
//! The lock is never held across socket I/O: outgoing envelopes are pushed into
//! bounded per-connection queues and written by the connection's writer task.
//!
//! ### Length-Prefixed Frames
//! Envelopes are bincode-encoded and framed with a 4-byte big-endian length
//! (see the `shared` crate).
//!
//! ## Module Organization
//!
//! - `game`: seats, positions, the turn pointer and the session phase
//! - `game_manager`: the coordinator owning the game state and the registry
//! - `client_manager`: name to connection registry with broadcast and unicast
//! - `connection`: JOIN handshake, receive loop, writer task, disconnect path
//! - `bot`: autonomous participants
//! - `dice`: random and scripted dice sources
//! - `config`: server settings
//! - `network`: listener, bootstrap and session start
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Wait for two humans, seat two bots, then start.
//!     let server = Server::bind(ServerConfig::default().with_players(2)).await?;
//!     let session = server.run().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod client_manager;
pub mod config;
pub mod connection;
pub mod dice;
pub mod game;
pub mod game_manager;
pub mod network;
