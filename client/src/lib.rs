//! # Board Game Terminal Client
//!
//! A line-oriented client for the dice game server. It joins under a name,
//! shows every update the server pushes, and turns terminal input into rolls
//! and chat.
//!
//! ## Architecture Overview
//!
//! The client holds no game logic. Positions, the user list and turn
//! notifications all arrive from the server, and the client only keeps the
//! latest copy of each for display.
//!
//! ### Reading and Typing Concurrently
//! Incoming frames are read on a dedicated task and handed over through a
//! channel, so the main loop can wait on the server and on standard input at
//! the same time without ever abandoning a half-read frame.
//!
//! ### Conversations
//! Chat is filed per conversation: public chat under `Everyone`, private chat
//! under the other participant's name. The server echoes every chat message
//! back to its sender, so outgoing chat is never recorded locally.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The client view: standings parsed from STATE, the user list, the pending
//! turn notification and chat history.
//!
//! ### Input Module (`input`)
//! Parses terminal lines into commands and commands into envelopes.
//!
//! ### Network Module (`network`)
//! The connection to the server and the main loop.
//!
//! ### Rendering Module (`rendering`)
//! Formats view updates as text.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::connect("127.0.0.1:5000", "Alice", false).await?;
//!     client.run().await
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
