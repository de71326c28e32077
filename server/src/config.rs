//! Server settings shared by the binary and the tests.

use crate::bot::DEFAULT_BOT_INTERVAL;
use crate::connection::ConnectionSettings;
use shared::MAX_SEATS;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_PLAYERS: usize = 2;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Number of human connections to wait for, in `1..=4`.
    pub players: usize,
    /// Fill the seats left over by `players` with bots.
    pub bots: bool,
    pub bot_interval: Duration,
    /// Pause between the last accept and the start of the session, so that
    /// in-flight JOIN handshakes can finish.
    pub join_grace: Duration,
    pub write_timeout: Duration,
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            players: DEFAULT_PLAYERS,
            bots: true,
            bot_interval: DEFAULT_BOT_INTERVAL,
            join_grace: Duration::from_secs(2),
            write_timeout: Duration::from_secs(5),
            queue_capacity: 64,
        }
    }
}

impl ServerConfig {
    /// Sets the player target, clamped to the table size.
    pub fn with_players(mut self, players: usize) -> Self {
        self.players = clamp_players(players);
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Human connections to accept before seating bots.
    pub fn target_players(&self) -> usize {
        clamp_players(self.players)
    }

    pub fn bot_count(&self) -> usize {
        if self.bots {
            MAX_SEATS - self.target_players()
        } else {
            0
        }
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            queue_capacity: self.queue_capacity.max(1),
            write_timeout: self.write_timeout,
        }
    }
}

pub fn clamp_players(players: usize) -> usize {
    players.clamp(1, MAX_SEATS)
}
