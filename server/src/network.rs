//! Listener and session bootstrap.

use crate::bot::{bot_name, Bot};
use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::dice::{Dice, RandomDice};
use crate::game_manager::GameManager;
use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// A bound listener waiting for its session to fill.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    manager: Arc<GameManager>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        Self::bind_with_dice(config, Box::new(RandomDice)).await
    }

    /// Binds with a specific dice source for rolls received from connections.
    pub async fn bind_with_dice(
        config: ServerConfig,
        dice: Box<dyn Dice>,
    ) -> Result<Self, ServerError> {
        let addr = config.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        let server = Self {
            listener,
            config,
            manager: Arc::new(GameManager::new(dice)),
        };
        info!("Server started on {}", server.local_addr()?);
        Ok(server)
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::LocalAddr)
    }

    pub fn manager(&self) -> Arc<GameManager> {
        Arc::clone(&self.manager)
    }

    /// Accepts the configured number of connections, seats bots in the
    /// remaining places and starts the session.
    ///
    /// Handshakes run inside each connection's own task, so a slow JOIN never
    /// holds up the next accept. The listener is closed once the target is
    /// reached; the returned handle owns every spawned task.
    pub async fn run(self) -> Result<SessionHandle, ServerError> {
        let Server {
            listener,
            config,
            manager,
        } = self;

        let target = config.target_players();
        let settings = config.connection_settings();
        let mut tasks = JoinSet::new();
        let mut next_id: u64 = 1;

        info!("Waiting for {} player(s)", target);
        while (next_id as usize) <= target {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    info!("New connection from {}", peer);
                    let connection =
                        Connection::new(next_id, stream, peer, Arc::clone(&manager), settings);
                    tasks.spawn(connection.run());
                    next_id += 1;
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
        drop(listener);

        for index in 1..=config.bot_count() {
            let name = bot_name(index);
            manager.admit_bot(&name).await;
            let bot = Bot::new(name, config.bot_interval);
            tasks.spawn(bot.run(Arc::clone(&manager)));
        }

        tokio::time::sleep(config.join_grace).await;
        manager.start().await;

        Ok(SessionHandle { manager, tasks })
    }
}

/// A running session. Dropping it, or calling [`SessionHandle::shutdown`],
/// cancels every connection and bot task.
pub struct SessionHandle {
    manager: Arc<GameManager>,
    tasks: JoinSet<()>,
}

impl SessionHandle {
    pub fn manager(&self) -> Arc<GameManager> {
        Arc::clone(&self.manager)
    }

    pub async fn shutdown(mut self) {
        self.tasks.shutdown().await;
        info!("Session stopped");
    }
}
