//! Per-connection handler.
//!
//! Each accepted socket gets one reader task (this module's [`Connection::run`])
//! and one writer task. Everyone else talks to the connection through a
//! [`ClientHandle`], which only pushes envelopes into a bounded queue and
//! never touches the socket. A full queue, a closed queue or a write that
//! exceeds the write timeout all wake the reader task, which then runs the
//! disconnect path exactly once.

use crate::game_manager::GameManager;
use log::{debug, info, warn};
use shared::{
    read_message, validate_name, write_message, Message, MessageType, ProtocolError,
    PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Why a [`ClientHandle::send`] was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The peer is not draining its queue fast enough.
    QueueFull,
    /// The writer task has already stopped.
    Closed,
}

/// Cloneable sending side of one connection.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: u64,
    name: String,
    outbound: mpsc::Sender<Message>,
    shutdown: Arc<Notify>,
    closed: Arc<AtomicBool>,
}

/// Receiving side of a connection's outbound queue, owned by the writer task.
#[derive(Debug)]
pub struct Outbound {
    pub messages: mpsc::Receiver<Message>,
    pub shutdown: Arc<Notify>,
}

impl ClientHandle {
    pub fn new(id: u64, name: impl Into<String>, capacity: usize) -> (Self, Outbound) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let shutdown = Arc::new(Notify::new());

        let handle = Self {
            id,
            name: name.into(),
            outbound: tx,
            shutdown: Arc::clone(&shutdown),
            closed: Arc::new(AtomicBool::new(false)),
        };
        let outbound = Outbound {
            messages: rx,
            shutdown,
        };
        (handle, outbound)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queues `message` for this connection without blocking.
    ///
    /// On failure the connection's own disconnect path is triggered; callers
    /// only need the result to schedule the registry removal.
    pub fn send(&self, message: Message) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }

        match self.outbound.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Outbound queue for {} (connection {}) is full, disconnecting",
                    self.name, self.id
                );
                self.shutdown.notify_one();
                Err(SendError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => {
                self.shutdown.notify_one();
                Err(SendError::Closed)
            }
        }
    }

    /// Asks the reader task to disconnect.
    pub fn request_disconnect(&self) {
        self.shutdown.notify_one();
    }

    /// Marks the connection closed. Returns true only for the first call.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub queue_capacity: usize,
    pub write_timeout: Duration,
}

/// Aborts the writer task when the reader side goes away, including when the
/// reader task itself is aborted.
struct WriterTask(JoinHandle<()>);

impl Drop for WriterTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct Connection {
    id: u64,
    stream: TcpStream,
    peer: SocketAddr,
    manager: Arc<GameManager>,
    settings: ConnectionSettings,
}

impl Connection {
    pub fn new(
        id: u64,
        stream: TcpStream,
        peer: SocketAddr,
        manager: Arc<GameManager>,
        settings: ConnectionSettings,
    ) -> Self {
        Self {
            id,
            stream,
            peer,
            manager,
            settings,
        }
    }

    /// Runs the connection to completion: JOIN handshake, receive loop,
    /// disconnect.
    pub async fn run(self) {
        let Connection {
            id,
            stream,
            peer,
            manager,
            settings,
        } = self;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY for {}: {}", peer, e);
        }

        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let name = match handshake(&mut reader).await {
            Ok(name) => name,
            Err(reason) => {
                warn!("Dropping connection {} from {}: {}", id, peer, reason);
                return;
            }
        };

        let (handle, outbound) = ClientHandle::new(id, name.clone(), settings.queue_capacity);
        let shutdown = Arc::clone(&outbound.shutdown);
        let _writer = WriterTask(tokio::spawn(write_loop(
            BufWriter::new(write_half),
            outbound,
            settings.write_timeout,
            name.clone(),
        )));

        info!("Player joined: {} (connection {} from {})", name, id, peer);
        manager.admit(handle.clone()).await;

        receive_loop(&mut reader, &shutdown, &manager, &name).await;

        disconnect(&handle, &manager).await;
    }
}

/// Reads the first envelope, which must be a valid JOIN.
async fn handshake<R>(reader: &mut R) -> Result<String, String>
where
    R: AsyncRead + Unpin,
{
    let message = match read_message(reader).await {
        Ok(Some(message)) => message,
        Ok(None) => return Err("closed before JOIN".to_string()),
        Err(e) => return Err(format!("unreadable JOIN: {}", e)),
    };

    if message.kind != MessageType::Join {
        return Err(format!("expected JOIN, got {}", message.kind));
    }
    if message.version != PROTOCOL_VERSION {
        return Err(format!(
            "protocol version {} (server speaks {})",
            message.version, PROTOCOL_VERSION
        ));
    }
    validate_name(&message.sender).map_err(|e| e.to_string())?;

    Ok(message.sender)
}

/// Dispatches inbound envelopes until the stream ends, a frame fails to
/// decode, or a disconnect is requested.
async fn receive_loop<R>(reader: &mut R, shutdown: &Notify, manager: &GameManager, name: &str)
where
    R: AsyncRead + Unpin,
{
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!("Disconnect requested for {}", name);
                break;
            }
            result = read_message(reader) => match result {
                Ok(Some(message)) => manager.dispatch(message, name).await,
                Ok(None) => {
                    info!("Player {} disconnected.", name);
                    break;
                }
                Err(ProtocolError::Io(e)) => {
                    info!("Player {} connection lost: {}", name, e);
                    break;
                }
                Err(e) => {
                    warn!("Dropping {} after protocol error: {}", name, e);
                    break;
                }
            }
        }
    }
}

/// Drains the outbound queue onto the socket. Any failure or stall wakes the
/// reader task through the shutdown notifier.
async fn write_loop<W>(mut writer: W, mut outbound: Outbound, write_timeout: Duration, name: String)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbound.messages.recv().await {
        match timeout(write_timeout, write_message(&mut writer, &message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Write to {} failed: {}", name, e);
                break;
            }
            Err(_) => {
                warn!("Write to {} timed out after {:?}", name, write_timeout);
                break;
            }
        }
    }
    outbound.shutdown.notify_one();
}

/// Runs at most once per connection, whichever side noticed the failure.
async fn disconnect(handle: &ClientHandle, manager: &GameManager) {
    if !handle.close() {
        return;
    }
    manager.remove_connection(handle.name(), handle.id()).await;
}
