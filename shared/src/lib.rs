//! Wire protocol shared by the session server and its clients.
//!
//! Every transmission is one [`Message`] envelope: a closed [`MessageType`]
//! discriminant, a text payload, the sender's name and the optional
//! recipient / user list / timestamp fields. Envelopes travel inside
//! length-prefixed frames (see [`framing`]) so message boundaries survive the
//! byte stream.
//!
//! The STATE payload is a comma-joined `name=position` list with a trailing
//! comma (`"Alice=4,Bob=0,"`). Names are not escaped, so a participant name
//! may not contain `=` or `,`; [`validate_name`] enforces that at join time.

pub mod framing;

pub use framing::{read_message, write_message, MAX_MESSAGE_SIZE};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Envelope layout version. Bumped whenever [`Message`] changes shape.
pub const PROTOCOL_VERSION: u16 = 1;

/// Sender id stamped on every envelope the server originates.
pub const SERVER_SENDER: &str = "SERVER";

pub const MIN_DICE: u32 = 1;
pub const MAX_DICE: u32 = 6;

/// Highest seat count of a session; seats not taken by humans go to bots.
pub const MAX_SEATS: usize = 4;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("frame too large: {0} bytes")]
    FrameTooLarge(usize),

    #[error("malformed state entry {0:?}")]
    MalformedState(String),

    #[error("invalid participant name {0:?}")]
    InvalidName(String),

    #[error("unknown message type {0:?}")]
    UnknownType(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Join,
    Info,
    State,
    YourTurn,
    Move,
    Roll,
    PublicChat,
    PrivateChat,
    UserList,
    /// Reserved; the server accepts and ignores it.
    Typing,
}

impl MessageType {
    pub const ALL: [MessageType; 10] = [
        MessageType::Join,
        MessageType::Info,
        MessageType::State,
        MessageType::YourTurn,
        MessageType::Move,
        MessageType::Roll,
        MessageType::PublicChat,
        MessageType::PrivateChat,
        MessageType::UserList,
        MessageType::Typing,
    ];

    /// The exact, case-sensitive wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Join => "JOIN",
            MessageType::Info => "INFO",
            MessageType::State => "STATE",
            MessageType::YourTurn => "YOUR_TURN",
            MessageType::Move => "MOVE",
            MessageType::Roll => "ROLL",
            MessageType::PublicChat => "PUBLIC_CHAT",
            MessageType::PrivateChat => "PRIVATE_CHAT",
            MessageType::UserList => "USER_LIST",
            MessageType::Typing => "TYPING",
        }
    }

    /// Kinds only the server may emit. A client sending one is ignored.
    pub fn is_server_only(self) -> bool {
        matches!(
            self,
            MessageType::Info
                | MessageType::State
                | MessageType::YourTurn
                | MessageType::Move
                | MessageType::UserList
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownType(s.to_string()))
    }
}

/// One protocol envelope. Built fresh for each transmission.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    pub version: u16,
    pub kind: MessageType,
    pub content: String,
    pub sender: String,
    pub recipient: Option<String>,
    pub user_list: Option<Vec<String>>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: Option<u64>,
}

impl Message {
    pub fn new(kind: MessageType, content: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            kind,
            content: content.into(),
            sender: sender.into(),
            recipient: None,
            user_list: None,
            timestamp: None,
        }
    }

    /// Envelope originated by the server.
    pub fn server(kind: MessageType, content: impl Into<String>) -> Self {
        Self::new(kind, content, SERVER_SENDER)
    }

    pub fn join(name: impl Into<String>) -> Self {
        Self::new(MessageType::Join, "", name)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::server(MessageType::Info, text)
    }

    pub fn state(payload: impl Into<String>) -> Self {
        Self::server(MessageType::State, payload)
    }

    pub fn your_turn() -> Self {
        Self::server(MessageType::YourTurn, "")
    }

    pub fn moved(description: impl Into<String>) -> Self {
        Self::server(MessageType::Move, description)
    }

    pub fn roll(name: impl Into<String>) -> Self {
        Self::new(MessageType::Roll, "", name)
    }

    pub fn public_chat(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(MessageType::PublicChat, text, sender).with_timestamp(get_timestamp())
    }

    pub fn private_chat(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let mut message =
            Self::new(MessageType::PrivateChat, text, sender).with_timestamp(get_timestamp());
        message.recipient = Some(recipient.into());
        message
    }

    pub fn user_list(names: Vec<String>) -> Self {
        let mut message = Self::server(MessageType::UserList, "");
        message.user_list = Some(names);
        message
    }

    pub fn typing(sender: impl Into<String>) -> Self {
        Self::new(MessageType::Typing, "", sender)
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn is_from_server(&self) -> bool {
        self.sender == SERVER_SENDER
    }
}

/// Current time in milliseconds since the Unix epoch.
pub fn get_timestamp() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    millis.min(u64::MAX as u128) as u64
}

/// Checks a participant name against the STATE grammar.
pub fn validate_name(name: &str) -> Result<(), ProtocolError> {
    if name.trim().is_empty() || name.contains('=') || name.contains(',') {
        return Err(ProtocolError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Encodes positions as `name=position,` pairs in the given order.
pub fn format_state<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, u32)>,
{
    let mut payload = String::new();
    for (name, position) in entries {
        payload.push_str(name);
        payload.push('=');
        payload.push_str(&position.to_string());
        payload.push(',');
    }
    payload
}

/// Decodes a STATE payload, keeping the order of the entries.
pub fn parse_state(payload: &str) -> Result<Vec<(String, u32)>, ProtocolError> {
    payload
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, position) = entry
                .split_once('=')
                .ok_or_else(|| ProtocolError::MalformedState(entry.to_string()))?;
            let position = position
                .trim()
                .parse::<u32>()
                .map_err(|_| ProtocolError::MalformedState(entry.to_string()))?;
            Ok((name.trim().to_string(), position))
        })
        .collect()
}
