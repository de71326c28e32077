//! What the client knows about the session. Everything here is derived from
//! server envelopes; the client never computes positions itself.

use log::debug;
use shared::{parse_state, Message, MessageType, ProtocolError};
use std::collections::BTreeMap;

/// Conversation key for public chat.
pub const EVERYONE: &str = "Everyone";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub from: String,
    pub text: String,
    pub timestamp: Option<u64>,
}

/// What changed after applying one envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Notice(String),
    Moved(String),
    Standings,
    Users,
    YourTurn,
    Chat { conversation: String },
    Ignored,
}

#[derive(Debug, Clone)]
pub struct ClientView {
    name: String,
    positions: Vec<(String, u32)>,
    users: Vec<String>,
    my_turn: bool,
    conversations: BTreeMap<String, Vec<ChatLine>>,
}

impl ClientView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            positions: Vec::new(),
            users: Vec::new(),
            my_turn: false,
            conversations: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&mut self, message: Message) -> Result<ClientEvent, ProtocolError> {
        if message.kind.is_server_only() && !message.is_from_server() {
            debug!("Ignoring {} claiming to be from {}", message.kind, message.sender);
            return Ok(ClientEvent::Ignored);
        }

        let event = match message.kind {
            MessageType::Info => ClientEvent::Notice(message.content),
            MessageType::Move => ClientEvent::Moved(message.content),
            MessageType::State => {
                self.positions = parse_state(&message.content)?;
                ClientEvent::Standings
            }
            MessageType::UserList => {
                self.users = message.user_list.unwrap_or_default();
                ClientEvent::Users
            }
            MessageType::YourTurn => {
                self.my_turn = true;
                ClientEvent::YourTurn
            }
            MessageType::PublicChat => self.record(EVERYONE.to_string(), message),
            MessageType::PrivateChat => {
                // Our own whispers come back from the server; file them under
                // the person we sent them to.
                let counterpart = if message.sender == self.name {
                    message.recipient.clone().unwrap_or_default()
                } else {
                    message.sender.clone()
                };
                self.record(counterpart, message)
            }
            MessageType::Join | MessageType::Roll | MessageType::Typing => {
                debug!("Ignoring {} from {}", message.kind, message.sender);
                ClientEvent::Ignored
            }
        };
        Ok(event)
    }

    fn record(&mut self, conversation: String, message: Message) -> ClientEvent {
        self.conversations
            .entry(conversation.clone())
            .or_default()
            .push(ChatLine {
                from: message.sender,
                text: message.content,
                timestamp: message.timestamp,
            });
        ClientEvent::Chat { conversation }
    }

    pub fn positions(&self) -> &[(String, u32)] {
        &self.positions
    }

    pub fn position_of(&self, name: &str) -> Option<u32> {
        self.positions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| *p)
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn can_roll(&self) -> bool {
        self.my_turn
    }

    /// Spends the turn notification. Returns false if there was none.
    pub fn take_roll(&mut self) -> bool {
        std::mem::replace(&mut self.my_turn, false)
    }

    pub fn conversation(&self, key: &str) -> &[ChatLine] {
        self.conversations
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn conversation_keys(&self) -> impl Iterator<Item = &str> {
        self.conversations.keys().map(String::as_str)
    }
}
