//! Terminal command parsing.
//!
//! Plain text is public chat. Commands start with a slash:
//! `/roll`, `/w <name> <text>`, `/who`, `/chats`, `/quit`.

use shared::Message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Roll,
    Public(String),
    Private { to: String, text: String },
    Who,
    Chats,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if !line.starts_with('/') {
        return Command::Public(line.to_string());
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb {
        "/roll" | "/r" => Command::Roll,
        "/who" => Command::Who,
        "/chats" => Command::Chats,
        "/quit" | "/q" => Command::Quit,
        "/w" | "/msg" => match rest.split_once(char::is_whitespace) {
            Some((to, text)) if !text.trim().is_empty() => Command::Private {
                to: to.to_string(),
                text: text.trim().to_string(),
            },
            _ => Command::Invalid("usage: /w <name> <message>".to_string()),
        },
        other => Command::Invalid(format!("unknown command {}", other)),
    }
}

impl Command {
    /// Envelope to send for this command, if it produces one.
    pub fn into_message(self, me: &str) -> Option<Message> {
        match self {
            Command::Roll => Some(Message::roll(me)),
            Command::Public(text) => Some(Message::public_chat(me, text)),
            Command::Private { to, text } => Some(Message::private_chat(me, to, text)),
            Command::Who | Command::Chats | Command::Quit | Command::Empty | Command::Invalid(_) => {
                None
            }
        }
    }
}
