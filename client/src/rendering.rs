//! Plain-text rendering of the client view.

use crate::game::{ChatLine, ClientEvent, ClientView, EVERYONE};

pub struct Renderer {
    name: String,
}

impl Renderer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Text to show for an event, if any.
    pub fn render_event(&self, view: &ClientView, event: &ClientEvent) -> Option<String> {
        match event {
            ClientEvent::Notice(text) | ClientEvent::Moved(text) => Some(format!("* {}", text)),
            ClientEvent::Standings => Some(self.render_standings(view)),
            ClientEvent::Users => Some(self.render_users(view)),
            ClientEvent::YourTurn => Some("Your turn! Type /roll".to_string()),
            ClientEvent::Chat { conversation } => view
                .conversation(conversation)
                .last()
                .map(|line| self.render_chat_line(conversation, line)),
            ClientEvent::Ignored => None,
        }
    }

    /// One line per seat, own seat marked.
    pub fn render_standings(&self, view: &ClientView) -> String {
        let mut out = String::from("Positions:");
        for (name, position) in view.positions() {
            let marker = if *name == self.name { ">" } else { " " };
            out.push_str(&format!("\n {} {:<12} {:>4}", marker, name, position));
        }
        out
    }

    pub fn render_users(&self, view: &ClientView) -> String {
        format!("Online: {}", view.users().join(", "))
    }

    pub fn render_chat_line(&self, conversation: &str, line: &ChatLine) -> String {
        if conversation == EVERYONE {
            format!("[{}] {}: {}", EVERYONE, line.from, line.text)
        } else {
            format!("[{} <-> {}] {}: {}", self.name, conversation, line.from, line.text)
        }
    }

    /// Every conversation with its message count.
    pub fn render_conversations(&self, view: &ClientView) -> String {
        let mut out = String::from("Conversations:");
        for key in view.conversation_keys() {
            out.push_str(&format!("\n  {} ({})", key, view.conversation(key).len()));
        }
        out
    }
}
