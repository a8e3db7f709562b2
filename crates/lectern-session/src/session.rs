use chrono::{DateTime, Utc};
use lectern_core::{Message, Role, SessionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(SessionId::generate())
    }

    pub fn with_id(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_message(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message.in_session(self.id.clone()));
    }

    /// Append one user turn and the assistant reply to it.
    pub fn add_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.add_message(Message::user(user));
        self.add_message(Message::assistant(assistant));
    }

    /// Drop the oldest messages so at most `max_messages` remain.
    pub fn trim_to(&mut self, max_messages: usize) {
        if self.messages.len() > max_messages {
            let excess = self.messages.len() - max_messages;
            self.messages.drain(..excess);
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Render the turns as `User: ...` / `Assistant: ...` lines for a prompt.
    /// Returns `None` for an empty session.
    pub fn format_history(&self) -> Option<String> {
        let lines: Vec<String> = self
            .messages
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
