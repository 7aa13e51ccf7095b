//! Message protocol definitions
//!
//! Plain-text, newline-framed protocol. Inbound lines are classified into
//! chat text or slash commands; outbound messages carry a timestamp, an
//! optional sender and a delivery class, and render to one wire line.

use std::fmt;

use chrono::{DateTime, Local};

use crate::command::Command;
use crate::error::CommandError;
use crate::types::Nickname;

/// Timestamp format used on chat lines
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Client → Server message
///
/// One inbound line after the handshake, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Plain text for everyone else
    Chat { body: String },
    /// Well-formed slash command
    Command(Command),
    /// Slash-prefixed line that failed to parse
    Malformed(CommandError),
}

impl ClientMessage {
    /// Classify one inbound line
    ///
    /// Returns `None` for blank lines, which carry nothing to deliver.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if line.trim_start().is_empty() {
            return None;
        }

        if line.trim_start().starts_with('/') {
            return Some(match Command::parse(line) {
                Ok(cmd) => ClientMessage::Command(cmd),
                Err(e) => ClientMessage::Malformed(e),
            });
        }

        Some(ClientMessage::Chat {
            body: line.to_string(),
        })
    }
}

/// Delivery class of an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Everyone except the sender
    Broadcast,
    /// One named recipient
    Private,
    /// Server notice (join/leave)
    System,
    /// Answer to the issuing client only
    DirectReply,
}

/// Server → Client message
///
/// `Display` produces the exact wire line (without the trailing newline).
#[derive(Debug, Clone)]
pub enum ServerMessage {
    /// Public chat line
    Chat {
        sent_at: DateTime<Local>,
        from: Nickname,
        body: String,
    },
    /// Private line from `/msg`
    Private {
        sent_at: DateTime<Local>,
        from: Nickname,
        body: String,
    },
    /// Join/leave and other notices
    System(String),
    /// Reply to a command
    Reply(String),
}

impl ServerMessage {
    /// Public chat line stamped with the current local time
    pub fn chat(from: Nickname, body: impl Into<String>) -> Self {
        ServerMessage::Chat {
            sent_at: Local::now(),
            from,
            body: body.into(),
        }
    }

    /// Private line stamped with the current local time
    pub fn private(from: Nickname, body: impl Into<String>) -> Self {
        ServerMessage::Private {
            sent_at: Local::now(),
            from,
            body: body.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        ServerMessage::System(text.into())
    }

    pub fn reply(text: impl Into<String>) -> Self {
        ServerMessage::Reply(text.into())
    }

    pub fn joined(nickname: &Nickname) -> Self {
        Self::system(format!("{} joined the chat", nickname))
    }

    pub fn left(nickname: &Nickname) -> Self {
        Self::system(format!("{} left the chat", nickname))
    }

    pub fn delivery(&self) -> Delivery {
        match self {
            ServerMessage::Chat { .. } => Delivery::Broadcast,
            ServerMessage::Private { .. } => Delivery::Private,
            ServerMessage::System(_) => Delivery::System,
            ServerMessage::Reply(_) => Delivery::DirectReply,
        }
    }

    /// Sender nickname, `None` for server-originated lines
    pub fn sender(&self) -> Option<&Nickname> {
        match self {
            ServerMessage::Chat { from, .. } | ServerMessage::Private { from, .. } => Some(from),
            ServerMessage::System(_) | ServerMessage::Reply(_) => None,
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Chat {
                sent_at,
                from,
                body,
            } => write!(f, "{} - {}: {}", sent_at.format(TIME_FORMAT), from, body),
            ServerMessage::Private {
                sent_at,
                from,
                body,
            } => write!(
                f,
                "{} - (Private) {}: {}",
                sent_at.format(TIME_FORMAT),
                from,
                body
            ),
            ServerMessage::System(text) | ServerMessage::Reply(text) => f.write_str(text),
        }
    }
}

/// Convert CommandError to ServerMessage for client notification
impl From<CommandError> for ServerMessage {
    fn from(err: CommandError) -> Self {
        ServerMessage::Reply(err.to_string())
    }
}
