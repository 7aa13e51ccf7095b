//! Error types for the chat server
//!
//! Defines connection-level errors, per-recipient send errors, registry
//! and nickname validation errors, and command errors that are reported
//! back to the issuing client. Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

use crate::types::ClientId;

/// Application-level errors
///
/// Every variant terminates at most one connection (or, for `Config`,
/// server startup). None of them are allowed to reach the accept loop.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error: invalid UTF-8 or transport failure (fatal)
    #[error("Codec error: {0}")]
    Codec(#[from] LinesCodecError),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Peer did not send a nickname in time
    #[error("Handshake timed out")]
    HandshakeTimeout,

    /// Peer closed the socket
    #[error("Peer closed the connection")]
    PeerClosed,

    /// Nickname refused during handshake
    #[error("Handshake rejected: {0}")]
    HandshakeRejected(String),

    /// Configuration file could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but holds an unusable value
    #[error("Invalid configuration: {0} must be greater than zero")]
    ConfigValue(&'static str),
}

impl AppError {
    /// Expected ways for a connection to end before it ever became active
    pub fn is_routine(&self) -> bool {
        matches!(
            self,
            AppError::HandshakeRejected(_) | AppError::HandshakeTimeout | AppError::PeerClosed
        )
    }
}

/// Message send errors
///
/// Occurs when a message cannot be queued for one recipient.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The recipient is not draining its queue
    #[error("Outbound queue full")]
    QueueFull,
}

/// Registry mutation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Nickname already in use: {0}")]
    DuplicateNickname(String),

    #[error("Connection {0} is not registered")]
    NotRegistered(ClientId),
}

/// Nickname validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NicknameError {
    #[error("Nickname cannot be empty.")]
    Empty,

    #[error("Nickname cannot contain whitespace.")]
    ContainsWhitespace,

    #[error("Nickname cannot contain control characters.")]
    ControlCharacter,

    #[error("Nickname cannot be longer than {0} characters.")]
    TooLong(usize),
}

/// Command errors
///
/// Reported to the issuing client as a text reply; the `Display` text is
/// the reply itself. All but `LineTooLong` leave the connection open. An
/// over-long line is a framing error, so the handler closes the connection
/// right after this reply is queued.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid command. Type '/help' for a list of commands.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("User not found.")]
    UserNotFound(String),

    #[error("{0}")]
    Nickname(#[from] NicknameError),

    #[error("Nickname already in use.")]
    NicknameTaken(String),

    #[error("Message too long (max {0} bytes).")]
    LineTooLong(usize),
}
