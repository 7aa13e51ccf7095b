//! Connection struct definition
//!
//! Represents one registered chat participant: its identity, nickname,
//! and the queue that feeds its socket writer.

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::{ClientId, Nickname};

/// Registered connection
///
/// Cloning yields another handle to the same outbound queue. The socket
/// writer stops once every handle has been dropped, so removing the
/// connection from the registry is what closes it.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Current nickname
    pub nickname: Nickname,
    /// Remote socket address
    pub peer_addr: Option<SocketAddr>,
    /// Server → Client message queue
    sender: mpsc::Sender<ServerMessage>,
}

impl Connection {
    /// Create a new connection with the given ID, nickname and sender channel
    pub fn new(id: ClientId, nickname: Nickname, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            nickname,
            peer_addr: None,
            sender,
        }
    }

    /// Attach the remote address, used for logging only
    pub fn with_peer_addr(mut self, peer_addr: Option<SocketAddr>) -> Self {
        self.peer_addr = peer_addr;
        self
    }

    /// Queue a message for this connection
    ///
    /// Never waits: a closed channel (writer gone) or a full queue (peer
    /// not reading) is reported as an error for the caller to log.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::QueueFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Whether the socket writer is still draining this queue
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Rebind the nickname
    pub fn set_nickname(&mut self, nickname: Nickname) {
        self.nickname = nickname;
    }
}
