//! ChatServer Actor implementation
//!
//! The central actor that owns the connection registry and executes the
//! command protocol. Every registry mutation and every broadcast snapshot
//! happens inside this one task, one command at a time.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::broadcast::broadcast;
use crate::command::{Command, HELP_TEXT};
use crate::connection::Connection;
use crate::error::{CommandError, RegistryError};
use crate::message::{ClientMessage, ServerMessage};
use crate::registry::Registry;
use crate::types::{ClientId, Nickname};

/// Farewell queued before a `/quit` closes the connection
pub const GOODBYE: &str = "Goodbye!";

/// Start of the reply confirming a `/nick` change
pub const RENAMED_PREFIX: &str = "You are now known as ";

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Handshake finished; try to register under the proposed nickname
    Join {
        connection: Connection,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
    /// One classified line from a registered connection
    Message {
        client_id: ClientId,
        msg: ClientMessage,
    },
    /// Connection closed (peer hangup, transport error, or handler exit)
    Disconnect {
        client_id: ClientId,
    },
}

/// The main ChatServer actor
///
/// Owns the registry outright; nothing else can observe or mutate it.
pub struct ChatServer {
    /// All registered connections
    registry: Registry,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            registry: Registry::new(),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Join { connection, reply } => {
                self.handle_join(connection, reply);
            }
            ServerCommand::Message { client_id, msg } => {
                self.handle_message(client_id, msg);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
        }
    }

    /// Handle handshake completion
    ///
    /// The uniqueness check and the insert are one registry call inside one
    /// actor step, so two racing handshakes can never both win a name.
    fn handle_join(
        &mut self,
        connection: Connection,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    ) {
        let client_id = connection.id;
        let nickname = connection.nickname.clone();
        let peer_addr = connection.peer_addr;

        if let Err(e) = self.registry.add(connection) {
            warn!("Rejected handshake from {:?}: {}", peer_addr, e);
            let _ = reply.send(Err(e));
            return;
        }

        if reply.send(Ok(())).is_err() {
            // Handler went away mid-handshake; nobody will drain this queue
            debug!("Handler for {} vanished before join completed", client_id);
            self.registry.remove(client_id);
            return;
        }

        info!(
            "Client {} joined as '{}' from {:?}",
            client_id, nickname, peer_addr
        );

        self.reply(
            client_id,
            ServerMessage::reply(format!(
                "Welcome to the chat, {}! Type /help for a list of commands.",
                nickname
            )),
        );
        broadcast(&self.registry, &ServerMessage::joined(&nickname), Some(client_id));
    }

    /// Handle one inbound line
    fn handle_message(&mut self, client_id: ClientId, msg: ClientMessage) {
        let Some(sender) = self.registry.get(client_id) else {
            // Lines still in flight after /quit or disconnect
            debug!("Dropping message from unregistered client {}", client_id);
            return;
        };
        let nickname = sender.nickname.clone();

        match msg {
            ClientMessage::Chat { body } => {
                debug!("Chat from '{}': {}", nickname, body);
                broadcast(
                    &self.registry,
                    &ServerMessage::chat(nickname, body),
                    Some(client_id),
                );
            }
            ClientMessage::Command(cmd) => {
                if let Err(e) = self.execute(client_id, nickname, cmd) {
                    self.reply(client_id, e.into());
                }
            }
            ClientMessage::Malformed(e) => {
                debug!("Malformed command from '{}': {:?}", nickname, e);
                self.reply(client_id, e.into());
            }
        }
    }

    /// Execute a parsed command on behalf of `client_id`
    ///
    /// Output goes to the issuer, except `/msg` (recipient only) and the
    /// departure notice from `/quit` (everyone else).
    fn execute(
        &mut self,
        client_id: ClientId,
        nickname: Nickname,
        cmd: Command,
    ) -> Result<(), CommandError> {
        match cmd {
            Command::Help => {
                self.reply(client_id, ServerMessage::reply(HELP_TEXT));
            }
            Command::List => {
                let names = self
                    .registry
                    .nicknames()
                    .iter()
                    .map(Nickname::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                self.reply(client_id, ServerMessage::reply(format!("Online users: {}", names)));
            }
            Command::Quit => {
                info!("Client '{}' quit", nickname);
                self.reply(client_id, ServerMessage::reply(GOODBYE));
                self.handle_disconnect(client_id);
            }
            Command::Msg { recipient, body } => {
                let Some(target) = self.registry.lookup_by_nickname(&recipient) else {
                    return Err(CommandError::UserNotFound(recipient));
                };

                debug!("Private message '{}' -> '{}'", nickname, target.nickname);
                if let Err(e) = target.send(ServerMessage::private(nickname, body)) {
                    warn!("Private message to '{}' failed: {}", target.nickname, e);
                }
            }
            Command::Nick { nickname: new } => match self.registry.rename(client_id, new.clone()) {
                Ok(previous) => {
                    info!("Client {} renamed '{}' -> '{}'", client_id, previous, new);
                    self.reply(
                        client_id,
                        ServerMessage::reply(format!("{}{}.", RENAMED_PREFIX, new)),
                    );
                }
                Err(RegistryError::DuplicateNickname(name)) => {
                    return Err(CommandError::NicknameTaken(name));
                }
                Err(e @ RegistryError::NotRegistered(_)) => {
                    debug!("Rename skipped: {}", e);
                }
            },
        }
        Ok(())
    }

    /// Handle connection close
    ///
    /// Safe to call any number of times; only the first call for a given
    /// connection announces the departure.
    fn handle_disconnect(&mut self, client_id: ClientId) {
        let Some(nickname) = self.registry.remove(client_id) else {
            debug!("Client {} already unregistered", client_id);
            return;
        };

        info!("Client '{}' ({}) left", nickname, client_id);
        broadcast(&self.registry, &ServerMessage::left(&nickname), None);

        debug!("Total clients: {}", self.registry.len());
    }

    /// Helper: queue a direct reply for one connection
    fn reply(&self, client_id: ClientId, msg: ServerMessage) {
        let Some(conn) = self.registry.get(client_id) else {
            return;
        };
        if let Err(e) = conn.send(msg) {
            warn!("Reply to '{}' failed: {}", conn.nickname, e);
        }
    }
}
