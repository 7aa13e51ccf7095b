//! TCP connection handler
//!
//! Handles individual client connections: nickname handshake, line
//! framing, and bidirectional communication with the ChatServer.
//!
//! Lifecycle: `Connecting → Handshaking → Active → Closing → Closed`.
//! A rejected or timed-out handshake goes straight to `Closing` without
//! ever touching the registry.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::{AppError, CommandError, NicknameError, RegistryError};
use crate::message::{ClientMessage, ServerMessage};
use crate::server::ServerCommand;
use crate::types::{ClientId, Nickname, MAX_NICKNAME_LEN};

/// Sent before closing a connection whose nickname is empty or taken
pub const NICKNAME_REJECTED: &str = "Nickname already in use or empty. Please choose another.";

/// How long the writer may keep flushing after the connection is closing
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

type LineSink = SplitSink<Framed<TcpStream, LinesCodec>, String>;
type LineStream = SplitStream<Framed<TcpStream, LinesCodec>>;

/// Handle a new TCP connection
///
/// Performs the nickname handshake, registers with the ChatServer, then
/// runs a read task (socket → server) and a write task (queue → socket)
/// until either side ends.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    config: Arc<ServerConfig>,
) -> Result<(), AppError> {
    let peer_addr = stream.peer_addr().ok();
    debug!("New TCP connection from {:?}", peer_addr);

    let framed = Framed::new(stream, LinesCodec::new_with_max_length(config.max_line_length));
    let (mut sink, mut lines) = framed.split();

    // Handshaking
    let nickname = match read_nickname(&mut lines, config.handshake_timeout()).await? {
        Ok(nickname) => nickname,
        Err(e) => return reject(&mut sink, e, peer_addr).await,
    };

    let client_id = ClientId::new();
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(config.client_buffer);
    let connection = Connection::new(client_id, nickname, msg_tx).with_peer_addr(peer_addr);

    // Register with ChatServer
    let (reply_tx, reply_rx) = oneshot::channel();
    cmd_tx
        .send(ServerCommand::Join {
            connection,
            reply: reply_tx,
        })
        .await
        .map_err(|_| AppError::ChannelSend)?;

    match reply_rx.await {
        Ok(Ok(())) => {}
        Ok(Err(RegistryError::DuplicateNickname(name))) => {
            return reject(&mut sink, HandshakeError::Taken(name), peer_addr).await;
        }
        Ok(Err(e)) => return Err(AppError::HandshakeRejected(e.to_string())),
        Err(_) => return Err(AppError::ChannelSend),
    }

    // Active: from here on, every exit path unregisters exactly once
    let guard = DisconnectGuard::new(client_id, cmd_tx.clone());
    info!("Client {} active from {:?}", client_id, peer_addr);

    let cmd_tx_read = cmd_tx.clone();
    let max_line_length = config.max_line_length;

    // Spawn read task (socket -> ServerCommand)
    let mut read_task = tokio::spawn(async move {
        while let Some(result) = lines.next().await {
            let msg = match result {
                Ok(line) => match ClientMessage::parse(&line) {
                    Some(msg) => msg,
                    None => continue,
                },
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!("Line too long from {}, closing", client_id);
                    let msg = ClientMessage::Malformed(CommandError::LineTooLong(max_line_length));
                    let _ = cmd_tx_read
                        .send(ServerCommand::Message { client_id, msg })
                        .await;
                    break;
                }
                Err(e) => {
                    warn!("Read error for {}: {}", client_id, e);
                    break;
                }
            };

            if cmd_tx_read
                .send(ServerCommand::Message { client_id, msg })
                .await
                .is_err()
            {
                debug!("Server closed, ending read task for {}", client_id);
                break;
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Spawn write task (ServerMessage -> socket)
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if let Err(e) = sink.send(msg.to_string()).await {
                debug!("Socket write failed for {}: {}", client_id, e);
                break;
            }
        }
        debug!("Write task ended for {}", client_id);

        // Half-close so the peer sees EOF after the last queued line
        let _ = sink.close().await;
    });

    // Wait for either task to complete
    let writer_done = tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", client_id);
            false
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", client_id);
            true
        }
    };

    // Closing
    drop(guard);
    read_task.abort();

    if !writer_done {
        // The writer drains whatever was queued and stops once the server
        // drops this connection's queue
        if timeout(FLUSH_TIMEOUT, &mut write_task).await.is_err() {
            debug!("Flush timed out for {}", client_id);
            write_task.abort();
        }
    }

    info!("Client {} disconnected", client_id);
    Ok(())
}

/// Why a handshake did not produce a nickname
#[derive(Debug)]
enum HandshakeError {
    Invalid(NicknameError),
    Taken(String),
}

impl HandshakeError {
    /// Line sent to the peer before closing
    fn reply(&self) -> String {
        match self {
            HandshakeError::Invalid(NicknameError::Empty) | HandshakeError::Taken(_) => {
                NICKNAME_REJECTED.to_string()
            }
            HandshakeError::Invalid(e) => e.to_string(),
        }
    }

    /// Reason recorded in the server log
    fn reason(&self) -> String {
        match self {
            HandshakeError::Invalid(e) => e.to_string(),
            HandshakeError::Taken(name) => format!("nickname '{}' already in use", name),
        }
    }
}

/// Read the first line and validate it as a nickname
///
/// The outer `Result` carries transport failures; the inner one carries a
/// refusal that still deserves a reply.
async fn read_nickname(
    lines: &mut LineStream,
    limit: Duration,
) -> Result<Result<Nickname, HandshakeError>, AppError> {
    let line = match timeout(limit, lines.next()).await {
        Err(_) => return Err(AppError::HandshakeTimeout),
        Ok(None) => return Err(AppError::PeerClosed),
        Ok(Some(Err(LinesCodecError::MaxLineLengthExceeded))) => {
            return Ok(Err(HandshakeError::Invalid(NicknameError::TooLong(
                MAX_NICKNAME_LEN,
            ))));
        }
        Ok(Some(Err(e))) => return Err(e.into()),
        Ok(Some(Ok(line))) => line,
    };

    Ok(Nickname::parse(&line).map_err(HandshakeError::Invalid))
}

/// Send the refusal line and close the socket
async fn reject(
    sink: &mut LineSink,
    err: HandshakeError,
    peer_addr: Option<SocketAddr>,
) -> Result<(), AppError> {
    let reply = err.reply();
    warn!("Handshake from {:?} rejected: {}", peer_addr, err.reason());

    sink.send(reply.clone()).await?;
    sink.close().await?;
    Err(AppError::HandshakeRejected(reply))
}

/// Unregisters a connection when dropped
///
/// Covers every way out of the active phase: peer hangup, transport
/// errors, `/quit`, or the handler future itself being dropped.
struct DisconnectGuard {
    client_id: ClientId,
    cmd_tx: mpsc::Sender<ServerCommand>,
}

impl DisconnectGuard {
    fn new(client_id: ClientId, cmd_tx: mpsc::Sender<ServerCommand>) -> Self {
        Self { client_id, cmd_tx }
    }
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let cmd = ServerCommand::Disconnect {
            client_id: self.client_id,
        };

        match self.cmd_tx.try_send(cmd) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => {
                // Server is busy; finish the hand-off in the background
                let cmd_tx = self.cmd_tx.clone();
                match Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            let _ = cmd_tx.send(cmd).await;
                        });
                    }
                    Err(_) => warn!("No runtime to unregister {}", self.client_id),
                }
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Server gone, skip unregistering {}", self.client_id);
            }
        }
    }
}
