//! Listener / dispatcher
//!
//! Binds the TCP socket, starts the ChatServer actor, and spawns one
//! handler task per accepted connection.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::server::ChatServer;

/// Bind `config.bind_addr` and serve forever
pub async fn run(config: ServerConfig) -> Result<(), AppError> {
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Chat server listening on {}", listener.local_addr()?);
    serve(listener, config).await
}

/// Accept connections on an already-bound listener
///
/// Fails up front on an invalid config. Per-connection failures are logged
/// and never end the accept loop.
pub async fn serve(listener: TcpListener, config: ServerConfig) -> Result<(), AppError> {
    config.validate()?;
    let config = Arc::new(config);

    // Create ChatServer actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
    tokio::spawn(ChatServer::new(cmd_rx).run());
    info!("ChatServer actor started");

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();
                let config = Arc::clone(&config);

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    match handle_connection(stream, cmd_tx, config).await {
                        Ok(()) => {}
                        Err(e) if e.is_routine() => info!("Connection from {} closed: {}", addr, e),
                        Err(e) => error!("Connection handler error for {}: {}", addr, e),
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
