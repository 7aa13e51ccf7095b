//! Line-oriented TCP Chat Server Library
//!
//! A multi-user chat server over plain TCP: every client picks a unique
//! nickname, then exchanges newline-delimited text and slash commands.
//!
//! # Features
//! - Nickname handshake with atomic uniqueness check
//! - Public chat relayed to everyone but the sender
//! - Private messages (`/msg`)
//! - Nickname changes (`/nick`)
//! - User listing (`/list`), help (`/help`), clean exit (`/quit`)
//! - Join/leave notices
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor and the sole owner of the `Registry`
//! - Each connection has a `handler` task plus read/write tasks
//! - No locks needed - all registry access goes through message passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tcp_chat::{serve, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:12345").await.unwrap();
//!     serve(listener, ServerConfig::default()).await.unwrap();
//! }
//! ```

pub mod broadcast;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod listener;
pub mod message;
pub mod registry;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use broadcast::broadcast;
pub use command::{Command, HELP_TEXT};
pub use config::ServerConfig;
pub use connection::Connection;
pub use error::{AppError, CommandError, NicknameError, RegistryError, SendError};
pub use handler::{handle_connection, NICKNAME_REJECTED};
pub use listener::{run, serve};
pub use message::{ClientMessage, Delivery, ServerMessage};
pub use registry::Registry;
pub use server::{ChatServer, ServerCommand, GOODBYE, RENAMED_PREFIX};
pub use types::{ClientId, Nickname};
