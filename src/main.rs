//! TCP Chat Server - Entry Point
//!
//! Loads configuration, then runs the listener and ChatServer actor.

use std::env;

use tracing_subscriber::EnvFilter;

use tcp_chat::{run, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=tcp_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tcp_chat=info")),
        )
        .init();

    // Config file from CHAT_SERVER_CONFIG, bind address from command line
    let mut config = ServerConfig::from_env()?;
    if let Some(addr) = env::args().nth(1) {
        config = config.with_bind_addr(addr);
    }

    run(config).await?;
    Ok(())
}
