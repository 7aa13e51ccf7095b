//! Interactive chat client
//!
//! Prints every server line verbatim and forwards stdin lines to the
//! server. Tracks its own nickname locally, updating it only once the
//! server confirms a `/nick` change.

use std::env;
use std::io::Write;

use futures_util::{SinkExt, StreamExt};
use tokio::io::Stdin;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, FramedRead, LinesCodec};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tcp_chat::config::DEFAULT_ADDR;
use tcp_chat::{ClientMessage, Command, Nickname, RENAMED_PREFIX};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let stream = match TcpStream::connect(&addr).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Error connecting to the server: {}", e);
            std::process::exit(1);
        }
    };
    debug!("Connected to {}", addr);

    let mut input = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    let Some(mut nickname) = prompt_nickname(&mut input).await? else {
        return Ok(());
    };

    let mut server = Framed::new(stream, LinesCodec::new());
    server.send(nickname.to_string()).await?;

    // Requested via /nick, applied once the server confirms
    let mut pending_nick: Option<Nickname> = None;

    loop {
        tokio::select! {
            line = server.next() => match line {
                Some(Ok(line)) => {
                    if pending_nick.as_ref().is_some_and(|n| confirms_rename(&line, n)) {
                        if let Some(new) = pending_nick.take() {
                            nickname = new;
                            debug!("Nickname is now {}", nickname);
                        }
                    }
                    println!("{}", line);
                }
                Some(Err(e)) => {
                    eprintln!("Error receiving message from the server: {}", e);
                    break;
                }
                None => {
                    println!("Disconnected from the server.");
                    break;
                }
            },
            line = input.next() => match line {
                Some(Ok(line)) => {
                    match ClientMessage::parse(&line) {
                        None => continue,
                        Some(ClientMessage::Command(Command::Nick { nickname: new })) => {
                            pending_nick = Some(new);
                        }
                        Some(_) => {}
                    }
                    if let Err(e) = server.send(line).await {
                        eprintln!("Error sending message to the server: {}", e);
                        break;
                    }
                }
                Some(Err(e)) => {
                    eprintln!("Error reading input: {}", e);
                    break;
                }
                // stdin closed; stop sending but keep the session tidy
                None => break,
            },
        }
    }

    Ok(())
}

/// Ask for a nickname until the local rules accept one
///
/// Returns `None` if stdin closes first.
async fn prompt_nickname(
    input: &mut FramedRead<Stdin, LinesCodec>,
) -> Result<Option<Nickname>, Box<dyn std::error::Error>> {
    loop {
        print!("Choose a nickname: ");
        std::io::stdout().flush()?;

        let Some(line) = input.next().await else {
            return Ok(None);
        };
        match Nickname::parse(&line?) {
            Ok(nickname) => return Ok(Some(nickname)),
            Err(e) => println!("{} Please try again.", e),
        }
    }
}

fn confirms_rename(line: &str, nickname: &Nickname) -> bool {
    line.strip_prefix(RENAMED_PREFIX)
        .and_then(|rest| rest.strip_suffix('.'))
        == Some(nickname.as_str())
}
