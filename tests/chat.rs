//! End-to-end tests over real TCP sockets.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_util::codec::{Framed, LinesCodec};

use tcp_chat::{serve, AppError, ServerConfig, GOODBYE, HELP_TEXT, NICKNAME_REJECTED};

const WAIT: Duration = Duration::from_secs(5);

async fn start_server(config: ServerConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, config));
    addr
}

async fn start_default() -> SocketAddr {
    start_server(ServerConfig::default()).await
}

struct TestClient {
    framed: Framed<TcpStream, LinesCodec>,
}

impl TestClient {
    async fn raw(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            framed: Framed::new(stream, LinesCodec::new()),
        }
    }

    /// Connect and complete the handshake
    async fn join(addr: SocketAddr, nickname: &str) -> Self {
        let mut client = Self::raw(addr).await;
        client.send(nickname).await;
        let welcome = client.next_line().await;
        assert_eq!(
            welcome,
            format!(
                "Welcome to the chat, {}! Type /help for a list of commands.",
                nickname
            )
        );
        client
    }

    async fn send(&mut self, line: &str) {
        self.framed.send(line).await.unwrap();
    }

    async fn write_raw(&mut self, bytes: &[u8]) {
        let stream = self.framed.get_mut();
        stream.write_all(bytes).await.unwrap();
        stream.flush().await.unwrap();
    }

    async fn next_line(&mut self) -> String {
        timeout(WAIT, self.framed.next())
            .await
            .expect("timed out waiting for a line")
            .expect("connection closed")
            .expect("codec error")
    }

    /// Next line with its "HH:MM:SS - " prefix checked and removed
    async fn next_chat(&mut self) -> String {
        let line = self.next_line().await;
        let (stamp, rest) = line.split_at(8);
        assert!(
            stamp
                .chars()
                .enumerate()
                .all(|(i, c)| if i == 2 || i == 5 { c == ':' } else { c.is_ascii_digit() }),
            "bad timestamp in {:?}",
            line
        );
        rest.strip_prefix(" - ").unwrap().to_string()
    }

    async fn expect_closed(&mut self) {
        let next = timeout(WAIT, self.framed.next())
            .await
            .expect("connection was not closed");
        assert!(
            matches!(next, None | Some(Err(_))),
            "expected close, got {:?}",
            next
        );
    }

    async fn list(&mut self) -> String {
        self.send("/list").await;
        self.next_line().await
    }
}

/// alice, bob and carol connected, join notices consumed
async fn three_clients(addr: SocketAddr) -> (TestClient, TestClient, TestClient) {
    let mut alice = TestClient::join(addr, "alice").await;
    let mut bob = TestClient::join(addr, "bob").await;
    assert_eq!(alice.next_line().await, "bob joined the chat");
    let carol = TestClient::join(addr, "carol").await;
    assert_eq!(alice.next_line().await, "carol joined the chat");
    assert_eq!(bob.next_line().await, "carol joined the chat");
    (alice, bob, carol)
}

#[tokio::test]
async fn test_duplicate_nickname_rejected() {
    let addr = start_default().await;
    let mut alice = TestClient::join(addr, "alice").await;

    let mut impostor = TestClient::raw(addr).await;
    impostor.send("alice").await;
    assert_eq!(impostor.next_line().await, NICKNAME_REJECTED);
    impostor.expect_closed().await;

    assert_eq!(alice.list().await, "Online users: alice");
}

#[tokio::test]
async fn test_empty_nickname_rejected() {
    let addr = start_default().await;

    let mut client = TestClient::raw(addr).await;
    client.send("   ").await;
    assert_eq!(client.next_line().await, NICKNAME_REJECTED);
    client.expect_closed().await;
}

#[tokio::test]
async fn test_nickname_with_spaces_rejected() {
    let addr = start_default().await;

    let mut client = TestClient::raw(addr).await;
    client.send("john doe").await;
    assert_eq!(
        client.next_line().await,
        "Nickname cannot contain whitespace."
    );
    client.expect_closed().await;
}

#[tokio::test]
async fn test_nickname_trimmed() {
    let addr = start_default().await;
    let mut client = TestClient::raw(addr).await;
    client.send("  dora  ").await;
    assert_eq!(
        client.next_line().await,
        "Welcome to the chat, dora! Type /help for a list of commands."
    );
    assert_eq!(client.list().await, "Online users: dora");
}

#[tokio::test]
async fn test_public_chat_not_echoed() {
    let addr = start_default().await;
    let (mut alice, mut bob, mut carol) = three_clients(addr).await;

    alice.send("hi all").await;

    assert_eq!(bob.next_chat().await, "alice: hi all");
    assert_eq!(carol.next_chat().await, "alice: hi all");
    // alice's next line is her own /list reply, not an echo
    assert_eq!(alice.list().await, "Online users: alice, bob, carol");
}

#[tokio::test]
async fn test_private_message_only_to_recipient() {
    let addr = start_default().await;
    let (mut alice, mut bob, mut carol) = three_clients(addr).await;

    alice.send("/msg bob hello").await;
    assert_eq!(bob.next_chat().await, "(Private) alice: hello");

    // carol's next line is the later public message, so she never saw the private one
    alice.send("ping").await;
    assert_eq!(carol.next_chat().await, "alice: ping");
    assert_eq!(bob.next_chat().await, "alice: ping");
}

#[tokio::test]
async fn test_private_message_errors() {
    let addr = start_default().await;
    let (mut alice, _bob, _carol) = three_clients(addr).await;

    alice.send("/msg dave hello").await;
    assert_eq!(alice.next_line().await, "User not found.");

    alice.send("/msg bob").await;
    assert_eq!(alice.next_line().await, "Usage: /msg <user> <message>");
}

#[tokio::test]
async fn test_help_and_invalid_command() {
    let addr = start_default().await;
    let mut alice = TestClient::join(addr, "alice").await;

    alice.send("/help").await;
    assert_eq!(alice.next_line().await, HELP_TEXT);

    alice.send("/shout hey").await;
    assert_eq!(
        alice.next_line().await,
        "Invalid command. Type '/help' for a list of commands."
    );
}

#[tokio::test]
async fn test_quit_closes_and_announces() {
    let addr = start_default().await;
    let (mut alice, mut bob, mut carol) = three_clients(addr).await;

    alice.send("/quit").await;
    assert_eq!(alice.next_line().await, GOODBYE);
    alice.expect_closed().await;

    assert_eq!(bob.next_line().await, "alice left the chat");
    assert_eq!(carol.next_line().await, "alice left the chat");
    assert_eq!(bob.list().await, "Online users: bob, carol");
}

#[tokio::test]
async fn test_peer_disconnect_announced_once() {
    let addr = start_default().await;
    let (alice, mut bob, _carol) = three_clients(addr).await;

    drop(alice);

    assert_eq!(bob.next_line().await, "alice left the chat");
    assert_eq!(bob.list().await, "Online users: bob, carol");
}

#[tokio::test]
async fn test_nickname_change() {
    let addr = start_default().await;
    let (mut alice, mut bob, _carol) = three_clients(addr).await;

    alice.send("/nick carol").await;
    assert_eq!(alice.next_line().await, "Nickname already in use.");

    alice.send("/nick alicia").await;
    assert_eq!(alice.next_line().await, "You are now known as alicia.");

    alice.send("hello").await;
    assert_eq!(bob.next_chat().await, "alicia: hello");
    assert_eq!(bob.list().await, "Online users: alicia, bob, carol");

    // Old name is free again
    let mut newcomer = TestClient::join(addr, "alice").await;
    assert_eq!(newcomer.list().await, "Online users: alicia, bob, carol, alice");
}

#[tokio::test]
async fn test_lines_split_and_coalesced() {
    let addr = start_default().await;
    let (mut alice, mut bob, _carol) = three_clients(addr).await;

    // Two messages in one write
    alice.write_raw(b"first\nsecond\n").await;
    assert_eq!(bob.next_chat().await, "alice: first");
    assert_eq!(bob.next_chat().await, "alice: second");

    // One message across two writes
    alice.write_raw(b"hel").await;
    sleep(Duration::from_millis(50)).await;
    alice.write_raw(b"lo world\r\n").await;
    assert_eq!(bob.next_chat().await, "alice: hello world");
}

#[tokio::test]
async fn test_nickname_and_first_message_in_one_write() {
    let addr = start_default().await;
    let mut alice = TestClient::join(addr, "alice").await;

    let mut dave = TestClient::raw(addr).await;
    dave.write_raw(b"dave\nhi there\n").await;

    assert_eq!(alice.next_line().await, "dave joined the chat");
    assert_eq!(alice.next_chat().await, "dave: hi there");
}

#[tokio::test]
async fn test_blank_lines_ignored() {
    let addr = start_default().await;
    let (mut alice, mut bob, _carol) = three_clients(addr).await;

    alice.write_raw(b"\n   \nreal\n").await;
    assert_eq!(bob.next_chat().await, "alice: real");
}

#[tokio::test]
async fn test_line_too_long_closes_connection() {
    let config = ServerConfig {
        max_line_length: 64,
        ..ServerConfig::default()
    };
    let addr = start_server(config).await;
    let mut alice = TestClient::join(addr, "alice").await;
    let mut bob = TestClient::join(addr, "bob").await;
    assert_eq!(alice.next_line().await, "bob joined the chat");

    bob.send(&"x".repeat(100)).await;
    assert_eq!(bob.next_line().await, "Message too long (max 64 bytes).");
    bob.expect_closed().await;

    assert_eq!(alice.next_line().await, "bob left the chat");
}

#[tokio::test]
async fn test_invalid_utf8_closes_only_that_connection() {
    let addr = start_default().await;
    let mut alice = TestClient::join(addr, "alice").await;
    let mut bob = TestClient::join(addr, "bob").await;
    assert_eq!(alice.next_line().await, "bob joined the chat");

    bob.write_raw(b"\xff\xfe\n").await;
    bob.expect_closed().await;

    assert_eq!(alice.next_line().await, "bob left the chat");
    assert_eq!(alice.list().await, "Online users: alice");

    let mut carol = TestClient::join(addr, "carol").await;
    assert_eq!(alice.next_line().await, "carol joined the chat");
    alice.send("still here").await;
    assert_eq!(carol.next_chat().await, "alice: still here");
}

#[tokio::test]
async fn test_overlong_nickname_line_rejected() {
    let config = ServerConfig {
        max_line_length: 64,
        ..ServerConfig::default()
    };
    let addr = start_server(config).await;

    let mut client = TestClient::raw(addr).await;
    client.send(&"n".repeat(100)).await;
    assert_eq!(
        client.next_line().await,
        "Nickname cannot be longer than 32 characters."
    );
    client.expect_closed().await;

    // Never registered
    let mut alice = TestClient::join(addr, "alice").await;
    assert_eq!(alice.list().await, "Online users: alice");
}

#[tokio::test]
async fn test_serve_rejects_zero_buffers() {
    for config in [
        ServerConfig {
            command_buffer: 0,
            ..ServerConfig::default()
        },
        ServerConfig {
            client_buffer: 0,
            ..ServerConfig::default()
        },
        ServerConfig {
            max_line_length: 0,
            ..ServerConfig::default()
        },
    ] {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let result = timeout(WAIT, serve(listener, config))
            .await
            .expect("serve should fail immediately");
        assert!(matches!(result, Err(AppError::ConfigValue(_))));
    }
}

#[tokio::test]
async fn test_handshake_timeout() {
    let config = ServerConfig {
        handshake_timeout_secs: 1,
        ..ServerConfig::default()
    };
    let addr = start_server(config).await;

    let mut silent = TestClient::raw(addr).await;
    silent.expect_closed().await;

    // Server still accepts new clients afterwards
    let mut alice = TestClient::join(addr, "alice").await;
    assert_eq!(alice.list().await, "Online users: alice");
}

#[tokio::test]
async fn test_concurrent_handshakes_same_nickname() {
    let addr = start_default().await;

    let mut tasks = Vec::new();
    for _ in 0..16 {
        tasks.push(tokio::spawn(async move {
            let mut client = TestClient::raw(addr).await;
            client.send("alice").await;
            let first = client.next_line().await;
            (first != NICKNAME_REJECTED, client)
        }));
    }

    let mut winners = Vec::new();
    for task in tasks {
        let (admitted, client) = task.await.unwrap();
        if admitted {
            winners.push(client);
        }
    }
    assert_eq!(winners.len(), 1);

    let mut observer = TestClient::join(addr, "observer").await;
    assert_eq!(observer.list().await, "Online users: alice, observer");
}
