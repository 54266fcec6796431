// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests.

use reloadctl::config::Config;
use reloadctl::connection::{ConnectionGuard, ConnectionHandler};
use reloadctl::core::state::ServerState;
use reloadctl::server::AnyStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, reload};

/// A complete control-subsystem environment backed by a real `ServerState`.
/// Tests drive it over genuine TCP sockets, one listener per `connect()` call,
/// rather than against the full `server::run` daemon loop.
pub struct TestContext {
    pub state: Arc<ServerState>,
    next_session_id: AtomicU64,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(Config {
            max_active: 10,
            ..Config::default()
        })
        .await
    }

    pub async fn with_config(config: Config) -> Self {
        Self::with_config_and_path(config, "config.toml".to_string()).await
    }

    /// Like `with_config`, but with an explicit `config_path` — needed by any
    /// test that triggers `fast_reload`, since it re-reads that path from disk.
    pub async fn with_config_and_path(config: Config, config_path: String) -> Self {
        let env_filter = EnvFilter::new("warn");
        let (filter, reload_handle) = reload::Layer::new(env_filter);
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
        let reload_handle = Arc::new(reload_handle);

        let state = ServerState::new(config, config_path, reload_handle);
        Self {
            state,
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Binds a one-off TCP listener, accepts exactly one connection into a
    /// `ConnectionHandler` run against this context's `ServerState`, and returns
    /// the client-side stream plus a handle to the handler task.
    pub async fn connect(&self) -> (TcpStream, JoinHandle<()>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = self.state.clone();
        let session_id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        let shutdown_rx = state.shutdown_tx.subscribe();

        let server_task = tokio::spawn(async move {
            let (socket, peer_addr) = listener.accept().await.unwrap();
            let mut guard = ConnectionGuard::new(state.clone(), session_id, peer_addr);
            let any_stream = AnyStream::Tcp(socket);
            let mut handler =
                ConnectionHandler::new(any_stream, peer_addr, state, session_id, shutdown_rx);
            let _ = handler.run(&mut guard).await;
        });

        let client = TcpStream::connect(addr).await.unwrap();
        (client, server_task)
    }

    /// Like `connect`, but skips the magic handshake before returning, so the
    /// caller can start sending command lines immediately.
    pub async fn connect_handshaked(&self) -> (TcpStream, JoinHandle<()>) {
        let (mut client, task) = self.connect().await;
        send_magic(&mut client).await;
        (client, task)
    }
}

/// Writes the `UBCT1 ` magic greeting a real client sends before any command.
pub async fn send_magic(client: &mut TcpStream) {
    client.write_all(b"UBCT1 ").await.unwrap();
}

/// Sends one command line (newline appended).
pub async fn send_line(client: &mut TcpStream, line: &str) {
    client.write_all(line.as_bytes()).await.unwrap();
    client.write_all(b"\n").await.unwrap();
}

/// Reads one newline-terminated reply line, with the newline stripped. Returns
/// `None` on EOF before any bytes were read.
pub async fn read_line(client: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match client.read(&mut byte).await {
            Ok(0) => {
                return if buf.is_empty() {
                    None
                } else {
                    Some(String::from_utf8_lossy(&buf).into_owned())
                };
            }
            Ok(_) => {
                if byte[0] == b'\n' {
                    return Some(String::from_utf8_lossy(&buf).into_owned());
                }
                buf.push(byte[0]);
            }
            Err(_) => return None,
        }
    }
}
