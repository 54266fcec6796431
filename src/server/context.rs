// src/server/context.rs

use crate::core::state::ServerState;
use std::sync::Arc;
use tokio::net::{TcpListener, UnixListener};
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;

/// Holds all the initialized state required to run the server's main loop.
pub struct ServerContext {
    pub state: Arc<ServerState>,
    pub listeners: Vec<TcpListener>,
    pub unix_listeners: Vec<UnixListener>,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
    pub acceptor: Option<TlsAcceptor>,
}
