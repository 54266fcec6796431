// src/connection/session.rs

//! Defines the state associated with a single control session (§3 `Session`).

use crate::core::printq::PrintQ;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::AsyncWrite;

/// Where a session sits in the magic/line handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Magic not yet read.
    None,
    /// Mid-TLS-handshake, waiting for readability (modeled for parity with the
    /// source's state machine; the TLS handshake itself is driven by the acceptor
    /// before a `Session` is even constructed in this implementation).
    Read,
    /// Mid-TLS-handshake, waiting for writability.
    Write,
}

/// One control connection. Invariant (§3): a `Session` is either on the server's
/// busy list with an active comm point, or has been moved into a `PrintQ` —
/// never both. `moved` records which.
pub struct Session {
    pub id: u64,
    pub addr: SocketAddr,
    pub handshake: HandshakeState,
    moved: bool,
}

impl Session {
    pub fn new(id: u64, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            handshake: HandshakeState::None,
            moved: false,
        }
    }

    pub fn is_moved(&self) -> bool {
        self.moved
    }

    /// Absorbs `stream` into a fresh `PrintQ`, consuming this session (§9's
    /// tagged transfer: the connection task's framed stream becomes the printer's
    /// stream and the task returns without tearing down the comm point).
    pub fn into_printq(mut self, stream: Pin<Box<dyn AsyncWrite + Send>>) -> Arc<PrintQ> {
        self.moved = true;
        PrintQ::new(stream)
    }
}
