// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for connection resource management.

use crate::core::state::ServerState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// An RAII guard to ensure a session is always unlinked from the busy list when
/// a connection handler's scope is exited (§4.1's teardown rule) — unless the
/// session was absorbed into a `PrintQ`, in which case cleanup is skipped.
pub struct ConnectionGuard {
    state: Arc<ServerState>,
    session_id: u64,
    addr: SocketAddr,
    is_handed_off: bool,
}

impl ConnectionGuard {
    /// Links the session onto the busy list (`state.sessions`).
    pub fn new(state: Arc<ServerState>, session_id: u64, addr: SocketAddr) -> Self {
        state.sessions.insert(session_id, addr);
        Self {
            state,
            session_id,
            addr,
            is_handed_off: false,
        }
    }

    /// Marks the connection as handed off to a `PrintQ`, skipping cleanup in
    /// `Drop`.
    pub fn set_handed_off(&mut self) {
        self.is_handed_off = true;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.is_handed_off {
            debug!(
                "connection guard for {} dropped after handoff to printq",
                self.addr
            );
            return;
        }
        self.state.sessions.remove(&self.session_id);
    }
}
