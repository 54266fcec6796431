// src/core/state/server_state.rs

//! The central `ServerState`: the live config pointer, the resolver data planes,
//! the peer-worker pool, and the bookkeeping the control listener needs to
//! enforce `max_active` and track the single active fast-reload task (§3).

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, Registry, reload};

use crate::config::Config;
use crate::core::printq::OrphanPrintQs;
use crate::core::reload::FastReloadHandle;
use crate::core::state::resolver::ResolverState;
use crate::core::worker::WorkerPool;

/// The server's live, shared state. Held behind an `Arc` and cloned into every
/// connection task.
pub struct ServerState {
    /// The live config, behind a single atomic pointer so readers never observe
    /// a torn mixture of old and new values (§9).
    pub config: ArcSwap<Config>,
    pub resolver: ResolverState,
    pub workers: WorkerPool,
    /// The control channel's busy list: session id to peer address, standing in
    /// for each `Session`'s link into the daemon's linked list (§3, §4.1).
    pub sessions: DashMap<u64, SocketAddr>,
    pub max_active: usize,
    pub log_reload_handle: Arc<reload::Handle<EnvFilter, Registry>>,
    /// At most one fast-reload background task runs at a time.
    pub fast_reload: Mutex<Option<Arc<FastReloadHandle>>>,
    pub orphan_printqs: OrphanPrintQs,
    pub config_path: String,
    pub started_at: std::time::Instant,
    /// Sending on this triggers daemon-wide shutdown; connection tasks subscribe
    /// a receiver each, and the `stop` command sends on it directly (§4.2).
    pub shutdown_tx: broadcast::Sender<()>,
}

impl ServerState {
    pub fn new(
        config: Config,
        config_path: String,
        log_reload_handle: Arc<reload::Handle<EnvFilter, Registry>>,
    ) -> Arc<Self> {
        let workers = WorkerPool::spawn_pool(config.num_workers, &config);
        let max_active = config.max_active;
        let resolver = ResolverState::from_config(&config);
        let (shutdown_tx, _) = broadcast::channel(1);
        Arc::new(Self {
            config: ArcSwap::from_pointee(config),
            resolver,
            workers,
            sessions: DashMap::new(),
            max_active,
            log_reload_handle,
            fast_reload: Mutex::new(None),
            orphan_printqs: OrphanPrintQs::default(),
            config_path,
            started_at: std::time::Instant::now(),
            shutdown_tx,
        })
    }

    /// True if accepting one more connection would exceed `max_active` (§4.1).
    pub fn at_capacity(&self) -> bool {
        self.sessions.len() >= self.max_active
    }
}

/// Channels handed to the spawner, mirroring the teacher's `ServerInit` shape —
/// kept minimal since this subsystem spawns no persistence/replication tasks.
pub struct ServerInit {
    pub state: Arc<ServerState>,
}
