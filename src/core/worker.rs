// src/core/worker.rs

//! Models "other workers" as a fixed-size pool of peer-worker handles, each with an
//! `mpsc` sender standing in for the inter-worker command tube (§5). Distributed
//! commands and pause/resume/barrier notices are sent to every peer through this
//! channel; the inter-worker command tube's byte-oriented framing is out of scope
//! (§1) and is not reproduced — only the fan-out contract is modeled.

use crate::config::Config;
use crate::core::state::resolver::ResolverState;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// A message sent to a peer worker over its command tube.
#[derive(Debug)]
pub enum WorkerMessage {
    /// A distributed control command line to re-apply locally (§4.2, §4.3).
    Command(String),
    /// Pause this worker's query processing; ack once parked (paused-mode swap, §4.5).
    PauseForReload(oneshot::Sender<()>),
    /// Resume query processing, optionally dropping the in-flight mesh.
    Resume { drop_mesh: bool },
    /// A no-op broadcast that, once observed, guarantees this worker holds no old
    /// config pointers (no-pause mode's post-swap memory barrier, §4.5).
    NoPauseBarrier(oneshot::Sender<()>),
}

/// A handle to one peer worker's command tube. Each peer worker also owns its own
/// copy of the resolver trees, so that a distributed command visibly lands on every
/// worker independently (§4.2/§4.3's eventually-consistent fanout).
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    pub id: usize,
    sender: mpsc::Sender<WorkerMessage>,
    pub resolver: Arc<ResolverState>,
}

impl WorkerHandle {
    /// Spawns the stand-in worker task and returns a handle to it.
    pub fn spawn(id: usize, initial_config: &Config) -> Self {
        let resolver = Arc::new(ResolverState::from_config(initial_config));
        let (sender, rx) = mpsc::channel(64);
        tokio::spawn(run_worker(id, rx, resolver.clone()));
        Self { id, sender, resolver }
    }

    pub async fn send(&self, msg: WorkerMessage) -> Result<(), mpsc::error::SendError<WorkerMessage>> {
        self.sender.send(msg).await
    }
}

/// The peer worker's event loop: applies distributed commands to its own resolver
/// trees and acks pause/barrier requests. Real query processing and the byte-level
/// inter-worker tube framing are named external collaborators and are out of scope
/// (§1); only the fan-out/pause contract is modeled here.
async fn run_worker(id: usize, mut rx: mpsc::Receiver<WorkerMessage>, resolver: Arc<ResolverState>) {
    while let Some(msg) = rx.recv().await {
        match msg {
            WorkerMessage::Command(line) => {
                if let Err(e) = crate::core::dispatch::apply_to_resolver(&resolver, &line) {
                    tracing::warn!(worker_id = id, error = %e, "peer worker failed to apply distributed command");
                }
            }
            WorkerMessage::PauseForReload(ack) => {
                let _ = ack.send(());
            }
            WorkerMessage::Resume { .. } => {}
            WorkerMessage::NoPauseBarrier(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

/// The fixed-size pool of peer workers the primary worker coordinates with.
#[derive(Debug, Default)]
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
}

impl WorkerPool {
    pub fn new(workers: Vec<WorkerHandle>) -> Self {
        Self { workers }
    }

    /// Spawns `count` stand-in peer workers, each seeded from `initial_config`.
    pub fn spawn_pool(count: usize, initial_config: &Config) -> Self {
        let workers = (0..count)
            .map(|id| WorkerHandle::spawn(id, initial_config))
            .collect();
        Self { workers }
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkerHandle> {
        self.workers.iter()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Replays a distributed command line to every peer worker, per §4.2/§4.3.
    /// Logs and continues on individual delivery failures rather than aborting.
    pub async fn distribute_command(&self, line: &str) {
        for worker in &self.workers {
            if worker.send(WorkerMessage::Command(line.to_string())).await.is_err() {
                tracing::warn!(worker_id = worker.id, "failed to distribute command to peer worker");
            }
        }
    }

    /// Pauses every peer worker and waits for each to ack, for paused-mode swap.
    pub async fn pause_all(&self) {
        let mut acks = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let (tx, rx) = oneshot::channel();
            if worker.send(WorkerMessage::PauseForReload(tx)).await.is_ok() {
                acks.push(rx);
            }
        }
        for rx in acks {
            let _ = rx.await;
        }
    }

    /// Resumes every peer worker after a paused-mode swap.
    pub async fn resume_all(&self, drop_mesh: bool) {
        for worker in &self.workers {
            let _ = worker.send(WorkerMessage::Resume { drop_mesh }).await;
        }
    }

    /// Broadcasts the no-pause memory barrier and waits for every peer to observe it.
    pub async fn barrier_all(&self) {
        let mut acks = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let (tx, rx) = oneshot::channel();
            if worker.send(WorkerMessage::NoPauseBarrier(tx)).await.is_ok() {
                acks.push(rx);
            }
        }
        for rx in acks {
            let _ = rx.await;
        }
    }
}
