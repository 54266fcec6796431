// src/server/spawner.rs

//! Spawns all of the server's long-running background tasks.

use super::context::ServerContext;
use anyhow::Result;
use std::time::Duration;
use tracing::info;

/// Spawns all background tasks into the context's `JoinSet`.
pub async fn spawn_all(ctx: &mut ServerContext) -> Result<()> {
    let state = ctx.state.clone();
    let mut shutdown_rx = state.shutdown_tx.subscribe();

    // Services the daemon-wide orphaned-printer list (§4.7): a fast-reload whose
    // originating session closed, but which still has queued output, keeps
    // draining here until its queue empties.
    ctx.background_tasks.spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    state.orphan_printqs.service().await;
                }
                _ = shutdown_rx.recv() => break,
            }
        }
        Ok(())
    });

    info!("background tasks spawned");
    Ok(())
}
