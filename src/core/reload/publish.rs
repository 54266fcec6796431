// src/core/reload/publish.rs

//! Publication/hot-swap (§4.5): paused mode parks every worker before swapping
//! tree roots and the live config pointer; no-pause mode swaps the live config
//! pointer without parking workers, then runs a post-swap barrier so no worker
//! can still be holding a pointer into the old generation.
//!
//! The live `Config` is held behind a single `arc_swap::ArcSwap`, so the paused
//! and no-pause publication paths both replace it with one atomic pointer store —
//! this already gives the "never a mixture, single atomic owner" invariant §9
//! asks for without needing a separate atomic per scalar field.
//!
//! Neither path touches `state.workers` directly: the actual pause/resume/
//! barrier round trip runs on the main side of the `commpair`, reached only by
//! sending a notification and waiting for its ack (§4.6).

use crate::config::Config;
use crate::core::errors::ControlError;
use crate::core::notify::{Notification, NotifyChannel};
use crate::core::state::ServerState;
use crate::core::state::resolver::{ForwardsTree, HintsTree, ResolverState, ViewsTree};
use std::sync::Arc;

type OldTrees = (ViewsTree, ForwardsTree, HintsTree);

async fn expect_ack(chan: &mut NotifyChannel) -> Result<(), ControlError> {
    match chan.recv().await? {
        Notification::ReloadAck => Ok(()),
        other => Err(ControlError::IpcFailed(format!(
            "expected reload_ack, got {other:?}"
        ))),
    }
}

pub async fn publish_paused(
    state: &ServerState,
    new_resolver: ResolverState,
    new_config: &Config,
    chan: &mut NotifyChannel,
) -> Result<OldTrees, ControlError> {
    chan.send(Notification::ReloadStop).await?;
    expect_ack(chan).await?;
    let old = state.resolver.swap_roots(new_resolver);
    state.config.store(Arc::new(new_config.clone()));
    // Sending reload_start is what releases the main side to resume workers
    // (§4.6); it only happens once the swap above is fully visible.
    chan.send(Notification::ReloadStart).await?;
    Ok(old)
}

pub async fn publish_no_pause(
    state: &ServerState,
    new_resolver: ResolverState,
    new_config: &Config,
    chan: &mut NotifyChannel,
) -> Result<OldTrees, ControlError> {
    state.config.store(Arc::new(new_config.clone()));
    let old = state.resolver.swap_roots(new_resolver);
    // Every worker observing this barrier guarantees it holds no stale pointer
    // into the trees we're about to drop (§4.5's post-swap memory barrier).
    chan.send(Notification::ReloadNopausePoll).await?;
    expect_ack(chan).await?;
    Ok(old)
}
