// src/core/dispatch/mod.rs

//! The command dispatcher: longest-unique-prefix lookup, local application, and
//! the distribution policy that replays state-mutating commands to every peer
//! worker (§4.2, §4.3).

pub mod handlers;
pub mod table;

use std::sync::Arc;

use table::DispatchFlags;

use crate::core::errors::ControlError;
use crate::core::protocol::is_bulk_terminator;
use crate::core::state::ServerState;
use crate::core::state::resolver::ResolverState;

/// What the connection handler should do after a dispatcher call.
pub enum DispatchOutcome {
    /// Write this text to the client and keep reading commands.
    Reply(String),
    /// `stop`: reply `ok\n`, then tear the daemon down.
    Stop,
    /// `fast_reload`: the caller must hand the session off to a `PrintQ` and
    /// start the background task via `handlers::lifecycle::fast_reload`.
    FastReload { opt_token: Option<String> },
}

/// Parses and routes one command line, applying the distribution policy for
/// commands flagged `DISTRIBUTE`/`ALWAYS_DISTRIBUTE` (§4.2).
pub async fn dispatch(state: &Arc<ServerState>, line: &str) -> Result<DispatchOutcome, ControlError> {
    let trimmed = line.trim();
    let mut parts = trimmed.split_whitespace();
    let cmd_token = parts.next().ok_or(ControlError::SyntaxError)?;
    let spec = table::lookup(cmd_token)?;
    let args: Vec<&str> = parts.collect();

    match spec.name {
        "stop" => return Ok(DispatchOutcome::Stop),
        "reload" | "reload_keep_cache" => return Ok(DispatchOutcome::Reply("ok\n".to_string())),
        "fast_reload" => {
            return Ok(DispatchOutcome::FastReload {
                opt_token: args.first().map(|s| s.to_string()),
            });
        }
        _ => {}
    }

    let reply = match spec.name {
        "stats" => handlers::stats::stats(state),
        "stats_noreset" => handlers::stats::stats_noreset(state),
        "status" => handlers::stats::status(state),
        "verbosity" => handlers::lifecycle::verbosity(state, &args)?,
        "lookup" => handlers::cache::lookup(&state.resolver, &args)?,
        "dump_cache" => handlers::cache::dump_cache(&state.resolver),
        "list_local_zones" => handlers::zones::list_local_zones(&state.resolver),
        "list_forwards" => handlers::forward::list_forwards(&state.resolver),
        "local_zones" | "local_zones_remove" | "local_datas" | "local_datas_remove" | "load_cache" => {
            // Bulk-input commands only emit their final "ok\n" once the caller has
            // fed every line via `dispatch_bulk_line`/`dispatch_load_cache_line`.
            String::new()
        }
        _ => apply_to_resolver(&state.resolver, trimmed)?,
    };

    if should_distribute(spec.flags, state.workers.len()) {
        state.workers.distribute_command(trimmed).await;
    }

    Ok(DispatchOutcome::Reply(reply))
}

fn should_distribute(flags: DispatchFlags, worker_count: usize) -> bool {
    if flags.contains(DispatchFlags::ALWAYS_DISTRIBUTE) {
        true
    } else if flags.contains(DispatchFlags::DISTRIBUTE) {
        worker_count > 0
    } else {
        false
    }
}

/// Applies a single already-parsed command line directly to a resolver tree set,
/// with no distribution. Used both for the primary's local application and, via
/// `WorkerPool`'s stand-in peer tasks, for replaying distributed commands (§4.3).
pub fn apply_to_resolver(resolver: &ResolverState, line: &str) -> Result<String, ControlError> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().ok_or(ControlError::SyntaxError)?;
    let args: Vec<&str> = parts.collect();
    match cmd {
        "local_zone" => handlers::zones::local_zone(resolver, &args),
        "local_zone_remove" => handlers::zones::local_zone_remove(resolver, &args),
        "local_data" => handlers::zones::local_data(resolver, &args),
        "local_data_remove" => handlers::zones::local_data_remove(resolver, &args),
        "view_local_zone" => handlers::zones::view_local_zone(resolver, &args),
        "rpz_enable" => handlers::zones::rpz_enable(resolver, &args),
        "rpz_disable" => handlers::zones::rpz_disable(resolver, &args),
        "forward" | "forward_add" => handlers::forward::forward_add(resolver, &args),
        "forward_remove" => handlers::forward::forward_remove(resolver, &args),
        "stub_add" => handlers::forward::stub_add(resolver, &args),
        "stub_remove" => handlers::forward::stub_remove(resolver, &args),
        "flush_zone" => handlers::flush::flush_zone(resolver, &args),
        "flush_name" => handlers::flush::flush_name(resolver, &args),
        "flush_type" => handlers::flush::flush_type(resolver, &args),
        "flush_infra" => handlers::flush::flush_infra(resolver, &args),
        "flush_bogus" => handlers::flush::flush_bogus(resolver, &args),
        "flush_negative" => handlers::flush::flush_negative(resolver, &args),
        "flush_stats" => handlers::flush::flush_stats(resolver, &args),
        "flush_requestlist" => handlers::flush::flush_requestlist(resolver, &args),
        "insecure_add" => handlers::flush::insecure_add(resolver, &args),
        "insecure_remove" => handlers::flush::insecure_remove(resolver, &args),
        _ => Err(ControlError::UnknownCommand(cmd.to_string())),
    }
}

/// Applies and distributes one line of a bulk-input command's body (§4.2), by
/// translating it into its singular equivalent so peer workers reuse the same
/// single-entry handlers.
pub async fn dispatch_bulk_line(
    state: &Arc<ServerState>,
    variant: &str,
    line: &str,
) -> Result<(), ControlError> {
    if is_bulk_terminator(line) {
        return Ok(());
    }
    handlers::zones::apply_bulk_line(&state.resolver, variant, line)?;
    let singular = match variant {
        "local_zones" => "local_zone",
        "local_zones_remove" => "local_zone_remove",
        "local_datas" => "local_data",
        "local_datas_remove" => "local_data_remove",
        other => return Err(ControlError::UnknownCommand(other.to_string())),
    };
    state
        .workers
        .distribute_command(&format!("{singular} {line}"))
        .await;
    Ok(())
}

/// Applies one line of a `load_cache` bulk body. Never distributed (§4.2).
pub fn dispatch_load_cache_line(state: &Arc<ServerState>, line: &str) -> Result<(), ControlError> {
    if is_bulk_terminator(line) {
        return Ok(());
    }
    handlers::cache::load_cache_line(&state.resolver, line)
}
