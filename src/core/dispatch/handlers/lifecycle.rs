// src/core/dispatch/handlers/lifecycle.rs

//! `stop`/`reload`/`reload_keep_cache`/`fast_reload`/`verbosity` (§4.2, §4.4).

use std::sync::Arc;

use crate::core::errors::ControlError;
use crate::core::printq::PrintQ;
use crate::core::reload::{self, FastReloadOptions};
use crate::core::state::ServerState;

/// Sets a new `tracing_subscriber::EnvFilter` directive, grounding the control
/// protocol's `verbosity` command in the ambient logging stack.
pub fn verbosity(state: &ServerState, args: &[&str]) -> Result<String, ControlError> {
    let [level] = args else {
        return Err(ControlError::SyntaxError);
    };
    let directive = numeric_level_to_directive(level)?;
    state
        .log_reload_handle
        .reload(directive)
        .map_err(|e| ControlError::Internal(e.to_string()))?;
    Ok("ok\n".to_string())
}

fn numeric_level_to_directive(level: &str) -> Result<tracing_subscriber::EnvFilter, ControlError> {
    let n: i32 = level.parse().map_err(|_| ControlError::SyntaxError)?;
    let directive = match n {
        n if n <= 0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    Ok(tracing_subscriber::EnvFilter::new(directive))
}

/// Starts the fast-reload background task and returns the handle the caller
/// (the control session's dispatcher) should hand the printer off to.
pub fn fast_reload(
    state: &Arc<ServerState>,
    opt_token: Option<&str>,
    printq: Arc<PrintQ>,
) -> Result<Arc<reload::FastReloadHandle>, ControlError> {
    let opts = FastReloadOptions::parse(opt_token)?;
    let config_path = state.config_path.clone();
    let handle = Arc::new(reload::thread::spawn(
        state.clone(),
        config_path,
        opts,
        printq,
    )?);
    *state.fast_reload.lock() = Some(handle.clone());
    Ok(handle)
}
