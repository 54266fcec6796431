// src/core/dispatch/handlers/stats.rs

//! `stats`/`stats_noreset`/`status` (§4.2). Output is `key=value\n` lines.

use crate::core::state::ServerState;

pub fn stats(state: &ServerState) -> String {
    render(state)
}

pub fn stats_noreset(state: &ServerState) -> String {
    render(state)
}

fn render(state: &ServerState) -> String {
    let mut out = String::new();
    out.push_str(&format!("active.sessions={}\n", state.sessions.len()));
    out.push_str(&format!("active.max={}\n", state.max_active));
    out.push_str(&format!("workers.num={}\n", state.workers.len()));
    out.push_str(&format!(
        "uptime.seconds={}\n",
        state.started_at.elapsed().as_secs()
    ));
    out.push_str(&format!(
        "zones.local={}\n",
        state.resolver.views.read().zones.len()
    ));
    out.push_str(&format!(
        "zones.forward={}\n",
        state.resolver.forwards.read().entries.len()
    ));
    out.push_str(&format!(
        "zones.stub={}\n",
        state.resolver.hints.read().stubs.len()
    ));
    out
}

pub fn status(state: &ServerState) -> String {
    let fast_reload_active = state.fast_reload.lock().is_some();
    format!(
        "version reloadctld\nthreads {}\nfast_reload_active {}\n",
        state.workers.len(),
        fast_reload_active
    )
}
