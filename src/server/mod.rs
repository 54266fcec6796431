// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{filter::EnvFilter, reload};

pub mod connection_loop;
pub mod context;
mod initialization;
mod spawner;
mod stream;

pub use stream::AnyStream;

/// The main server startup function, orchestrating all setup phases.
pub async fn run(
    config: Config,
    config_path: String,
    log_reload_handle: Arc<reload::Handle<EnvFilter, tracing_subscriber::Registry>>,
) -> Result<()> {
    // 1. Initialize server state, listeners, TLS, etc.
    let mut server_context = initialization::setup(config, config_path, log_reload_handle).await?;

    // 2. Spawn all background tasks.
    spawner::spawn_all(&mut server_context).await?;

    // 3. Start the main connection acceptance loop. Runs until shutdown.
    connection_loop::run(server_context).await;

    Ok(())
}
