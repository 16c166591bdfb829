// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;

pub mod api;
mod connection_loop;
mod context;
pub mod initialization;
mod metrics_server;
mod spawner;

pub use context::ServerContext;

/// The main server startup function, orchestrating all setup phases.
pub async fn run(config: Config) -> Result<()> {
    // 1. Restore or build the filter and bind the listener.
    let mut server_context = initialization::setup(config).await?;

    // 2. Spawn all background tasks.
    spawner::spawn_all(&mut server_context);

    // 3. Serve requests. This function will run until shutdown.
    connection_loop::run(server_context).await
}
