// src/server/spawner.rs

//! Spawns the service's long-running background tasks.

use super::context::ServerContext;
use super::metrics_server;
use tracing::info;

/// Spawns all background tasks into the context's JoinSet.
pub fn spawn_all(ctx: &mut ServerContext) {
    let metrics_config = ctx.state.config.metrics.clone();

    // --- Metrics Server ---
    if metrics_config.enabled {
        let host = ctx.state.config.host.clone();
        let shutdown_rx_metrics = ctx.shutdown_tx.subscribe();
        ctx.background_tasks.spawn(async move {
            metrics_server::run_metrics_server(&host, metrics_config.port, shutdown_rx_metrics)
                .await
        });
    } else {
        info!("Prometheus metrics server is disabled in the configuration.");
    }
}
