// src/server/connection_loop.rs

//! Contains the main serving loop and the graceful shutdown sequence.

use super::api;
use super::context::ServerContext;
use anyhow::{Context, Result, anyhow};
use std::future::IntoFuture;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};

/// Serves HTTP requests until a shutdown signal arrives, the HTTP server
/// fails, or a background task exits.
pub async fn run(mut ctx: ServerContext) -> Result<()> {
    let app = api::router(ctx.state.clone());
    let mut shutdown_rx = ctx.shutdown_tx.subscribe();
    let mut server = tokio::spawn(
        axum::serve(ctx.listener, app)
            .with_graceful_shutdown(async move {
                shutdown_rx.recv().await.ok();
            })
            .into_future(),
    );

    let early_exit = tokio::select! {
        biased;

        signal_result = shutdown_signal() => {
            match signal_result {
                Ok(name) => info!("{name} received, initiating graceful shutdown."),
                Err(e) => error!("Signal handling failed: {e}. Shutting down."),
            }
            None
        }

        res = &mut server => Some(res),

        Some(res) = ctx.background_tasks.join_next() => {
            match res {
                Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                Ok(Err(e)) => error!("CRITICAL: Background task failed: {}. Shutting down.", e),
                Err(e) => error!("CRITICAL: Background task panicked: {e:?}. Shutting down."),
            }
            None
        }
    };

    info!("Shutting down. Sending signal to all tasks.");
    if ctx.shutdown_tx.send(()).is_err() {
        warn!("No task was listening for the shutdown signal.");
    }

    let server_result = match early_exit {
        Some(res) => res,
        None => server.await,
    };

    // Adds already acknowledged with a stale warning get one more chance to reach disk.
    if ctx.state.persistence.is_stale() {
        info!("Snapshot is stale. Performing final save on shutdown...");
        match ctx.state.flush_if_stale().await {
            Ok(()) => info!("Final snapshot save completed successfully."),
            Err(e) => error!("CRITICAL: Final snapshot save on shutdown failed: {}", e),
        }
    }

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    info!("Server shutdown complete.");

    server_result
        .map_err(|e| anyhow!("HTTP server task panicked: {e:?}"))?
        .context("HTTP server failed")
}

/// Resolves with the name of the first termination signal received.
async fn shutdown_signal() -> Result<&'static str> {
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;
    tokio::select! {
        _ = sigint.recv() => Ok("SIGINT"),
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}
