// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! esbd: the orchestrator daemon.
//!
//! Startup order matters: Adopt & Sync reconciles with the runtime before
//! the RPC listener accepts work, so the gateway never sees a half-empty
//! view of the world.

use esb_core::{FunctionTable, SystemClock};
use esb_driver::DockerDriver;
use esb_orchestrator::{reaper, rpc, Config, Orchestrator, TcpProber};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ESB_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let functions = FunctionTable::load(&config.routing_table)?;
    tracing::info!(
        functions = functions.len(),
        table = %config.routing_table.display(),
        "routing table loaded"
    );

    let driver =
        DockerDriver::connect(config.docker_endpoint.as_deref(), config.published_host_ip.clone())?;

    let listen_addr = config.listen_addr;
    let orch = Arc::new(Orchestrator::new(driver, TcpProber, SystemClock, config, functions));

    // Recover before serving: running survivors come back, corpses go away.
    let report = orch.adopt_sync().await?;
    tracing::info!(adopted = report.adopted, removed = report.removed, "startup recovery done");

    let cancel = CancellationToken::new();
    let reaper_task = tokio::spawn(reaper::run_reaper(orch.clone(), cancel.clone()));

    let app = rpc::router(orch);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(addr = %listen_addr, "orchestrator listening");

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    let _ = reaper_task.await;
    tracing::info!("orchestrator stopped");
    Ok(())
}
