// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! esb-gateway: the public entry point of the platform.

use esb_gateway::auth::Authenticator;
use esb_gateway::dispatch::DispatchSettings;
use esb_gateway::heartbeat;
use esb_gateway::server::{self, GatewayApp};
use esb_gateway::{Config, Dispatcher, HttpControlPlane, HttpInvoker, RouteMatcher};
use esb_core::{FunctionTable, SystemClock};
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

    let control_plane = HttpControlPlane::new(config.orchestrator_url.clone());
    let dispatcher = Arc::new(Dispatcher::new(
        control_plane,
        HttpInvoker::new(),
        SystemClock,
        DispatchSettings::from(&config),
    ));

    let auth =
        Authenticator::new(config.api_key.clone(), &config.jwt_secret, config.users.clone());

    let app = Arc::new(GatewayApp {
        auth,
        matcher: RouteMatcher::from_table(&functions),
        functions,
        dispatcher: dispatcher.clone(),
    });

    let cancel = CancellationToken::new();
    let janitor = tokio::spawn(heartbeat::run_heartbeat(
        dispatcher,
        config.heartbeat_interval,
        cancel.clone(),
    ));

    let router = server::router(app);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "gateway listening");

    let shutdown = cancel.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    let _ = janitor.await;
    tracing::info!("gateway stopped");
    Ok(())
}
