// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gas_relay::api::router;
use gas_relay::chain::ChainClient;
use gas_relay::config::{RelayConfig, LOG_FORMAT_ENV};
use gas_relay::relay::service::load_provider;
use gas_relay::relay::SponsorshipService;
use gas_relay::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = RelayConfig::from_env();
    info!(
        network = %config.network.name,
        chain_id = config.network.chain_id,
        rpc_url = %config.network.rpc_url,
        "starting gas relay"
    );

    let client =
        ChainClient::new(config.network.clone()).expect("Failed to construct chain client");

    // Cancelled on shutdown; aborts any in-flight receipt polling.
    let shutdown = CancellationToken::new();

    let provider = load_provider(config.provider.as_ref());
    let relay = SponsorshipService::new(
        client,
        config.network.chain_id,
        provider,
        config.policy.clone(),
        shutdown.clone(),
    );

    let state = AppState::new(relay);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    info!(%addr, "gas relay listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .expect("HTTP server failed");
}

/// Wait for Ctrl-C, then cancel background work before the server drains.
async fn shutdown_signal(shutdown: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
    shutdown.cancel();
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
