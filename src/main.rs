//! tx-meter - drive transactions through an EVM-compatible chain
//!
//! Deploys a counter contract from a pre-funded master account, funds a set of
//! fresh accounts and measures how many `add()` calls the chain absorbs.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use tx_meter::chain::{EthersPeer, RemotePeer};
use tx_meter::config::Settings;
use tx_meter::meter::Meter;
use tx_meter::metrics::MetricsServer;
use tx_meter::Account;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting tx-meter v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration for chain {} at {}",
        settings.chain.chain_id, settings.chain.rpc_url
    );

    let peer: Arc<dyn RemotePeer> = Arc::new(EthersPeer::connect(
        &settings.chain.rpc_url,
        settings.chain.poll_interval(),
    )?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let key = settings.wallet.private_key()?;
    let master = Account::master(peer.clone(), &key, &settings.chain, &settings.gas)
        .await
        .context("Failed to load master account")?
        .with_shutdown(shutdown_rx.clone());
    let balance = master.balance(None).await?;
    info!(
        "Master account {:?} at nonce {} with balance {}",
        master.address(),
        master.next_nonce().await,
        balance
    );

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Cancel confirmation waits on shutdown
    let signal_handle = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Shutdown signal received, cancelling pending waits");
        let _ = shutdown_tx.send(true);
    });

    let meter = Meter::new(peer, master, &settings, shutdown_rx);
    let result = meter.run().await;

    signal_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    let report = result.context("Meter run failed")?;
    info!(
        "Contract {:?}: {:.2} tx/s over {:?}",
        report.contract,
        report.tps(),
        report.elapsed
    );

    info!("tx-meter stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tx_meter=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
