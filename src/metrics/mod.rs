//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Transaction submission and rejection
//! - Confirmation outcomes and latency

use crate::error::{ClientError, ClientResult};

use axum::{routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::{error, info};

lazy_static! {
    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "tx_meter_transactions_submitted_total",
        "Total transactions accepted into the peer's pending pool",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_REJECTED: CounterVec = register_counter_vec!(
        "tx_meter_transactions_rejected_total",
        "Total transactions refused by the peer",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_FINALIZED: CounterVec = register_counter_vec!(
        "tx_meter_transactions_finalized_total",
        "Total transactions confirmed with a successful receipt",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_REVERTED: CounterVec = register_counter_vec!(
        "tx_meter_transactions_reverted_total",
        "Total transactions included with a failed receipt",
        &["chain_id"]
    ).unwrap();

    pub static ref TX_LATENCY: HistogramVec = register_histogram_vec!(
        "tx_meter_confirmation_latency_seconds",
        "Time from first poll to final receipt",
        &["chain_id"],
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> ClientResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ClientError::Config(format!("Cannot bind metrics port: {}", e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| ClientError::Config(format!("Metrics server failed: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> String {
    render()
}

/// Current metrics in the Prometheus text format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

// Helper functions to record metrics

pub fn record_tx_submitted(chain_id: u64) {
    TX_SUBMITTED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tx_rejected(chain_id: u64) {
    TX_REJECTED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tx_finalized(chain_id: u64) {
    TX_FINALIZED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tx_reverted(chain_id: u64) {
    TX_REVERTED
        .with_label_values(&[&chain_id.to_string()])
        .inc();
}

pub fn record_tx_latency(chain_id: u64, latency_secs: f64) {
    TX_LATENCY
        .with_label_values(&[&chain_id.to_string()])
        .observe(latency_secs);
}
