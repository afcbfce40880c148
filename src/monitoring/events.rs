use std::time::Duration;

use alloy::primitives::Address;
use metrics::{counter, histogram};
use tracing::{info, warn};

use super::metrics::prometheus_enabled;
use crate::fleet::FleetStatsSnapshot;

pub fn fleet_prepared(mode: &'static str, wallets: usize, skipped: usize) {
    info!(
        target: "monitoring::fleet",
        event = "prepared",
        mode,
        wallets,
        skipped,
        "fleet prepared"
    );

    if prometheus_enabled() {
        counter!("celoship_fleet_prepared_total", "mode" => mode).increment(1);
        histogram!("celoship_fleet_size", "mode" => mode).record(wallets as f64);
    }
}

pub fn funding_result(index: usize, address: &Address, success: bool, elapsed: Duration) {
    let latency_ms = elapsed.as_secs_f64() * 1_000.0;
    if success {
        info!(
            target: "monitoring::fleet",
            event = "funding",
            status = "success",
            index,
            address = %address,
            latency_ms,
            "wallet funded"
        );
    } else {
        warn!(
            target: "monitoring::fleet",
            event = "funding",
            status = "failed",
            index,
            address = %address,
            latency_ms,
            "wallet funding failed"
        );
    }

    if prometheus_enabled() {
        let result = if success { "success" } else { "failed" };
        counter!("celoship_funding_total", "result" => result).increment(1);
        histogram!("celoship_funding_latency_ms", "result" => result).record(latency_ms);
    }
}

pub fn nonce_fetch_failed(index: usize, address: &Address) {
    warn!(
        target: "monitoring::fleet",
        event = "nonce_fetch",
        status = "failed",
        index,
        address = %address,
        "nonce fetch failed, wallet abandoned"
    );

    if prometheus_enabled() {
        counter!("celoship_nonce_fetch_failures_total").increment(1);
    }
}

pub fn swarm_tx_result(index: usize, nonce: u64, success: bool, elapsed: Duration) {
    let latency_ms = elapsed.as_secs_f64() * 1_000.0;
    if success {
        info!(
            target: "monitoring::swarm",
            event = "tx",
            status = "confirmed",
            index,
            nonce,
            latency_ms,
            "swarm transaction confirmed"
        );
    } else {
        warn!(
            target: "monitoring::swarm",
            event = "tx",
            status = "failed",
            index,
            nonce,
            latency_ms,
            "swarm transaction failed"
        );
    }

    if prometheus_enabled() {
        let result = if success { "confirmed" } else { "failed" };
        counter!("celoship_swarm_tx_total", "result" => result).increment(1);
        histogram!("celoship_swarm_tx_latency_ms", "result" => result).record(latency_ms);
    }
}

pub fn swarm_finished(stats: &FleetStatsSnapshot, wallets: usize, abandoned: usize, elapsed: Duration) {
    info!(
        target: "monitoring::swarm",
        event = "finished",
        wallets,
        abandoned,
        total_tx = stats.total_tx,
        successful_tx = stats.successful_tx,
        failed_tx = stats.failed_tx,
        elapsed_ms = elapsed.as_millis() as u64,
        "swarm finished"
    );

    if prometheus_enabled() {
        histogram!("celoship_swarm_duration_ms").record(elapsed.as_secs_f64() * 1_000.0);
    }
}
