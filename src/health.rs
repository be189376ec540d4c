//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload with the relay version,
//! uptime, which config file is active, how many providers it drives,
//! and cumulative update counters.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub config: ConfigHealth,
    pub stats: StatsResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigHealth {
    pub source: String,
    /// First 8 hex digits of the config file's SHA-256.
    pub version: String,
    pub providers: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub updates_received: u64,
    pub updates_succeeded: u64,
    pub updates_partially_failed: u64,
    pub updates_rejected: u64,
    pub updates_ignored: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = &state.stats;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        config: ConfigHealth {
            source: state.config.source_name.clone(),
            version: state.config.version.short().to_string(),
            providers: state.forwarder.provider_count(),
        },
        stats: StatsResponse {
            updates_received: stats.received.load(Ordering::Relaxed),
            updates_succeeded: stats.succeeded.load(Ordering::Relaxed),
            updates_partially_failed: stats.partial_failures.load(Ordering::Relaxed),
            updates_rejected: stats.rejected.load(Ordering::Relaxed),
            updates_ignored: stats.ignored.load(Ordering::Relaxed),
        },
    })
}
