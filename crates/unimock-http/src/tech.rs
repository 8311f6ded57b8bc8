//! Technical endpoints: health and metrics
//!
//! Everything under `/_uni/` that is not the scenario API. Counters are
//! process-local atomics; there is no external metrics registry.

use crate::AppState;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::Json;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Mock-traffic counters
#[derive(Debug, Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    requests_get: AtomicU64,
    requests_post: AtomicU64,
    requests_put: AtomicU64,
    requests_delete: AtomicU64,
    requests_other: AtomicU64,
    scenario_hits: AtomicU64,
}

impl Metrics {
    /// Fresh, zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one inbound mock request.
    pub fn record_request(&self, method: &Method) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        let counter = match *method {
            Method::GET => &self.requests_get,
            Method::POST => &self.requests_post,
            Method::PUT => &self.requests_put,
            Method::DELETE => &self.requests_delete,
            _ => &self.requests_other,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one request answered by a scenario.
    pub fn record_scenario_hit(&self) {
        self.scenario_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    fn scenario_hits(&self) -> u64 {
        self.scenario_hits.load(Ordering::Relaxed)
    }
}

/// Health check payload
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests
    pub status: String,
    /// ISO 8601 timestamp
    pub timestamp: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Crate version
    pub version: String,
}

/// `GET /_uni/health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /_uni/metrics`
pub async fn metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    let m = &state.metrics;
    Json(serde_json::json!({
        "requests_total": m.requests_total(),
        "requests_by_method": {
            "GET": m.requests_get.load(Ordering::Relaxed),
            "POST": m.requests_post.load(Ordering::Relaxed),
            "PUT": m.requests_put.load(Ordering::Relaxed),
            "DELETE": m.requests_delete.load(Ordering::Relaxed),
            "other": m.requests_other.load(Ordering::Relaxed),
        },
        "scenario_hits": m.scenario_hits(),
        "scenarios_installed": state.scenarios.len().await,
        "resources_stored": state.store.resource_count().await,
    }))
}

/// Unknown `/_uni/…` paths are technical territory, never mock traffic.
pub async fn unknown() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counters() {
        let metrics = Metrics::new();
        metrics.record_request(&Method::GET);
        metrics.record_request(&Method::GET);
        metrics.record_request(&Method::POST);
        metrics.record_scenario_hit();

        assert_eq!(metrics.requests_total(), 3);
        assert_eq!(metrics.requests_get.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.requests_post.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.scenario_hits(), 1);
    }
}
