//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - Liveness probe (is the service running?)
//! - /ready, /readyz - Readiness probe (can the service take traffic?)
//!
//! Liveness always returns 200 while the process is up. Readiness requires
//! MongoDB unless dev_mode is enabled; the store endpoints cannot work
//! without it, but the gateway can still proxy demos in dev mode.

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::routes::helpers::{json_response, BoxBody};
use crate::server::AppState;

/// Health response consumed by load balancers and the ops dashboard
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall health status (true if service is running)
    pub healthy: bool,
    /// Status for UI display: 'online' or 'degraded'
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// Current timestamp
    pub timestamp: String,
    /// Operating mode
    pub mode: String,
    /// Node identifier
    pub node_id: String,
    /// MongoDB connection status
    pub mongo: MongoHealth,
    /// Upstream demo service configuration status
    pub upstream: UpstreamHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// MongoDB connection details
#[derive(Serialize)]
pub struct MongoHealth {
    pub connected: bool,
}

/// Upstream demo service details
#[derive(Serialize)]
pub struct UpstreamHealth {
    pub configured: bool,
}

fn build_health_response(state: &AppState) -> HealthResponse {
    let args = &state.args;
    let mongo_connected = state.mongo.is_some();
    let upstream_configured = state.demo_proxy.is_some();

    let error = if !mongo_connected && !args.dev_mode {
        Some("MongoDB not connected - store endpoints unavailable".to_string())
    } else {
        None
    };

    let status = if mongo_connected || args.dev_mode {
        "online"
    } else {
        "degraded"
    };

    HealthResponse {
        healthy: true,
        status,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if args.dev_mode {
            "development".to_string()
        } else {
            "production".to_string()
        },
        node_id: args.node_id.to_string(),
        mongo: MongoHealth {
            connected: mongo_connected,
        },
        upstream: UpstreamHealth {
            configured: upstream_configured,
        },
        error,
    }
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check(state: Arc<AppState>) -> Response<BoxBody> {
    let response = build_health_response(&state);
    json_response(StatusCode::OK, &response)
}

/// Handle readiness probe (/ready, /readyz)
///
/// Returns 200 only when the service can serve traffic: MongoDB connected,
/// or dev mode where the in-memory stores stand in.
pub fn readiness_check(state: Arc<AppState>) -> Response<BoxBody> {
    let response = build_health_response(&state);
    let is_ready = state.mongo.is_some() || state.args.dev_mode;

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    json_response(status, &response)
}

/// Version information for deployment verification
#[derive(Serialize)]
pub struct VersionResponse {
    /// Cargo package version
    pub version: &'static str,
    /// Git commit hash (short)
    pub commit: &'static str,
    /// Git commit hash (full)
    pub commit_full: &'static str,
    /// Build timestamp
    pub build_time: &'static str,
    /// Service name
    pub service: &'static str,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<BoxBody> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "showroom",
    };

    json_response(StatusCode::OK, &response)
}
