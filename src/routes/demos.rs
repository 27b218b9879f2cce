//! Demo provisioning route
//!
//! POST /api/demos/create-demo forwards the request body to the serverless
//! demo-agent upstream through the retry controller. The caller sees one of
//! four outcomes:
//! - 200 with the upstream JSON passed through verbatim
//! - 503 when the upstream is still cold after the retry budget
//! - 502 when the upstream is unreachable or answered with an error
//! - 429 when an identical request is already in the dedupe window

use hyper::{Request, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::proxy::ProxyResult;
use crate::routes::helpers::{error_response, full_body, json_response, read_body_bytes, BoxBody};
use crate::server::AppState;

/// Header that lets clients name their own dedupe key
const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// POST /api/demos/create-demo
pub async fn handle_create_demo(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let proxy = match &state.demo_proxy {
        Some(p) => p.clone(),
        None => {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &serde_json::json!({
                    "success": false,
                    "error": "Demo service is not configured",
                }),
            )
        }
    };

    let idempotency_key = req
        .headers()
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let bytes = match read_body_bytes(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let payload: Value = match serde_json::from_slice(&bytes) {
        Ok(v) => v,
        Err(e) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                &serde_json::json!({
                    "success": false,
                    "error": format!("Invalid JSON body: {}", e),
                }),
            )
        }
    };

    // Reject duplicate submissions before they consume upstream retries
    let dedupe_key =
        crate::proxy::RequestCache::key_for(&bytes, idempotency_key.as_deref());
    if !state.request_cache.check_and_insert(&dedupe_key) {
        warn!("Rejected duplicate demo request");
        return json_response(
            StatusCode::TOO_MANY_REQUESTS,
            &serde_json::json!({
                "success": false,
                "error": "An identical request is already being processed, please wait",
            }),
        );
    }

    let started = Instant::now();
    let (result, attempts) = proxy.forward_counted(&payload).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let (outcome, response) = match result {
        ProxyResult::Success { json } => {
            info!(attempts, duration_ms, "Demo request succeeded");
            let body = serde_json::to_string(&json).unwrap_or_else(|_| "{}".to_string());
            let response = Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "application/json")
                .header("Access-Control-Allow-Origin", "*")
                .body(full_body(body))
                .unwrap();
            ("success", response)
        }
        ProxyResult::UpstreamStarting => {
            info!(attempts, duration_ms, "Demo upstream still starting");
            let response = json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &serde_json::json!({
                    "success": false,
                    "error": "The demo service is starting up, please try again in a moment",
                }),
            );
            ("upstream_starting", response)
        }
        ProxyResult::UpstreamUnavailable => {
            warn!(attempts, duration_ms, "Demo upstream unreachable");
            let response = json_response(
                StatusCode::BAD_GATEWAY,
                &serde_json::json!({
                    "success": false,
                    "error": "The demo service is currently unreachable",
                }),
            );
            ("upstream_unavailable", response)
        }
        ProxyResult::UpstreamError { status, body } => {
            // Raw upstream error stays server-side; clients get a generic message
            warn!(
                attempts,
                duration_ms,
                upstream_status = status,
                upstream_body = %body,
                "Demo upstream returned an error"
            );
            let response = json_response(
                StatusCode::BAD_GATEWAY,
                &serde_json::json!({
                    "success": false,
                    "error": "The demo service returned an error",
                }),
            );
            ("upstream_error", response)
        }
    };

    // A failed forward releases the dedupe key so the client can retry
    // right away instead of waiting out the TTL on a 429
    if outcome != "success" {
        state.request_cache.release(&dedupe_key);
    }

    state
        .usage
        .log_demo_proxied(outcome, attempts, duration_ms)
        .await;

    response
}
