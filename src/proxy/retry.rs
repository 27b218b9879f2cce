//! Retry controller for the demo proxy
//!
//! Runs strictly sequential attempts against the upstream, sleeping a fixed
//! delay between retryable outcomes. Only cold starts and transport failures
//! consume the retry budget; definitive answers return immediately.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Args;
use crate::proxy::classify::{classify, Classification};
use crate::proxy::upstream::Upstream;

/// Retry knobs, sourced from configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Attempt budget, including the first call
    pub max_attempts: u32,
    /// Fixed delay between retryable attempts
    pub retry_delay: Duration,
    /// Cold-start sentinel substring (matched case-insensitively)
    pub cold_start_sentinel: String,
}

impl ProxyConfig {
    /// Build from parsed CLI/env args
    pub fn from_args(args: &Args) -> Self {
        Self {
            max_attempts: args.demo_proxy_max_attempts,
            retry_delay: Duration::from_millis(args.demo_proxy_retry_delay_ms),
            cold_start_sentinel: args.demo_cold_start_sentinel.clone(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            retry_delay: Duration::from_millis(1500),
            cold_start_sentinel: "web endpoint is stopped".to_string(),
        }
    }
}

/// Final outcome of one forwarded demo request
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyResult {
    /// Upstream answered with usable JSON
    Success { json: Value },
    /// Every attempt hit the cold-start sentinel; upstream is still waking up
    UpstreamStarting,
    /// Every attempt failed at the transport layer
    UpstreamUnavailable,
    /// Upstream answered definitively with an error; not retried
    UpstreamError { status: u16, body: String },
}

/// Forwards demo requests with cold-start-aware retries
pub struct DemoProxy {
    upstream: Arc<dyn Upstream>,
    config: ProxyConfig,
}

impl DemoProxy {
    /// Create a proxy over the given upstream
    pub fn new(upstream: Arc<dyn Upstream>, config: ProxyConfig) -> Self {
        Self { upstream, config }
    }

    /// Forward one payload, retrying cold starts and transport failures up to
    /// the configured budget. Attempt k+1 never starts before attempt k's
    /// result (and its sleep) is known.
    pub async fn forward(&self, payload: &Value) -> ProxyResult {
        self.forward_counted(payload).await.0
    }

    /// Like [`forward`](Self::forward), but also reports how many upstream
    /// attempts the request consumed.
    pub async fn forward_counted(&self, payload: &Value) -> (ProxyResult, u32) {
        let max = self.config.max_attempts;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.upstream.call(payload).await {
                Ok(response) => {
                    match classify(
                        response.status,
                        &response.body_text,
                        &self.config.cold_start_sentinel,
                    ) {
                        Classification::Success(json) => {
                            debug!(attempt, "Upstream call succeeded");
                            return (ProxyResult::Success { json }, attempt);
                        }
                        Classification::DefinitiveError => {
                            warn!(
                                attempt,
                                status = response.status,
                                "Upstream returned a definitive error"
                            );
                            return (
                                ProxyResult::UpstreamError {
                                    status: response.status,
                                    body: response.body_text,
                                },
                                attempt,
                            );
                        }
                        Classification::ColdStart => {
                            if attempt >= max {
                                warn!(attempt, "Upstream still cold after retry budget");
                                return (ProxyResult::UpstreamStarting, attempt);
                            }
                            debug!(attempt, "Upstream cold start, retrying after delay");
                        }
                    }
                }
                Err(e) => {
                    if attempt >= max {
                        warn!(attempt, error = %e, "Upstream unreachable after retry budget");
                        return (ProxyResult::UpstreamUnavailable, attempt);
                    }
                    warn!(attempt, error = %e, "Upstream transport failure, retrying after delay");
                }
            }

            tokio::time::sleep(self.config.retry_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::upstream::{TransportError, UpstreamResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Upstream that replays a fixed script of outcomes
    struct ScriptedUpstream {
        script: Mutex<VecDeque<Result<UpstreamResponse, TransportError>>>,
        calls: AtomicU32,
    }

    impl ScriptedUpstream {
        fn new(script: Vec<Result<UpstreamResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Upstream for ScriptedUpstream {
        async fn call(&self, _payload: &Value) -> Result<UpstreamResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted upstream exhausted")
        }
    }

    fn cold_start() -> Result<UpstreamResponse, TransportError> {
        Ok(UpstreamResponse {
            status: 404,
            body_text: "the invoked web endpoint is stopped".to_string(),
        })
    }

    fn ok_json(body: &str) -> Result<UpstreamResponse, TransportError> {
        Ok(UpstreamResponse {
            status: 200,
            body_text: body.to_string(),
        })
    }

    fn timeout() -> Result<UpstreamResponse, TransportError> {
        Err(TransportError("operation timed out".to_string()))
    }

    fn config(max_attempts: u32, delay_ms: u64) -> ProxyConfig {
        ProxyConfig {
            max_attempts,
            retry_delay: Duration::from_millis(delay_ms),
            cold_start_sentinel: "web endpoint is stopped".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_cold_starts_exhaust_budget() {
        let upstream = ScriptedUpstream::new(vec![cold_start(), cold_start(), cold_start()]);
        let proxy = DemoProxy::new(upstream.clone(), config(3, 1500));

        let start = Instant::now();
        let result = proxy.forward(&json!({})).await;

        assert_eq!(result, ProxyResult::UpstreamStarting);
        assert_eq!(upstream.calls(), 3);
        // (N-1) sleeps of retry_delay each
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_definitive_error_returns_immediately() {
        let upstream = ScriptedUpstream::new(vec![Ok(UpstreamResponse {
            status: 500,
            body_text: r#"{"error":"bad request"}"#.to_string(),
        })]);
        let proxy = DemoProxy::new(upstream.clone(), config(4, 1500));

        let start = Instant::now();
        let result = proxy.forward(&json!({"demo": "clinic"})).await;

        assert_eq!(
            result,
            ProxyResult::UpstreamError {
                status: 500,
                body: r#"{"error":"bad request"}"#.to_string(),
            }
        );
        assert_eq!(upstream.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_starts_then_success() {
        let upstream = ScriptedUpstream::new(vec![
            cold_start(),
            cold_start(),
            ok_json(r#"{"success":true,"data":1}"#),
        ]);
        let proxy = DemoProxy::new(upstream.clone(), config(4, 1500));

        let start = Instant::now();
        let result = proxy.forward(&json!({})).await;

        assert_eq!(
            result,
            ProxyResult::Success {
                json: json!({"success": true, "data": 1}),
            }
        );
        assert_eq!(upstream.calls(), 3);
        // 2 sleeps for the 2 cold starts
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_timeouts_give_unavailable() {
        let upstream = ScriptedUpstream::new(vec![timeout(), timeout(), timeout(), timeout()]);
        let proxy = DemoProxy::new(upstream.clone(), config(4, 1500));

        let start = Instant::now();
        let result = proxy.forward(&json!({})).await;

        assert_eq!(result, ProxyResult::UpstreamUnavailable);
        assert_eq!(upstream.calls(), 4);
        assert_eq!(start.elapsed(), Duration::from_millis(4500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_sleeps_zero() {
        let upstream = ScriptedUpstream::new(vec![ok_json(r#"{"ok":true}"#)]);
        let proxy = DemoProxy::new(upstream.clone(), config(4, 1500));

        let start = Instant::now();
        let result = proxy.forward(&json!({})).await;

        assert!(matches!(result, ProxyResult::Success { .. }));
        assert_eq!(upstream.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_then_success() {
        let upstream = ScriptedUpstream::new(vec![timeout(), ok_json(r#"{"ok":true}"#)]);
        let proxy = DemoProxy::new(upstream.clone(), config(4, 1500));

        let result = proxy.forward(&json!({})).await;

        assert!(matches!(result, ProxyResult::Success { .. }));
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forward_counted_reports_attempts() {
        let upstream = ScriptedUpstream::new(vec![cold_start(), timeout(), ok_json(r#"{"ok":1}"#)]);
        let proxy = DemoProxy::new(upstream.clone(), config(4, 1500));

        let (result, attempts) = proxy.forward_counted(&json!({})).await;

        assert!(matches!(result, ProxyResult::Success { .. }));
        assert_eq!(attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_budget() {
        let upstream = ScriptedUpstream::new(vec![cold_start()]);
        let proxy = DemoProxy::new(upstream.clone(), config(1, 1500));

        let start = Instant::now();
        let result = proxy.forward(&json!({})).await;

        assert_eq!(result, ProxyResult::UpstreamStarting);
        assert_eq!(upstream.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
