//! Usage logging for analytics
//!
//! Logs usage events in JSONL format. Disabled unless a log path is
//! configured; event logging never fails the request that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Usage event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Demo request forwarded upstream
    DemoProxied,
    /// Download token issued
    TokenIssued,
    /// Download token redeemed
    TokenRedeemed,
    /// Authentication attempt
    AuthAttempt,
    /// Lead captured from the contact form
    LeadCaptured,
}

/// Usage event for analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Event timestamp
    pub timestamp: DateTime<Utc>,
    /// Event type
    pub event_type: EventType,
    /// Gateway node that handled the request
    pub node_id: String,
    /// User identifier (if authenticated)
    pub user_id: Option<String>,
    /// Workflow slug (for store events)
    pub workflow_id: Option<String>,
    /// Final proxy outcome (for demo events)
    pub outcome: Option<String>,
    /// Upstream attempts consumed (for demo events)
    pub attempts: Option<u32>,
    /// Duration in milliseconds
    pub duration_ms: Option<u64>,
    /// Additional metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl UsageEvent {
    /// Create a new usage event
    pub fn new(event_type: EventType, node_id: String) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            node_id,
            user_id: None,
            workflow_id: None,
            outcome: None,
            attempts: None,
            duration_ms: None,
            metadata: None,
        }
    }

    /// Set the user ID
    pub fn with_user(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the workflow slug
    pub fn with_workflow(mut self, workflow_id: String) -> Self {
        self.workflow_id = Some(workflow_id);
        self
    }

    /// Set the proxy outcome label
    pub fn with_outcome(mut self, outcome: String) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Set the duration
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Convert to JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Usage logger that writes events to a JSONL file
#[derive(Clone)]
pub struct UsageLogger {
    inner: Arc<Mutex<UsageLoggerInner>>,
    node_id: String,
}

struct UsageLoggerInner {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl UsageLogger {
    /// Create a new usage logger
    pub fn new(node_id: String) -> Self {
        Self {
            inner: Arc::new(Mutex::new(UsageLoggerInner {
                writer: None,
                path: None,
            })),
            node_id,
        }
    }

    /// Initialize file logging to the specified path
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let writer = BufWriter::new(file);

        let mut inner = self.inner.lock().await;
        inner.writer = Some(writer);
        inner.path = Some(path.clone());

        info!("Usage logging initialized to {}", path.display());
        Ok(())
    }

    /// Log a usage event
    pub async fn log(&self, event: UsageEvent) {
        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize usage event: {}", e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;

        if let Some(ref mut writer) = inner.writer {
            if let Err(e) = writeln!(writer, "{}", jsonl) {
                error!("Failed to write usage event: {}", e);
            }
            if let Err(e) = writer.flush() {
                error!("Failed to flush usage log: {}", e);
            }
        }
    }

    /// Log a forwarded demo request with its final outcome
    pub async fn log_demo_proxied(&self, outcome: &str, attempts: u32, duration_ms: u64) {
        let mut event = UsageEvent::new(EventType::DemoProxied, self.node_id.clone())
            .with_outcome(outcome.to_string())
            .with_duration(duration_ms);
        event.attempts = Some(attempts);

        self.log(event).await;
    }

    /// Log a download token issuance
    pub async fn log_token_issued(&self, user_id: &str, workflow_id: &str) {
        let event = UsageEvent::new(EventType::TokenIssued, self.node_id.clone())
            .with_user(user_id.to_string())
            .with_workflow(workflow_id.to_string());

        self.log(event).await;
    }

    /// Log a download token redemption
    pub async fn log_token_redeemed(&self, user_id: &str, workflow_id: &str) {
        let event = UsageEvent::new(EventType::TokenRedeemed, self.node_id.clone())
            .with_user(user_id.to_string())
            .with_workflow(workflow_id.to_string());

        self.log(event).await;
    }

    /// Log an authentication attempt
    pub async fn log_auth_attempt(&self, success: bool, identifier: Option<&str>) {
        let mut event = UsageEvent::new(EventType::AuthAttempt, self.node_id.clone());

        if let Some(id) = identifier {
            event = event.with_user(id.to_string());
        }
        event.metadata = Some(serde_json::json!({ "success": success }));

        self.log(event).await;
    }

    /// Log a captured lead
    pub async fn log_lead_captured(&self, source: Option<&str>) {
        let mut event = UsageEvent::new(EventType::LeadCaptured, self.node_id.clone());
        event.metadata = source.map(|s| serde_json::json!({ "source": s }));

        self.log(event).await;
    }

    /// Get the node ID
    pub fn node_id(&self) -> &str {
        &self.node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = UsageEvent::new(EventType::TokenIssued, "node-1".to_string())
            .with_user("user-123".to_string())
            .with_workflow("restaurant-bot".to_string());

        let jsonl = event.to_jsonl().unwrap();
        assert!(jsonl.contains("token_issued"));
        assert!(jsonl.contains("user-123"));
        assert!(jsonl.contains("restaurant-bot"));
    }

    #[test]
    fn test_demo_event_carries_outcome_and_attempts() {
        let mut event = UsageEvent::new(EventType::DemoProxied, "node-1".to_string())
            .with_outcome("upstream_starting".to_string())
            .with_duration(4500);
        event.attempts = Some(4);

        let jsonl = event.to_jsonl().unwrap();
        assert!(jsonl.contains("demo_proxied"));
        assert!(jsonl.contains("upstream_starting"));
        assert!(jsonl.contains("\"attempts\":4"));
    }

    #[tokio::test]
    async fn test_logger_without_file_is_a_noop() {
        let logger = UsageLogger::new("node-1".to_string());
        // No file configured; must not panic or error
        logger.log_lead_captured(Some("homepage")).await;
    }
}
