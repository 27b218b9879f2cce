//! Configuration for Showroom
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use uuid::Uuid;

/// Showroom - HTTP gateway for demo agents and the workflow store
#[derive(Parser, Debug, Clone)]
#[command(name = "showroom")]
#[command(about = "HTTP gateway for demo agents and the workflow store")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Upstream demo-agent endpoint (serverless, may cold start)
    #[arg(long, env = "DEMO_AGENT_API_URL")]
    pub demo_agent_api_url: Option<String>,

    /// Fallback upstream endpoint, used when DEMO_AGENT_API_URL is unset
    #[arg(long, env = "DEMO_API_URL")]
    pub demo_api_url: Option<String>,

    /// Maximum attempts per forwarded demo request (including the first)
    #[arg(long, env = "DEMO_PROXY_MAX_ATTEMPTS", default_value = "4")]
    pub demo_proxy_max_attempts: u32,

    /// Fixed delay between retryable attempts in milliseconds
    #[arg(long, env = "DEMO_PROXY_RETRY_DELAY_MS", default_value = "1500")]
    pub demo_proxy_retry_delay_ms: u64,

    /// Per-attempt upstream timeout in milliseconds
    #[arg(long, env = "DEMO_PROXY_TIMEOUT_MS", default_value = "15000")]
    pub demo_proxy_timeout_ms: u64,

    /// Substring that marks a cold-starting upstream (matched case-insensitively
    /// against 404 bodies)
    #[arg(
        long,
        env = "DEMO_COLD_START_SENTINEL",
        default_value = "web endpoint is stopped"
    )]
    pub demo_cold_start_sentinel: String,

    /// TTL for the demo request de-duplication cache in seconds
    #[arg(long, env = "DEMO_DEDUPE_TTL_SECS", default_value = "30")]
    pub demo_dedupe_ttl_secs: u64,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "showroom")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Download token lifetime in seconds
    #[arg(long, env = "DOWNLOAD_TOKEN_TTL_SECS", default_value = "300")]
    pub download_token_ttl_secs: u64,

    /// Enable development mode (MongoDB optional, in-memory token store,
    /// insecure default JWT secret)
    #[arg(
        long,
        env = "DEV_MODE",
        default_value = "false",
        action = clap::ArgAction::Set
    )]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Path to the JSONL usage log (disabled when unset)
    #[arg(long, env = "USAGE_LOG_PATH")]
    pub usage_log_path: Option<String>,
}

impl Args {
    /// Effective upstream URL (primary, then fallback)
    pub fn upstream_url(&self) -> Option<&str> {
        self.demo_agent_api_url
            .as_deref()
            .or(self.demo_api_url.as_deref())
    }

    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> String {
        if self.dev_mode {
            self.jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
        } else {
            self.jwt_secret
                .clone()
                .expect("JWT_SECRET is required in production mode")
        }
    }

    /// Download token TTL as a Duration
    pub fn download_token_ttl(&self) -> Duration {
        Duration::from_secs(self.download_token_ttl_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.jwt_secret.is_none() {
                return Err("JWT_SECRET is required in production mode".to_string());
            }
            if self.upstream_url().is_none() {
                return Err(
                    "DEMO_AGENT_API_URL (or DEMO_API_URL) is required in production mode"
                        .to_string(),
                );
            }
        }

        if self.demo_proxy_max_attempts == 0 {
            return Err("DEMO_PROXY_MAX_ATTEMPTS must be at least 1".to_string());
        }
        if self.demo_proxy_retry_delay_ms == 0 {
            return Err("DEMO_PROXY_RETRY_DELAY_MS must be greater than 0".to_string());
        }
        if self.demo_proxy_timeout_ms == 0 {
            return Err("DEMO_PROXY_TIMEOUT_MS must be greater than 0".to_string());
        }
        if self.demo_dedupe_ttl_secs == 0 {
            return Err("DEMO_DEDUPE_TTL_SECS must be greater than 0".to_string());
        }
        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than 0".to_string());
        }
        if self.download_token_ttl_secs == 0 {
            return Err("DOWNLOAD_TOKEN_TTL_SECS must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from([
            "showroom",
            "--dev-mode",
            "true",
            "--demo-agent-api-url",
            "https://demos.example.com/run",
        ])
    }

    #[test]
    fn test_defaults() {
        let args = base_args();
        assert_eq!(args.demo_proxy_max_attempts, 4);
        assert_eq!(args.demo_proxy_retry_delay_ms, 1500);
        assert_eq!(args.demo_proxy_timeout_ms, 15000);
        assert_eq!(args.download_token_ttl_secs, 300);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_upstream_url_precedence() {
        let mut args = base_args();
        args.demo_api_url = Some("https://fallback.example.com".to_string());
        assert_eq!(args.upstream_url(), Some("https://demos.example.com/run"));

        args.demo_agent_api_url = None;
        assert_eq!(args.upstream_url(), Some("https://fallback.example.com"));
    }

    #[test]
    fn test_production_requires_secret_and_upstream() {
        let mut args = base_args();
        args.dev_mode = false;
        assert!(args.validate().is_err());

        args.jwt_secret = Some("secret".to_string());
        assert!(args.validate().is_ok());

        args.demo_agent_api_url = None;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut args = base_args();
        args.demo_proxy_max_attempts = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_zero_durations_rejected() {
        let mut args = base_args();
        args.demo_proxy_retry_delay_ms = 0;
        assert!(args.validate().is_err());

        let mut args = base_args();
        args.demo_dedupe_ttl_secs = 0;
        assert!(args.validate().is_err());

        let mut args = base_args();
        args.jwt_expiry_seconds = 0;
        assert!(args.validate().is_err());

        let mut args = base_args();
        args.download_token_ttl_secs = 0;
        assert!(args.validate().is_err());
    }
}
