//! Showroom - HTTP gateway for demo agents and the workflow store

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use showroom::{
    auth::JwtValidator,
    config::Args,
    db::schemas::{DownloadTokenDoc, DOWNLOAD_TOKEN_COLLECTION},
    db::MongoClient,
    logging::UsageLogger,
    proxy::{DemoProxy, HttpUpstream, ProxyConfig, RequestCache},
    server::{self, AppState},
    store::{InMemoryTokenStore, MongoTokenStore, TokenStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("showroom={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Showroom - Demo & Store Gateway");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    match args.upstream_url() {
        Some(url) => info!("Demo upstream: {}", url),
        None => info!("Demo upstream: (not configured)"),
    }
    info!(
        "Demo retries: {} attempts, {}ms delay, {}ms timeout",
        args.demo_proxy_max_attempts, args.demo_proxy_retry_delay_ms, args.demo_proxy_timeout_ms
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!(
                    "MongoDB connection failed (dev mode, continuing without): {}",
                    e
                );
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Demo proxy (requires an upstream URL)
    let demo_proxy = match args.upstream_url() {
        Some(url) => {
            let upstream =
                HttpUpstream::new(url, Duration::from_millis(args.demo_proxy_timeout_ms))?;
            Some(Arc::new(DemoProxy::new(
                Arc::new(upstream),
                ProxyConfig::from_args(&args),
            )))
        }
        None => {
            warn!("No demo upstream configured - /api/demos/create-demo disabled");
            None
        }
    };

    // Download token store: MongoDB in production, in-memory in dev mode
    let token_store: Arc<dyn TokenStore> = match &mongo {
        Some(client) => {
            let tokens = client
                .collection::<DownloadTokenDoc>(DOWNLOAD_TOKEN_COLLECTION)
                .await?;
            Arc::new(MongoTokenStore::new(tokens))
        }
        None => {
            warn!("Using in-memory token store (tokens lost on restart)");
            Arc::new(InMemoryTokenStore::new())
        }
    };

    // Usage logging (JSONL, disabled unless a path is configured)
    let usage = UsageLogger::new(args.node_id.to_string());
    if let Some(path) = &args.usage_log_path {
        usage.init_file(path.into()).await?;
    }

    let request_cache = Arc::new(RequestCache::new(Duration::from_secs(
        args.demo_dedupe_ttl_secs,
    )));

    let jwt = JwtValidator::new(&args.jwt_secret(), args.jwt_expiry_seconds);

    let state = Arc::new(AppState {
        args,
        mongo,
        jwt,
        demo_proxy,
        token_store,
        request_cache,
        usage,
    });

    server::run(state).await?;
    Ok(())
}
