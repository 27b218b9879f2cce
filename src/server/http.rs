//! HTTP server implementation
//!
//! hyper http1 with TokioIo and a manual route match. Every handler gets the
//! shared [`AppState`].

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::db::MongoClient;
use crate::logging::UsageLogger;
use crate::proxy::{spawn_dedupe_cleanup_task, DemoProxy, RequestCache};
use crate::routes;
use crate::routes::helpers::{cors_preflight, json_response, BoxBody, ErrorResponse};
use crate::store::TokenStore;
use crate::types::ShowroomError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: Option<MongoClient>,
    /// JWT issuance and validation
    pub jwt: crate::auth::JwtValidator,
    /// Retry-aware proxy to the demo-agent upstream; None when no upstream
    /// URL is configured (dev mode only)
    pub demo_proxy: Option<Arc<DemoProxy>>,
    /// Single-use download tokens (Mongo-backed, or in-memory in dev mode)
    pub token_store: Arc<dyn TokenStore>,
    /// Demo request de-duplication window
    pub request_cache: Arc<RequestCache>,
    /// JSONL usage events (no-op unless a log path is configured)
    pub usage: UsageLogger,
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), ShowroomError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Showroom listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - in-memory stores, insecure defaults");
    }

    spawn_dedupe_cleanup_task(Arc::clone(&state.request_cache));

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // Auth routes consume the request
    if path.starts_with("/auth/") {
        return Ok(routes::handle_auth_request(req, state, &path).await);
    }

    let response = match (method, path.as_str()) {
        (Method::OPTIONS, _) => cors_preflight(),

        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(state),

        (Method::GET, "/ready") | (Method::GET, "/readyz") => routes::readiness_check(state),

        (Method::GET, "/version") => routes::version_info(),

        (Method::POST, "/api/demos/create-demo") => {
            routes::handle_create_demo(req, state).await
        }

        (Method::GET, "/api/store/workflows") => routes::handle_list_workflows(state).await,

        (Method::POST, p) if p.starts_with("/api/store/download-token/") => {
            let workflow_id = p.trim_start_matches("/api/store/download-token/");
            if workflow_id.is_empty() || workflow_id.contains('/') {
                not_found(&path)
            } else {
                let workflow_id = workflow_id.to_string();
                routes::handle_issue_download_token(req, state, &workflow_id).await
            }
        }

        (Method::GET, p) if p.starts_with("/api/store/download/") => {
            let token = p.trim_start_matches("/api/store/download/");
            if token.is_empty() || token.contains('/') {
                not_found(&path)
            } else {
                let token = token.to_string();
                routes::handle_download(state, &token).await
            }
        }

        (Method::POST, "/api/leads") => routes::handle_create_lead(req, state).await,

        _ => not_found(&path),
    };

    Ok(response)
}

fn not_found(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse::new(format!("Not found: {}", path)),
    )
}
