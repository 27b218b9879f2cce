//! Workflow store routes
//!
//! - GET  /api/store/workflows                     - public catalog
//! - POST /api/store/download-token/{workflow_id}  - issue a single-use token
//! - GET  /api/store/download/{token}              - redeem a token for the artifact
//!
//! Token issuance requires a logged-in user with a paid purchase for the
//! workflow (402 otherwise). Redemption is unauthenticated: possession of a
//! valid token is the credential, and each token works exactly once.

use bson::doc;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{extract_token_from_header, Claims, PermissionLevel};
use crate::db::schemas::{
    PurchaseDoc, WorkflowDoc, PURCHASE_COLLECTION, WORKFLOW_COLLECTION,
};
use crate::routes::helpers::{
    error_response, full_body, get_auth_header, json_response, BoxBody, ErrorResponse,
};
use crate::server::AppState;
use crate::store::{issue_download_token, IssueError, MongoEntitlements, RedeemError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogItem {
    workflow_id: String,
    name: String,
    description: String,
    price_cents: i64,
}

#[derive(Debug, Serialize)]
struct CatalogResponse {
    workflows: Vec<CatalogItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    token: String,
    expires_at: String,
}

/// Validate the bearer token on a request, or produce the 401 response
fn authenticate(
    req: &Request<hyper::body::Incoming>,
    state: &AppState,
) -> Result<Claims, Response<BoxBody>> {
    let token = extract_token_from_header(get_auth_header(req)).ok_or_else(|| {
        json_response(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse::with_code("No token provided", "NO_TOKEN"),
        )
    })?;

    let claims = state.jwt.verify_token(token).map_err(|e| {
        json_response(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse::with_code(e.to_string(), "INVALID_TOKEN"),
        )
    })?;

    if !claims
        .permission_level
        .satisfies(PermissionLevel::Authenticated)
    {
        return Err(json_response(
            StatusCode::FORBIDDEN,
            &ErrorResponse::with_code("Insufficient permissions", "FORBIDDEN"),
        ));
    }

    Ok(claims)
}

/// GET /api/store/workflows
pub async fn handle_list_workflows(state: Arc<AppState>) -> Response<BoxBody> {
    let mongo = match &state.mongo {
        Some(m) => m,
        None => {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ErrorResponse::with_code("Database not available", "DB_UNAVAILABLE"),
            )
        }
    };

    let collection = match mongo.collection::<WorkflowDoc>(WORKFLOW_COLLECTION).await {
        Ok(c) => c,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    };

    let workflows = match collection.find_many(doc! { "active": true }).await {
        Ok(ws) => ws,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    };

    let items: Vec<CatalogItem> = workflows
        .into_iter()
        .map(|w| CatalogItem {
            workflow_id: w.workflow_id,
            name: w.name,
            description: w.description,
            price_cents: w.price_cents,
        })
        .collect();

    json_response(StatusCode::OK, &CatalogResponse { workflows: items })
}

/// POST /api/store/download-token/{workflow_id}
pub async fn handle_issue_download_token(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    workflow_id: &str,
) -> Response<BoxBody> {
    let claims = match authenticate(&req, &state) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let mongo = match &state.mongo {
        Some(m) => m,
        None => {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ErrorResponse::with_code("Database not available", "DB_UNAVAILABLE"),
            )
        }
    };

    let workflows = match mongo.collection::<WorkflowDoc>(WORKFLOW_COLLECTION).await {
        Ok(c) => c,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    };

    let purchases = match mongo.collection::<PurchaseDoc>(PURCHASE_COLLECTION).await {
        Ok(c) => c,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    };

    let entitlements = MongoEntitlements::new(workflows, purchases);

    let issued = match issue_download_token(
        &entitlements,
        state.token_store.as_ref(),
        &claims.sub,
        workflow_id,
        state.args.download_token_ttl(),
    )
    .await
    {
        Ok(t) => t,
        Err(IssueError::WorkflowNotFound) => {
            return json_response(
                StatusCode::NOT_FOUND,
                &ErrorResponse::with_code("Workflow not found", "WORKFLOW_NOT_FOUND"),
            )
        }
        Err(IssueError::PurchaseRequired) => {
            warn!(
                user_id = %claims.sub,
                workflow_id,
                "Download token refused: no paid purchase"
            );
            return json_response(
                StatusCode::PAYMENT_REQUIRED,
                &ErrorResponse::with_code(
                    "No paid purchase found for this workflow",
                    "PURCHASE_REQUIRED",
                ),
            );
        }
        Err(IssueError::Store(e)) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to issue token: {}", e),
            )
        }
    };

    state.usage.log_token_issued(&claims.sub, workflow_id).await;

    json_response(
        StatusCode::OK,
        &TokenResponse {
            token: issued.token,
            expires_at: issued.expires_at.try_to_rfc3339_string().unwrap_or_default(),
        },
    )
}

/// GET /api/store/download/{token}
pub async fn handle_download(state: Arc<AppState>, token: &str) -> Response<BoxBody> {
    let redeemed = match state.token_store.redeem(token).await {
        Ok(doc) => doc,
        Err(RedeemError::NotFound) => {
            return json_response(
                StatusCode::NOT_FOUND,
                &ErrorResponse::with_code("Token not found", "TOKEN_NOT_FOUND"),
            )
        }
        Err(RedeemError::Expired) => {
            return json_response(
                StatusCode::GONE,
                &ErrorResponse::with_code("Token expired", "TOKEN_EXPIRED"),
            )
        }
        Err(RedeemError::AlreadyUsed) => {
            return json_response(
                StatusCode::GONE,
                &ErrorResponse::with_code("Token already used", "TOKEN_USED"),
            )
        }
        Err(RedeemError::Store(e)) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    };

    let mongo = match &state.mongo {
        Some(m) => m,
        None => {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ErrorResponse::with_code("Database not available", "DB_UNAVAILABLE"),
            )
        }
    };

    let workflows = match mongo.collection::<WorkflowDoc>(WORKFLOW_COLLECTION).await {
        Ok(c) => c,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    };

    let workflow = match workflows
        .find_one(doc! { "workflow_id": &redeemed.workflow_id })
        .await
    {
        Ok(Some(w)) => w,
        Ok(None) => {
            warn!(workflow_id = %redeemed.workflow_id, "Redeemed token for a missing workflow");
            return json_response(
                StatusCode::NOT_FOUND,
                &ErrorResponse::with_code("Workflow not found", "WORKFLOW_NOT_FOUND"),
            );
        }
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    };

    let artifact = match serde_json::to_vec_pretty(&workflow.artifact) {
        Ok(bytes) => bytes,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialize artifact: {}", e),
            )
        }
    };

    info!(
        user_id = %redeemed.user_id,
        workflow_id = %redeemed.workflow_id,
        "Serving workflow artifact"
    );

    state
        .usage
        .log_token_redeemed(&redeemed.user_id, &redeemed.workflow_id)
        .await;

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", workflow.artifact_filename()),
        )
        .header("Access-Control-Allow-Origin", "*")
        .body(full_body(artifact))
        .unwrap()
}
