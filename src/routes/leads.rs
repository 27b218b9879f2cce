//! Lead capture route
//!
//! POST /api/leads stores contact-form submissions from the marketing site.

use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{LeadDoc, LEAD_COLLECTION};
use crate::routes::helpers::{error_response, json_response, parse_json_body, BoxBody, ErrorResponse};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
struct LeadRequest {
    name: String,
    email: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Serialize)]
struct LeadResponse {
    success: bool,
    id: String,
}

/// POST /api/leads
pub async fn handle_create_lead(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: LeadRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    if body.name.trim().is_empty() || body.email.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing required fields: name, email");
    }
    if !body.email.contains('@') {
        return error_response(StatusCode::BAD_REQUEST, "Invalid email address");
    }

    // Dev mode without MongoDB: acknowledge without persistence
    if state.args.dev_mode && state.mongo.is_none() {
        info!("Dev mode lead (no MongoDB): {}", body.email);
        state.usage.log_lead_captured(body.source.as_deref()).await;
        return json_response(
            StatusCode::CREATED,
            &LeadResponse {
                success: true,
                id: uuid::Uuid::new_v4().to_string(),
            },
        );
    }

    let mongo = match &state.mongo {
        Some(m) => m,
        None => {
            return json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ErrorResponse::with_code("Database not available", "DB_UNAVAILABLE"),
            )
        }
    };

    let collection = match mongo.collection::<LeadDoc>(LEAD_COLLECTION).await {
        Ok(c) => c,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    };

    let lead = LeadDoc::new(
        body.name.trim().to_string(),
        body.email.trim().to_lowercase(),
        body.message,
        body.source.clone(),
    );

    let id = match collection.insert_one(lead).await {
        Ok(id) => id,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to store lead: {}", e),
            )
        }
    };

    info!("Captured lead: {}", body.email);
    state.usage.log_lead_captured(body.source.as_deref()).await;

    json_response(
        StatusCode::CREATED,
        &LeadResponse {
            success: true,
            id: id.to_hex(),
        },
    )
}
