//! HTTP routes for authentication
//!
//! - POST /auth/register - Create a store account
//! - POST /auth/login    - Authenticate and get a JWT token
//! - GET  /auth/me       - Get current user info from the token

use bson::doc;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{
    extract_token_from_header, hash_password, verify_password, PermissionLevel, TokenInput,
};
use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::routes::helpers::{
    cors_preflight, error_response, get_auth_header, json_response, parse_json_body, BoxBody,
    ErrorResponse,
};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    identifier: String,
    password: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    identifier: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    identifier: String,
    display_name: String,
    expires_at: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    user_id: String,
    identifier: String,
    permission_level: String,
}

/// Route /auth/* requests
pub async fn handle_auth_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    path: &str,
) -> Response<BoxBody> {
    let method = req.method().clone();
    match (method, path) {
        (Method::OPTIONS, _) => cors_preflight(),
        (Method::POST, "/auth/register") => handle_register(req, state).await,
        (Method::POST, "/auth/login") => handle_login(req, state).await,
        (Method::GET, "/auth/me") => handle_me(req, state).await,
        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse::new(format!("Unknown auth route: {}", path)),
        ),
    }
}

fn build_auth_response(
    state: &AppState,
    user_id: &str,
    identifier: &str,
    display_name: &str,
    status: StatusCode,
) -> Response<BoxBody> {
    let token = match state.jwt.generate_token(TokenInput {
        user_id: user_id.to_string(),
        identifier: identifier.to_string(),
        permission_level: PermissionLevel::Authenticated,
    }) {
        Ok(t) => t,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to generate token: {}", e),
            )
        }
    };

    let expires_at = chrono::Utc::now().timestamp() as u64 + state.args.jwt_expiry_seconds;

    json_response(
        status,
        &AuthResponse {
            token,
            identifier: identifier.to_string(),
            display_name: display_name.to_string(),
            expires_at,
        },
    )
}

/// POST /auth/register
async fn handle_register(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: RegisterRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    if body.identifier.is_empty() || body.password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing required fields: identifier, password",
        );
    }

    if body.password.len() < 8 {
        return json_response(
            StatusCode::BAD_REQUEST,
            &ErrorResponse::with_code("Password must be at least 8 characters", "WEAK_PASSWORD"),
        );
    }

    let display_name = if body.display_name.is_empty() {
        body.identifier
            .split('@')
            .next()
            .unwrap_or("User")
            .to_string()
    } else {
        body.display_name.clone()
    };

    // Dev mode without MongoDB: issue a token without persistence
    if state.args.dev_mode && state.mongo.is_none() {
        info!("Dev mode register (no MongoDB): {}", body.identifier);
        return build_auth_response(
            &state,
            &uuid::Uuid::new_v4().to_string(),
            &body.identifier,
            &display_name,
            StatusCode::CREATED,
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

    let collection = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    };

    match collection
        .find_one(doc! { "identifier": &body.identifier })
        .await
    {
        Ok(Some(_)) => {
            return json_response(
                StatusCode::CONFLICT,
                &ErrorResponse::with_code(
                    "An account with this identifier already exists",
                    "USER_EXISTS",
                ),
            )
        }
        Ok(None) => {}
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to hash password: {}", e),
            )
        }
    };

    let user = UserDoc::new(body.identifier.clone(), password_hash, display_name.clone());

    let user_id = match collection.insert_one(user).await {
        Ok(id) => id,
        Err(e) => {
            // Unique index on identifier catches register races
            let error_str = e.to_string();
            if error_str.contains("duplicate key") || error_str.contains("E11000") {
                return json_response(
                    StatusCode::CONFLICT,
                    &ErrorResponse::with_code(
                        "An account with this identifier already exists",
                        "USER_EXISTS",
                    ),
                );
            }
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create user: {}", e),
            );
        }
    };

    info!("Registered new user: {}", body.identifier);
    state.usage.log_auth_attempt(true, Some(&body.identifier)).await;

    build_auth_response(
        &state,
        &user_id.to_hex(),
        &body.identifier,
        &display_name,
        StatusCode::CREATED,
    )
}

/// POST /auth/login
async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    if body.identifier.is_empty() || body.password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing required fields: identifier, password",
        );
    }

    // Dev mode without MongoDB: accept any credentials
    if state.args.dev_mode && state.mongo.is_none() {
        info!("Dev mode login (no MongoDB): {}", body.identifier);
        return build_auth_response(
            &state,
            &uuid::Uuid::new_v4().to_string(),
            &body.identifier,
            "",
            StatusCode::OK,
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

    let collection = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    };

    let user = match collection
        .find_one(doc! { "identifier": &body.identifier, "is_active": true })
        .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("Login failed - user not found: {}", body.identifier);
            state.usage.log_auth_attempt(false, Some(&body.identifier)).await;
            // Generic error to prevent user enumeration
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse::with_code("Invalid credentials", "INVALID_CREDENTIALS"),
            );
        }
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", e),
            )
        }
    };

    let password_valid = match verify_password(&body.password, &user.password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            warn!("Password verification error: {}", e);
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorResponse::with_code("Authentication error", "AUTH_ERROR"),
            );
        }
    };

    if !password_valid {
        warn!("Login failed - invalid password: {}", body.identifier);
        state.usage.log_auth_attempt(false, Some(&body.identifier)).await;
        return json_response(
            StatusCode::UNAUTHORIZED,
            &ErrorResponse::with_code("Invalid credentials", "INVALID_CREDENTIALS"),
        );
    }

    info!("Login successful: {}", body.identifier);
    state.usage.log_auth_attempt(true, Some(&body.identifier)).await;

    let user_id = user.id.map(|id| id.to_hex()).unwrap_or_default();
    build_auth_response(
        &state,
        &user_id,
        &user.identifier,
        &user.display_name,
        StatusCode::OK,
    )
}

/// GET /auth/me
async fn handle_me(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let token = match extract_token_from_header(get_auth_header(&req)) {
        Some(t) => t,
        None => {
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse::with_code("No token provided", "NO_TOKEN"),
            )
        }
    };

    let claims = match state.jwt.verify_token(token) {
        Ok(c) => c,
        Err(e) => {
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse::with_code(e.to_string(), "INVALID_TOKEN"),
            )
        }
    };

    json_response(
        StatusCode::OK,
        &MeResponse {
            user_id: claims.sub,
            identifier: claims.identifier,
            permission_level: claims.permission_level.to_string(),
        },
    )
}
