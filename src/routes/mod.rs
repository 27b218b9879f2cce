//! HTTP routes for Showroom

pub mod auth_routes;
pub mod demos;
pub mod health;
pub mod helpers;
pub mod leads;
pub mod store_routes;

pub use auth_routes::handle_auth_request;
pub use demos::handle_create_demo;
pub use health::{health_check, readiness_check, version_info};
pub use helpers::{cors_preflight, json_response, BoxBody, ErrorResponse};
pub use leads::handle_create_lead;
pub use store_routes::{handle_download, handle_issue_download_token, handle_list_workflows};
