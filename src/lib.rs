//! Showroom - HTTP gateway for demo agents and the workflow store
//!
//! Showroom fronts a marketing site with three services:
//!
//! - **Demo proxy**: forwards demo provisioning requests to a serverless
//!   upstream that scales to zero, retrying through its cold starts
//! - **Workflow store**: catalog, purchase entitlements, and single-use
//!   download tokens for purchased workflow artifacts
//! - **Lead capture**: contact-form submissions into MongoDB

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod proxy;
pub mod routes;
pub mod server;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, ShowroomError};
