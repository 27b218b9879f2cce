//! HTTP server for Showroom

pub mod http;

pub use http::{run, AppState};
