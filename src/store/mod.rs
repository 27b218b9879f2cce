//! Workflow store services
//!
//! Entitlement checks and single-use download tokens for purchased
//! workflow artifacts.

pub mod entitlements;
pub mod tokens;

pub use entitlements::{issue_download_token, EntitlementCheck, IssueError, MongoEntitlements};
pub use tokens::{
    generate_download_token, InMemoryTokenStore, MongoTokenStore, RedeemError, TokenStore,
};
