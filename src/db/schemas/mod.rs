//! Document schemas for MongoDB collections

pub mod audit;
pub mod download_token;
pub mod lead;
pub mod purchase;
pub mod user;
pub mod workflow;

pub use audit::Audit;
pub use download_token::{DownloadTokenDoc, DOWNLOAD_TOKEN_COLLECTION};
pub use lead::{LeadDoc, LEAD_COLLECTION};
pub use purchase::{PurchaseDoc, PurchaseStatus, PURCHASE_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
pub use workflow::{WorkflowDoc, WORKFLOW_COLLECTION};
