//! Purchase document schema
//!
//! A paid purchase row is the entitlement that gates workflow downloads.
//! Rows are written by the payment webhook pipeline; this service only
//! reads them.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped};
use crate::db::schemas::Audit;

/// Collection name for store purchases
pub const PURCHASE_COLLECTION: &str = "purchases";

/// Purchase lifecycle status
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Checkout started but not completed
    #[default]
    Pending,
    /// Payment confirmed; entitles the buyer to download
    Paid,
    /// Payment reversed; entitlement revoked
    Refunded,
}

/// Purchase document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PurchaseDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common audit metadata
    #[serde(default)]
    pub audit: Audit,

    /// Buyer's user ID (UserDoc identifier hex ObjectId string)
    pub user_id: String,

    /// Purchased workflow slug
    pub workflow_id: String,

    /// Payment status
    #[serde(default)]
    pub status: PurchaseStatus,

    /// Checkout session reference from the payment provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_session_id: Option<String>,

    /// Amount paid in cents
    #[serde(default)]
    pub amount_cents: i64,
}

impl IntoIndexes for PurchaseDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Entitlement lookups hit (user_id, workflow_id, status)
            (
                doc! { "user_id": 1, "workflow_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_workflow_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "checkout_session_id": 1 },
                Some(
                    IndexOptions::builder()
                        .sparse(true)
                        .name("checkout_session_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl Stamped for PurchaseDoc {
    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}
