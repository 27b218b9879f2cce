//! Download token schema
//!
//! Single-use, time-limited credentials exchanged for a purchased workflow
//! artifact. Tokens are short-lived but never deleted; redeemed and expired
//! rows stay behind for audit.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped};
use crate::db::schemas::Audit;

/// Collection name for download tokens
pub const DOWNLOAD_TOKEN_COLLECTION: &str = "download_tokens";

/// Download token document.
///
/// Lifecycle: issued, then either redeemed (sets `used_at`, exactly once) or
/// expired (implicit, checked at redeem time). Both end states are terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadTokenDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common audit metadata
    #[serde(default)]
    pub audit: Audit,

    /// Opaque random token (32 bytes, hex encoded)
    pub token: String,

    /// Owning user ID
    pub user_id: String,

    /// Workflow this token unlocks
    pub workflow_id: String,

    /// When the token expires
    pub expires_at: DateTime,

    /// When the token was redeemed; null while still redeemable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime>,
}

impl DownloadTokenDoc {
    /// Create a new token document expiring `ttl` from now
    pub fn new(
        token: String,
        user_id: String,
        workflow_id: String,
        ttl: std::time::Duration,
    ) -> Self {
        let expires_at =
            DateTime::from_millis(DateTime::now().timestamp_millis() + ttl.as_millis() as i64);
        Self {
            id: None,
            audit: Audit::new(),
            token,
            user_id,
            workflow_id,
            expires_at,
            used_at: None,
        }
    }

    /// Whether the token can still be redeemed
    pub fn is_redeemable(&self) -> bool {
        self.used_at.is_none() && DateTime::now() < self.expires_at
    }

    /// Whether the token's lifetime has elapsed
    pub fn is_expired(&self) -> bool {
        DateTime::now() >= self.expires_at
    }
}

impl IntoIndexes for DownloadTokenDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the opaque token
            (
                doc! { "token": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("token_unique".to_string())
                        .build(),
                ),
            ),
            // Issuance history per user
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl Stamped for DownloadTokenDoc {
    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn token_doc(suffix: &str) -> DownloadTokenDoc {
        DownloadTokenDoc::new(
            suffix.repeat(32),
            "user-1".to_string(),
            "restaurant-bot".to_string(),
            Duration::from_secs(300),
        )
    }

    #[test]
    fn test_fresh_token_is_redeemable() {
        assert!(token_doc("ab").is_redeemable());
    }

    #[test]
    fn test_used_token_is_not_redeemable() {
        let mut doc = token_doc("cd");
        doc.used_at = Some(DateTime::now());
        assert!(!doc.is_redeemable());
    }

    #[test]
    fn test_expired_token_is_not_redeemable() {
        let mut doc = token_doc("ef");
        doc.expires_at = DateTime::from_millis(DateTime::now().timestamp_millis() - 1000);
        assert!(!doc.is_redeemable());
        assert!(doc.is_expired());
    }
}
