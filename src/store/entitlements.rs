//! Purchase entitlement checks and token issuance
//!
//! The issuance decision lives here, behind lookup traits, so the gate order
//! can be tested without a running database: workflow must exist and be
//! active, user must hold a paid purchase, and only then is a token minted.

use async_trait::async_trait;
use bson::doc;
use std::time::Duration;
use tracing::debug;

use crate::db::mongo::MongoCollection;
use crate::db::schemas::{DownloadTokenDoc, PurchaseDoc, WorkflowDoc};
use crate::store::tokens::TokenStore;
use crate::types::ShowroomError;

/// Why token issuance was refused
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IssueError {
    /// The workflow does not exist or is no longer listed
    #[error("Workflow not found")]
    WorkflowNotFound,
    /// The user holds no paid purchase for the workflow
    #[error("No paid purchase found for this workflow")]
    PurchaseRequired,
    /// A backing lookup or the token store failed
    #[error("Store error: {0}")]
    Store(String),
}

impl From<ShowroomError> for IssueError {
    fn from(e: ShowroomError) -> Self {
        IssueError::Store(e.to_string())
    }
}

/// Catalog and purchase lookups backing the issuance decision
#[async_trait]
pub trait EntitlementCheck: Send + Sync {
    /// Whether the workflow exists and is listed as active
    async fn workflow_is_active(&self, workflow_id: &str) -> Result<bool, ShowroomError>;

    /// Whether the user holds a paid purchase for the workflow. Only `paid`
    /// rows count; pending checkouts and refunds do not entitle a download.
    async fn has_paid_purchase(
        &self,
        user_id: &str,
        workflow_id: &str,
    ) -> Result<bool, ShowroomError>;
}

/// Mongo-backed entitlement lookups
pub struct MongoEntitlements {
    workflows: MongoCollection<WorkflowDoc>,
    purchases: MongoCollection<PurchaseDoc>,
}

impl MongoEntitlements {
    pub fn new(
        workflows: MongoCollection<WorkflowDoc>,
        purchases: MongoCollection<PurchaseDoc>,
    ) -> Self {
        Self {
            workflows,
            purchases,
        }
    }
}

#[async_trait]
impl EntitlementCheck for MongoEntitlements {
    async fn workflow_is_active(&self, workflow_id: &str) -> Result<bool, ShowroomError> {
        let found = self
            .workflows
            .find_one(doc! { "workflow_id": workflow_id, "active": true })
            .await?;
        Ok(found.is_some())
    }

    async fn has_paid_purchase(
        &self,
        user_id: &str,
        workflow_id: &str,
    ) -> Result<bool, ShowroomError> {
        let found = self
            .purchases
            .find_one(doc! {
                "user_id": user_id,
                "workflow_id": workflow_id,
                "status": "paid",
            })
            .await?;

        debug!(
            user_id,
            workflow_id,
            entitled = found.is_some(),
            "Checked purchase entitlement"
        );

        Ok(found.is_some())
    }
}

/// Issue a download token once the entitlement gates pass.
///
/// An inactive listing refuses even its past buyers. `TokenStore::issue` runs
/// only after both gates pass; a refused request mints nothing.
pub async fn issue_download_token(
    entitlements: &dyn EntitlementCheck,
    tokens: &dyn TokenStore,
    user_id: &str,
    workflow_id: &str,
    ttl: Duration,
) -> Result<DownloadTokenDoc, IssueError> {
    if !entitlements.workflow_is_active(workflow_id).await? {
        return Err(IssueError::WorkflowNotFound);
    }

    if !entitlements.has_paid_purchase(user_id, workflow_id).await? {
        return Err(IssueError::PurchaseRequired);
    }

    Ok(tokens.issue(user_id, workflow_id, ttl).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tokens::InMemoryTokenStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StaticEntitlements {
        active: bool,
        paid: bool,
    }

    #[async_trait]
    impl EntitlementCheck for StaticEntitlements {
        async fn workflow_is_active(&self, _workflow_id: &str) -> Result<bool, ShowroomError> {
            Ok(self.active)
        }

        async fn has_paid_purchase(
            &self,
            _user_id: &str,
            _workflow_id: &str,
        ) -> Result<bool, ShowroomError> {
            Ok(self.paid)
        }
    }

    /// Token store that counts how many times `issue` runs
    struct CountingTokenStore {
        inner: InMemoryTokenStore,
        issued: AtomicU32,
    }

    impl CountingTokenStore {
        fn new() -> Self {
            Self {
                inner: InMemoryTokenStore::new(),
                issued: AtomicU32::new(0),
            }
        }

        fn issued(&self) -> u32 {
            self.issued.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenStore for CountingTokenStore {
        async fn issue(
            &self,
            user_id: &str,
            workflow_id: &str,
            ttl: Duration,
        ) -> Result<DownloadTokenDoc, ShowroomError> {
            self.issued.fetch_add(1, Ordering::SeqCst);
            self.inner.issue(user_id, workflow_id, ttl).await
        }

        async fn redeem(
            &self,
            token: &str,
        ) -> Result<DownloadTokenDoc, crate::store::RedeemError> {
            self.inner.redeem(token).await
        }
    }

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_unpaid_user_is_refused_without_minting() {
        let entitlements = StaticEntitlements {
            active: true,
            paid: false,
        };
        let tokens = CountingTokenStore::new();

        let result =
            issue_download_token(&entitlements, &tokens, "user-1", "restaurant-bot", TTL).await;

        assert_eq!(result.unwrap_err(), IssueError::PurchaseRequired);
        assert_eq!(tokens.issued(), 0);
    }

    #[tokio::test]
    async fn test_inactive_workflow_refuses_even_a_buyer() {
        let entitlements = StaticEntitlements {
            active: false,
            paid: true,
        };
        let tokens = CountingTokenStore::new();

        let result =
            issue_download_token(&entitlements, &tokens, "user-1", "restaurant-bot", TTL).await;

        assert_eq!(result.unwrap_err(), IssueError::WorkflowNotFound);
        assert_eq!(tokens.issued(), 0);
    }

    #[tokio::test]
    async fn test_paid_user_gets_a_token() {
        let entitlements = StaticEntitlements {
            active: true,
            paid: true,
        };
        let tokens = CountingTokenStore::new();

        let issued =
            issue_download_token(&entitlements, &tokens, "user-1", "restaurant-bot", TTL)
                .await
                .unwrap();

        assert_eq!(issued.user_id, "user-1");
        assert_eq!(issued.workflow_id, "restaurant-bot");
        assert_eq!(tokens.issued(), 1);
    }
}
