//! Single-use download tokens
//!
//! Issues opaque, time-limited tokens for purchased workflows and redeems
//! each one at most once. Redemption must stay atomic under concurrent
//! requests: the MongoDB store leans on single-document find-and-update,
//! the in-memory store on the map's per-entry locking.

use async_trait::async_trait;
use bson::{doc, DateTime};
use dashmap::DashMap;
use rand::RngCore;
use std::time::Duration;
use tracing::{info, warn};

use crate::db::mongo::MongoCollection;
use crate::db::schemas::DownloadTokenDoc;
use crate::types::ShowroomError;

/// Why a redemption was refused
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RedeemError {
    /// No token with that value was ever issued
    #[error("Token not found")]
    NotFound,
    /// The token's lifetime elapsed before redemption
    #[error("Token expired")]
    Expired,
    /// The token was already redeemed once
    #[error("Token already used")]
    AlreadyUsed,
    /// The backing store failed
    #[error("Token store error: {0}")]
    Store(String),
}

impl From<ShowroomError> for RedeemError {
    fn from(e: ShowroomError) -> Self {
        RedeemError::Store(e.to_string())
    }
}

/// Generate an opaque download token: 32 random bytes, hex encoded
pub fn generate_download_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues and redeems single-use download tokens
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Issue a fresh token for a user/workflow pair
    async fn issue(
        &self,
        user_id: &str,
        workflow_id: &str,
        ttl: Duration,
    ) -> Result<DownloadTokenDoc, ShowroomError>;

    /// Redeem a token, at most once. Returns the redeemed document on the
    /// one successful call; every other call for the same token fails.
    async fn redeem(&self, token: &str) -> Result<DownloadTokenDoc, RedeemError>;
}

/// MongoDB-backed token store
pub struct MongoTokenStore {
    tokens: MongoCollection<DownloadTokenDoc>,
}

impl MongoTokenStore {
    pub fn new(tokens: MongoCollection<DownloadTokenDoc>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl TokenStore for MongoTokenStore {
    async fn issue(
        &self,
        user_id: &str,
        workflow_id: &str,
        ttl: Duration,
    ) -> Result<DownloadTokenDoc, ShowroomError> {
        let doc = DownloadTokenDoc::new(
            generate_download_token(),
            user_id.to_string(),
            workflow_id.to_string(),
            ttl,
        );

        self.tokens.insert_one(doc.clone()).await?;
        info!(user_id, workflow_id, "Issued download token");
        Ok(doc)
    }

    async fn redeem(&self, token: &str) -> Result<DownloadTokenDoc, RedeemError> {
        // Conditional single-document update: only an unredeemed, unexpired
        // token matches, so concurrent redeemers cannot both succeed.
        let now = DateTime::now();
        let redeemed = self
            .tokens
            .find_one_and_update(
                doc! {
                    "token": token,
                    "used_at": { "$exists": false },
                    "expires_at": { "$gt": now },
                },
                doc! { "$set": { "used_at": now } },
            )
            .await?;

        if let Some(doc) = redeemed {
            info!(workflow_id = %doc.workflow_id, "Redeemed download token");
            return Ok(doc);
        }

        // The update matched nothing; look the token up once to say why
        match self.tokens.find_one(doc! { "token": token }).await? {
            None => Err(RedeemError::NotFound),
            Some(doc) if doc.used_at.is_some() => {
                warn!(workflow_id = %doc.workflow_id, "Replay of an already-redeemed token");
                Err(RedeemError::AlreadyUsed)
            }
            Some(_) => Err(RedeemError::Expired),
        }
    }
}

/// In-memory token store for development mode and tests
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: DashMap<String, DownloadTokenDoc>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn issue(
        &self,
        user_id: &str,
        workflow_id: &str,
        ttl: Duration,
    ) -> Result<DownloadTokenDoc, ShowroomError> {
        let doc = DownloadTokenDoc::new(
            generate_download_token(),
            user_id.to_string(),
            workflow_id.to_string(),
            ttl,
        );
        self.tokens.insert(doc.token.clone(), doc.clone());
        Ok(doc)
    }

    async fn redeem(&self, token: &str) -> Result<DownloadTokenDoc, RedeemError> {
        // get_mut holds the entry's shard lock, so the used_at check and
        // write happen as one step.
        let mut entry = self.tokens.get_mut(token).ok_or(RedeemError::NotFound)?;

        if entry.used_at.is_some() {
            return Err(RedeemError::AlreadyUsed);
        }
        if entry.is_expired() {
            return Err(RedeemError::Expired);
        }

        entry.used_at = Some(DateTime::now());
        Ok(entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_generated_tokens_are_unique_hex() {
        let a = generate_download_token();
        let b = generate_download_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_issue_then_redeem() {
        let store = InMemoryTokenStore::new();
        let issued = store
            .issue("user-1", "restaurant-bot", Duration::from_secs(300))
            .await
            .unwrap();

        let redeemed = store.redeem(&issued.token).await.unwrap();
        assert_eq!(redeemed.workflow_id, "restaurant-bot");
        assert!(redeemed.used_at.is_some());
    }

    #[tokio::test]
    async fn test_second_redeem_is_already_used() {
        let store = InMemoryTokenStore::new();
        let issued = store
            .issue("user-1", "restaurant-bot", Duration::from_secs(300))
            .await
            .unwrap();

        store.redeem(&issued.token).await.unwrap();
        assert_eq!(
            store.redeem(&issued.token).await,
            Err(RedeemError::AlreadyUsed)
        );
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let store = InMemoryTokenStore::new();
        assert_eq!(
            store.redeem("deadbeef").await,
            Err(RedeemError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let store = InMemoryTokenStore::new();
        let issued = store
            .issue("user-1", "restaurant-bot", Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(store.redeem(&issued.token).await, Err(RedeemError::Expired));

        // A refused redeem must leave the token unmarked
        let stored = store.tokens.get(&issued.token).unwrap();
        assert!(stored.used_at.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_redeem_succeeds_exactly_once() {
        let store = Arc::new(InMemoryTokenStore::new());
        let issued = store
            .issue("user-1", "restaurant-bot", Duration::from_secs(300))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let token = issued.token.clone();
            handles.push(tokio::spawn(async move { store.redeem(&token).await }));
        }

        let mut successes = 0;
        let mut replays = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(RedeemError::AlreadyUsed) => replays += 1,
                Err(other) => panic!("unexpected redeem error: {other:?}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(replays, 7);
    }
}
