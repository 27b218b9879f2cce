//! User document schema
//!
//! Stores account credentials for store customers.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped};
use crate::db::schemas::Audit;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common audit metadata
    #[serde(default)]
    pub audit: Audit,

    /// User identifier (email address)
    pub identifier: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Display name shown in the store
    #[serde(default)]
    pub display_name: String,

    /// Whether the account is active
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    /// Create a new user document
    pub fn new(identifier: String, password_hash: String, display_name: String) -> Self {
        Self {
            id: None,
            audit: Audit::new(),
            identifier,
            password_hash,
            display_name,
            is_active: true,
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "identifier": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("identifier_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl Stamped for UserDoc {
    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}
