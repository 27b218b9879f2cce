//! Lead document schema
//!
//! Contact-form submissions captured from the marketing site.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Stamped};
use crate::db::schemas::Audit;

/// Collection name for leads
pub const LEAD_COLLECTION: &str = "leads";

/// Lead document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct LeadDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Common audit metadata
    #[serde(default)]
    pub audit: Audit,

    /// Contact name
    pub name: String,

    /// Contact email
    pub email: String,

    /// Free-form message
    #[serde(default)]
    pub message: String,

    /// Which demo or page produced this lead, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl LeadDoc {
    /// Create a new lead document
    pub fn new(name: String, email: String, message: String, source: Option<String>) -> Self {
        Self {
            id: None,
            audit: Audit::new(),
            name,
            email,
            message,
            source,
        }
    }
}

impl IntoIndexes for LeadDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "email": 1 },
            Some(
                IndexOptions::builder()
                    .name("email_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl Stamped for LeadDoc {
    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}
